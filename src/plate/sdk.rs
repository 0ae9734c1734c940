//! Calls into the vendor board libraries.
//!
//! Implementations wrap the actual SPI protocol of the plates; the drivers
//! in this crate only validate arguments and keep track of state.

/// DAQCplate library.
pub trait DaqcSdk: Send + Sync {
    fn verify_addr(&self, address: u8) -> bool;
    fn verify_din_channel(&self, channel: u8) -> bool;
    fn verify_dout_channel(&self, channel: u8) -> bool;
    fn verify_ain_channel(&self, channel: u8) -> bool;
    fn verify_aout_channel(&self, channel: u8) -> bool;

    fn get_fw_rev(&self, address: u8) -> String;
    fn get_hw_rev(&self, address: u8) -> String;

    fn get_din_bit(&self, address: u8, bit: u8) -> bool;
    fn get_dout_bit(&self, address: u8, bit: u8) -> bool;
    fn set_dout_bit(&self, address: u8, bit: u8, state: bool);

    fn get_adc(&self, address: u8, channel: u8) -> f64;
    fn get_adc_all(&self, address: u8) -> Vec<f64>;
    fn get_dac(&self, address: u8, channel: u8) -> f64;
    fn set_dac(&self, address: u8, channel: u8, volts: f64);

    /// Ultrasonic ranger distance in centimetres.
    fn get_range(&self, address: u8, channel: u8) -> f64;
}

/// DAQC2plate library.
pub trait Daqc2Sdk: Send + Sync {
    fn verify_addr(&self, address: u8) -> bool;
    fn verify_din_channel(&self, channel: u8) -> bool;
    fn verify_dout_channel(&self, channel: u8) -> bool;
    fn verify_ain_channel(&self, channel: u8) -> bool;
    fn verify_fg_channel(&self, channel: u8) -> bool;

    fn get_fw_rev(&self, address: u8) -> String;
    fn get_hw_rev(&self, address: u8) -> String;

    fn get_din_bit(&self, address: u8, bit: u8) -> bool;
    fn set_dout_bit(&self, address: u8, bit: u8, state: bool);

    fn get_adc(&self, address: u8, channel: u8) -> f64;
    fn get_adc_all(&self, address: u8) -> Vec<f64>;
    fn get_dac(&self, address: u8, channel: u8) -> u16;
    fn set_dac(&self, address: u8, channel: u8, counts: u16);

    fn fg_on(&self, address: u8);
    fn fg_off(&self, address: u8);
    fn fg_type(&self, address: u8, channel: u8, waveform: u8);
    fn fg_freq(&self, address: u8, channel: u8, hertz: u32);
    fn fg_ampl(&self, address: u8, channel: u8, attenuation: u8);

    fn set_pwm(&self, address: u8, channel: u8, duty_cycle: u8);

    fn motor_enable(&self, address: u8);
    fn motor_disable(&self, address: u8);
    fn motor_off(&self, address: u8, motor: u8);
    fn motor_stop(&self, address: u8, motor: u8);
    fn motor_dir(&self, address: u8, motor: u8, direction: &str);
    fn stepper_move(&self, address: u8, motor: u8, steps: i32);
    fn stepper_jog(&self, address: u8, motor: u8, direction: &str);
    fn stepper_rate(&self, address: u8, motor: u8, rate: u32);

    fn start_osc(&self, address: u8);
    fn stop_osc(&self, address: u8);
    fn set_osc_channel(&self, address: u8, channel_one: bool, channel_two: bool);
    fn set_osc_trigger(&self, address: u8, source: u8, trigger_type: u8, edge: u8, level: u16);
    fn set_osc_sweep(&self, address: u8, rate: u8);
    fn int_enabled(&self, address: u8);
    fn run_osc(&self, address: u8);
    /// State of the shared interrupt line; `true` once a sweep is complete.
    fn data_ready(&self) -> bool;
    fn get_int_flags(&self, address: u8) -> u16;
    fn get_osc_traces(&self, address: u8) -> (Vec<f64>, Vec<f64>);
}
