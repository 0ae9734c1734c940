//! Recording stand-in for both board libraries.

use super::sdk::{Daqc2Sdk, DaqcSdk};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub struct MockSdk {
    calls: Mutex<Vec<String>>,
    dout: Mutex<[bool; 8]>,
    dac_volts: Mutex<HashMap<u8, f64>>,
    dac_counts: Mutex<HashMap<u8, u16>>,
    pub data_ready: AtomicBool,
}

impl Default for MockSdk {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            dout: Mutex::new([false; 8]),
            dac_volts: Mutex::new(HashMap::new()),
            dac_counts: Mutex::new(HashMap::new()),
            data_ready: AtomicBool::new(true),
        }
    }
}

impl MockSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl DaqcSdk for MockSdk {
    fn verify_addr(&self, address: u8) -> bool {
        address <= 7
    }

    fn verify_din_channel(&self, channel: u8) -> bool {
        channel <= 7
    }

    fn verify_dout_channel(&self, channel: u8) -> bool {
        channel <= 6
    }

    fn verify_ain_channel(&self, channel: u8) -> bool {
        channel <= 7
    }

    fn verify_aout_channel(&self, channel: u8) -> bool {
        channel <= 1
    }

    fn get_fw_rev(&self, _address: u8) -> String {
        "1.2".to_string()
    }

    fn get_hw_rev(&self, _address: u8) -> String {
        "A".to_string()
    }

    fn get_din_bit(&self, _address: u8, _bit: u8) -> bool {
        false
    }

    fn get_dout_bit(&self, _address: u8, bit: u8) -> bool {
        self.dout.lock()[usize::from(bit)]
    }

    fn set_dout_bit(&self, address: u8, bit: u8, state: bool) {
        self.record(format!("setDOUTbit({},{},{})", address, bit, state));
        self.dout.lock()[usize::from(bit)] = state;
    }

    fn get_adc(&self, _address: u8, channel: u8) -> f64 {
        f64::from(channel) / 10.0
    }

    fn get_adc_all(&self, _address: u8) -> Vec<f64> {
        (0..8).map(|c| f64::from(c) / 10.0).collect()
    }

    fn get_dac(&self, _address: u8, channel: u8) -> f64 {
        self.dac_volts.lock().get(&channel).copied().unwrap_or(0.0)
    }

    fn set_dac(&self, address: u8, channel: u8, volts: f64) {
        self.record(format!("setDAC({},{},{})", address, channel, volts));
        self.dac_volts.lock().insert(channel, volts);
    }

    fn get_range(&self, address: u8, channel: u8) -> f64 {
        self.record(format!("getRANGE({},{},c)", address, channel));
        f64::from(channel) * 10.0
    }
}

impl Daqc2Sdk for MockSdk {
    fn verify_addr(&self, address: u8) -> bool {
        address <= 7
    }

    fn verify_din_channel(&self, channel: u8) -> bool {
        channel <= 7
    }

    fn verify_dout_channel(&self, channel: u8) -> bool {
        channel <= 7
    }

    fn verify_ain_channel(&self, channel: u8) -> bool {
        channel <= 7
    }

    fn verify_fg_channel(&self, channel: u8) -> bool {
        channel <= 3
    }

    fn get_fw_rev(&self, _address: u8) -> String {
        "2.0".to_string()
    }

    fn get_hw_rev(&self, _address: u8) -> String {
        "B".to_string()
    }

    fn get_din_bit(&self, _address: u8, bit: u8) -> bool {
        bit % 2 == 1
    }

    fn set_dout_bit(&self, address: u8, bit: u8, state: bool) {
        self.record(format!("setDOUTbit({},{},{})", address, bit, u8::from(state)));
    }

    fn get_adc(&self, _address: u8, channel: u8) -> f64 {
        f64::from(channel) * 1.5
    }

    fn get_adc_all(&self, _address: u8) -> Vec<f64> {
        (0..8).map(|c| f64::from(c) * 1.5).collect()
    }

    fn get_dac(&self, _address: u8, channel: u8) -> u16 {
        self.dac_counts.lock().get(&channel).copied().unwrap_or(0)
    }

    fn set_dac(&self, address: u8, channel: u8, counts: u16) {
        self.record(format!("setDAC({},{},{})", address, channel, counts));
        self.dac_counts.lock().insert(channel, counts);
    }

    fn fg_on(&self, address: u8) {
        self.record(format!("fgON({})", address));
    }

    fn fg_off(&self, address: u8) {
        self.record(format!("fgOFF({})", address));
    }

    fn fg_type(&self, address: u8, channel: u8, waveform: u8) {
        self.record(format!("fgTYPE({},{},{})", address, channel, waveform));
    }

    fn fg_freq(&self, address: u8, channel: u8, hertz: u32) {
        self.record(format!("fgFREQ({},{},{})", address, channel, hertz));
    }

    fn fg_ampl(&self, address: u8, channel: u8, attenuation: u8) {
        self.record(format!("fgAMPL({},{},{})", address, channel, attenuation));
    }

    fn set_pwm(&self, address: u8, channel: u8, duty_cycle: u8) {
        self.record(format!("setPWM({},{},{})", address, channel, duty_cycle));
    }

    fn motor_enable(&self, address: u8) {
        self.record(format!("motorENABLE({})", address));
    }

    fn motor_disable(&self, address: u8) {
        self.record(format!("motorDISABLE({})", address));
    }

    fn motor_off(&self, address: u8, motor: u8) {
        self.record(format!("motorOFF({},{})", address, motor));
    }

    fn motor_stop(&self, address: u8, motor: u8) {
        self.record(format!("motorSTOP({},{})", address, motor));
    }

    fn motor_dir(&self, address: u8, motor: u8, direction: &str) {
        self.record(format!("motorDIR({},{},{})", address, motor, direction));
    }

    fn stepper_move(&self, address: u8, motor: u8, steps: i32) {
        self.record(format!("stepperMOVE({},{},{})", address, motor, steps));
    }

    fn stepper_jog(&self, address: u8, motor: u8, direction: &str) {
        self.record(format!("stepperJOG({},{},{})", address, motor, direction));
    }

    fn stepper_rate(&self, address: u8, motor: u8, rate: u32) {
        self.record(format!("stepperRATE({},{},{})", address, motor, rate));
    }

    fn start_osc(&self, address: u8) {
        self.record(format!("startOSC({})", address));
    }

    fn stop_osc(&self, address: u8) {
        self.record(format!("stopOSC({})", address));
    }

    fn set_osc_channel(&self, address: u8, channel_one: bool, channel_two: bool) {
        self.record(format!(
            "setOSCchannel({},{},{})",
            address,
            u8::from(channel_one),
            u8::from(channel_two)
        ));
    }

    fn set_osc_trigger(&self, address: u8, source: u8, trigger_type: u8, edge: u8, level: u16) {
        self.record(format!(
            "setOSCtrigger({},{},{},{},{})",
            address, source, trigger_type, edge, level
        ));
    }

    fn set_osc_sweep(&self, address: u8, rate: u8) {
        self.record(format!("setOSCsweep({},{})", address, rate));
    }

    fn int_enabled(&self, address: u8) {
        self.record(format!("intEnabled({})", address));
    }

    fn run_osc(&self, address: u8) {
        self.record(format!("runOSC({})", address));
    }

    fn data_ready(&self) -> bool {
        self.data_ready.load(Ordering::SeqCst)
    }

    fn get_int_flags(&self, address: u8) -> u16 {
        self.record(format!("getINTflags({})", address));
        0
    }

    fn get_osc_traces(&self, address: u8) -> (Vec<f64>, Vec<f64>) {
        self.record(format!("getOSCtraces({})", address));
        (vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0])
    }
}
