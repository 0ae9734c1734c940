use super::{
    AnalogReadable, AnalogWritable, Daqc2Sdk, DigitalReadable, DigitalWritable, Pin, PinClaim,
    PinKind, PinRegister, Plate, PlateError,
};
use std::fmt;
use std::sync::Arc;

/// DAQC2plate: 8 digital inputs and outputs, 8 ADC channels and 4 DACs
/// driven in 12-bit counts.
///
/// DAC 0 and 1 double as function generator outputs; see
/// [`FunctionGenerator`](super::FunctionGenerator).
pub struct Daqc2Plate {
    sdk: Arc<dyn Daqc2Sdk>,
    address: u8,
    register: Arc<PinRegister>,
}

impl Daqc2Plate {
    pub const DAC_MAX_COUNTS: u16 = 4095;

    pub fn new(sdk: Arc<dyn Daqc2Sdk>, address: u8) -> Result<Self, PlateError> {
        if !sdk.verify_addr(address) {
            return Err(PlateError::InvalidAddress(address));
        }
        Ok(Self {
            sdk,
            address,
            register: Arc::new(PinRegister::new()),
        })
    }

    /// Current DAC setting in counts.
    pub fn read_dac(&self, channel: u8) -> Result<u16, PlateError> {
        if !self.sdk.verify_fg_channel(channel) {
            return Err(PlateError::InvalidPin {
                kind: PinKind::AnalogOutput,
                pin: channel,
            });
        }
        Ok(self.sdk.get_dac(self.address, channel))
    }

    fn claim(&self, kind: PinKind, pin: u8, valid: bool) -> Result<PinClaim, PlateError> {
        if !valid {
            return Err(PlateError::InvalidPin { kind, pin });
        }
        PinClaim::acquire(&self.register, kind, pin)
    }
}

impl fmt::Display for Daqc2Plate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DAQC2 plate at address {}", self.address)
    }
}

impl Plate for Daqc2Plate {
    type DigitalInput = DigitalInput;
    type DigitalOutput = DigitalOutput;
    type AnalogInput = AnalogInput;
    type AnalogOutput = AnalogOutput;

    fn address(&self) -> u8 {
        self.address
    }

    fn firmware_version(&self) -> String {
        self.sdk.get_fw_rev(self.address)
    }

    fn hardware_version(&self) -> String {
        self.sdk.get_hw_rev(self.address)
    }

    fn get_digital_input(&self, pin: u8) -> Result<DigitalInput, PlateError> {
        let claim = self.claim(PinKind::DigitalInput, pin, self.sdk.verify_din_channel(pin))?;
        Ok(DigitalInput {
            sdk: Arc::clone(&self.sdk),
            address: self.address,
            claim,
        })
    }

    /// Outputs start low; the plate cannot report them back, so the handle
    /// remembers what it last wrote.
    fn get_digital_output(&self, pin: u8) -> Result<DigitalOutput, PlateError> {
        let claim = self.claim(PinKind::DigitalOutput, pin, self.sdk.verify_dout_channel(pin))?;
        Ok(DigitalOutput {
            sdk: Arc::clone(&self.sdk),
            address: self.address,
            claim,
            state: false,
        })
    }

    fn get_analog_input(&self, pin: u8) -> Result<AnalogInput, PlateError> {
        let claim = self.claim(PinKind::AnalogInput, pin, self.sdk.verify_ain_channel(pin))?;
        Ok(AnalogInput {
            sdk: Arc::clone(&self.sdk),
            address: self.address,
            claim,
        })
    }

    fn get_analog_output(&self, pin: u8) -> Result<AnalogOutput, PlateError> {
        let claim = self.claim(PinKind::AnalogOutput, pin, self.sdk.verify_fg_channel(pin))?;
        Ok(AnalogOutput {
            sdk: Arc::clone(&self.sdk),
            address: self.address,
            claim,
        })
    }

    fn read_adc(&self, channel: u8) -> Result<f64, PlateError> {
        if !self.sdk.verify_ain_channel(channel) {
            return Err(PlateError::InvalidPin {
                kind: PinKind::AnalogInput,
                pin: channel,
            });
        }
        Ok(self.sdk.get_adc(self.address, channel))
    }

    fn read_all_adcs(&self) -> Vec<f64> {
        self.sdk.get_adc_all(self.address)
    }

    fn pin_register(&self) -> &PinRegister {
        &self.register
    }
}

pub struct DigitalInput {
    sdk: Arc<dyn Daqc2Sdk>,
    address: u8,
    claim: PinClaim,
}

impl Pin for DigitalInput {
    fn pin(&self) -> u8 {
        self.claim.pin()
    }

    fn release(self) -> Result<(), PlateError> {
        self.claim.release()
    }
}

impl DigitalReadable for DigitalInput {
    fn read(&self) -> bool {
        self.sdk.get_din_bit(self.address, self.pin())
    }
}

pub struct DigitalOutput {
    sdk: Arc<dyn Daqc2Sdk>,
    address: u8,
    claim: PinClaim,
    state: bool,
}

impl Pin for DigitalOutput {
    fn pin(&self) -> u8 {
        self.claim.pin()
    }

    fn release(self) -> Result<(), PlateError> {
        self.claim.release()
    }
}

impl DigitalWritable for DigitalOutput {
    fn state(&self) -> bool {
        self.state
    }

    fn write(&mut self, state: bool) {
        self.sdk.set_dout_bit(self.address, self.pin(), state);
        self.state = state;
    }
}

pub struct AnalogInput {
    sdk: Arc<dyn Daqc2Sdk>,
    address: u8,
    claim: PinClaim,
}

impl Pin for AnalogInput {
    fn pin(&self) -> u8 {
        self.claim.pin()
    }

    fn release(self) -> Result<(), PlateError> {
        self.claim.release()
    }
}

impl AnalogReadable for AnalogInput {
    fn read(&self) -> f64 {
        self.sdk.get_adc(self.address, self.pin())
    }
}

pub struct AnalogOutput {
    sdk: Arc<dyn Daqc2Sdk>,
    address: u8,
    claim: PinClaim,
}

impl Pin for AnalogOutput {
    fn pin(&self) -> u8 {
        self.claim.pin()
    }

    fn release(self) -> Result<(), PlateError> {
        self.claim.release()
    }
}

impl AnalogWritable for AnalogOutput {
    type Value = u16;

    fn value(&self) -> u16 {
        self.sdk.get_dac(self.address, self.pin())
    }

    fn write(&mut self, counts: u16) -> Result<(), PlateError> {
        if counts > Daqc2Plate::DAC_MAX_COUNTS {
            return Err(PlateError::out_of_range("DAC value", counts));
        }
        self.sdk.set_dac(self.address, self.pin(), counts);
        Ok(())
    }
}
