use super::{
    AnalogReadable, AnalogWritable, DaqcSdk, DigitalReadable, DigitalWritable, Pin, PinClaim,
    PinKind, PinRegister, Plate, PlateError,
};
use std::fmt;
use std::sync::Arc;

/// DAQCplate: 8 digital inputs, 7 open-drain outputs, 8 ADC channels and
/// 2 DACs of 0 to 4.095 V.
pub struct Daqc1Plate {
    sdk: Arc<dyn DaqcSdk>,
    address: u8,
    register: Arc<PinRegister>,
}

impl Daqc1Plate {
    pub const DAC_MAX_VOLTS: f64 = 4.095;

    pub fn new(sdk: Arc<dyn DaqcSdk>, address: u8) -> Result<Self, PlateError> {
        if !sdk.verify_addr(address) {
            return Err(PlateError::InvalidAddress(address));
        }
        Ok(Self {
            sdk,
            address,
            register: Arc::new(PinRegister::new()),
        })
    }

    fn claim(&self, kind: PinKind, pin: u8, valid: bool) -> Result<PinClaim, PlateError> {
        if !valid {
            return Err(PlateError::InvalidPin { kind, pin });
        }
        PinClaim::acquire(&self.register, kind, pin)
    }
}

impl fmt::Display for Daqc1Plate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DAQC1 plate at address {}", self.address)
    }
}

impl Plate for Daqc1Plate {
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

    fn get_digital_output(&self, pin: u8) -> Result<DigitalOutput, PlateError> {
        let claim = self.claim(PinKind::DigitalOutput, pin, self.sdk.verify_dout_channel(pin))?;
        Ok(DigitalOutput {
            sdk: Arc::clone(&self.sdk),
            address: self.address,
            claim,
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
        let claim = self.claim(PinKind::AnalogOutput, pin, self.sdk.verify_aout_channel(pin))?;
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
    sdk: Arc<dyn DaqcSdk>,
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
    sdk: Arc<dyn DaqcSdk>,
    address: u8,
    claim: PinClaim,
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
    /// Read back from the plate.
    fn state(&self) -> bool {
        self.sdk.get_dout_bit(self.address, self.pin())
    }

    fn write(&mut self, state: bool) {
        self.sdk.set_dout_bit(self.address, self.pin(), state);
    }
}

pub struct AnalogInput {
    sdk: Arc<dyn DaqcSdk>,
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
    sdk: Arc<dyn DaqcSdk>,
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
    type Value = f64;

    fn value(&self) -> f64 {
        self.sdk.get_dac(self.address, self.pin())
    }

    fn write(&mut self, volts: f64) -> Result<(), PlateError> {
        if !(0.0..=Daqc1Plate::DAC_MAX_VOLTS).contains(&volts) {
            return Err(PlateError::out_of_range("DAC voltage", volts));
        }
        self.sdk.set_dac(self.address, self.pin(), volts);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::mock::MockSdk;

    fn plate() -> (Arc<MockSdk>, Daqc1Plate) {
        let sdk = Arc::new(MockSdk::new());
        let plate = Daqc1Plate::new(sdk.clone(), 0).unwrap();
        (sdk, plate)
    }

    #[test]
    fn test_invalid_address() {
        let sdk = Arc::new(MockSdk::new());
        assert_eq!(
            Daqc1Plate::new(sdk, 8).err(),
            Some(PlateError::InvalidAddress(8))
        );
    }

    #[test]
    fn test_versions() {
        let (_, plate) = plate();
        assert_eq!(plate.firmware_version(), "1.2");
        assert_eq!(plate.hardware_version(), "A");
        assert_eq!(plate.to_string(), "DAQC1 plate at address 0");
    }

    #[test]
    fn test_pins_are_claimed_once() {
        let (_, plate) = plate();
        let input = plate.get_digital_input(3).unwrap();
        assert!(matches!(
            plate.get_digital_input(3),
            Err(PlateError::PinAlreadyRegistered { .. })
        ));
        // same number, other kind
        let _analog = plate.get_analog_input(3).unwrap();
        input.release().unwrap();
        assert!(plate.get_digital_input(3).is_ok());
    }

    #[test]
    fn test_sdk_rejects_pin() {
        let (_, plate) = plate();
        assert!(matches!(
            plate.get_digital_output(7),
            Err(PlateError::InvalidPin { kind: PinKind::DigitalOutput, pin: 7 })
        ));
        assert!(!plate.pin_register().is_registered(PinKind::DigitalOutput, 7));
    }

    #[test]
    fn test_digital_io() {
        let (sdk, plate) = plate();
        let mut out = plate.get_digital_output(2).unwrap();
        out.write(true);
        assert!(out.state());
        let input = plate.get_digital_input(1).unwrap();
        assert!(!input.read());
        assert!(sdk.calls().contains(&"setDOUTbit(0,2,true)".to_string()));
    }

    #[test]
    fn test_analog_output_in_volts() {
        let (sdk, plate) = plate();
        let mut dac = plate.get_analog_output(1).unwrap();
        dac.write(2.5).unwrap();
        assert!((dac.value() - 2.5).abs() < 1e-9);
        assert!(dac.write(4.2).is_err());
        assert_eq!(
            sdk.calls().iter().filter(|c| c.starts_with("setDAC")).count(),
            1
        );
    }

    #[test]
    fn test_adc() {
        let (_, plate) = plate();
        assert!((plate.read_adc(4).unwrap() - 0.4).abs() < 1e-9);
        assert!(plate.read_adc(8).is_err());
        assert_eq!(plate.read_all_adcs().len(), 8);
        let ain = plate.get_analog_input(5).unwrap();
        assert!((ain.read() - 0.5).abs() < 1e-9);
    }
}
