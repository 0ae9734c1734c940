//! Pi-Plates DAQC and DAQC2 expansion boards.
//!
//! The boards are driven through their vendor SDK, abstracted as
//! [`DaqcSdk`] and [`Daqc2Sdk`]. A plate validates addresses and pin
//! numbers, claims pins in its [`PinRegister`] and hands out typed pin
//! handles.

pub mod daqc1;
pub mod daqc2;
pub mod function_generator;
#[cfg(test)]
pub(crate) mod mock;
pub mod oscilloscope;
pub mod pin_register;
pub mod pwm;
pub mod sdk;
pub mod sonar;
pub mod stepper;

pub use daqc1::Daqc1Plate;
pub use daqc2::Daqc2Plate;
pub use function_generator::{Attenuation, FgWaveform, FunctionGenerator};
pub use oscilloscope::{PlateScope, Traces, TriggerEdge, TriggerType};
pub use pin_register::{PinClaim, PinKind, PinRegister};
pub use pwm::Pwm;
pub use sdk::{Daqc2Sdk, DaqcSdk};
pub use sonar::DaqcSonar;
pub use stepper::{StepDirection, Stepper};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlateError {
    #[error("Invalid plate address: {0}")]
    InvalidAddress(u8),

    #[error("Invalid pin {pin} for {kind}")]
    InvalidPin { kind: PinKind, pin: u8 },

    #[error("Pin {pin} is already registered as {kind}")]
    PinAlreadyRegistered { kind: PinKind, pin: u8 },

    #[error("Pin {pin} is not registered as {kind}")]
    PinNotRegistered { kind: PinKind, pin: u8 },

    #[error("Invalid {what}: {value}")]
    OutOfRange { what: &'static str, value: String },

    #[error("Channel {0} is not active")]
    ChannelNotActive(u8),
}

impl PlateError {
    pub(crate) fn out_of_range(what: &'static str, value: impl ToString) -> Self {
        Self::OutOfRange {
            what,
            value: value.to_string(),
        }
    }
}

/// Common to every pin handle.
pub trait Pin {
    fn pin(&self) -> u8;

    /// Give the pin back to the plate so it can be handed out again.
    fn release(self) -> Result<(), PlateError>
    where
        Self: Sized;
}

pub trait DigitalReadable: Pin {
    fn read(&self) -> bool;
}

pub trait DigitalWritable: Pin {
    fn state(&self) -> bool;

    fn write(&mut self, state: bool);
}

pub trait AnalogReadable: Pin {
    /// Input voltage in volts.
    fn read(&self) -> f64;
}

pub trait AnalogWritable: Pin {
    /// Volts on DAQC, DAC counts on DAQC2.
    type Value;

    fn value(&self) -> Self::Value;

    fn write(&mut self, value: Self::Value) -> Result<(), PlateError>;
}

/// A board that hands out pin handles.
pub trait Plate {
    type DigitalInput: DigitalReadable;
    type DigitalOutput: DigitalWritable;
    type AnalogInput: AnalogReadable;
    type AnalogOutput: AnalogWritable;

    fn address(&self) -> u8;

    fn firmware_version(&self) -> String;

    fn hardware_version(&self) -> String;

    fn get_digital_input(&self, pin: u8) -> Result<Self::DigitalInput, PlateError>;

    fn get_digital_output(&self, pin: u8) -> Result<Self::DigitalOutput, PlateError>;

    fn get_analog_input(&self, pin: u8) -> Result<Self::AnalogInput, PlateError>;

    fn get_analog_output(&self, pin: u8) -> Result<Self::AnalogOutput, PlateError>;

    /// Voltage on one ADC channel.
    fn read_adc(&self, channel: u8) -> Result<f64, PlateError>;

    fn read_all_adcs(&self) -> Vec<f64>;

    fn pin_register(&self) -> &PinRegister;
}
