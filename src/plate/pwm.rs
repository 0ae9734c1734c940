use super::{Daqc2Sdk, PlateError};
use std::sync::Arc;

/// The two DAQC2 PWM outputs.
///
/// Every change pushes both channels to the plate; an inactive channel is
/// driven at 0 % whatever its stored duty cycle.
pub struct Pwm {
    sdk: Arc<dyn Daqc2Sdk>,
    address: u8,
    active: [bool; 2],
    duty_cycle: [u8; 2],
}

impl Pwm {
    pub const MAX_DUTY_CYCLE: u8 = 100;

    pub fn new(sdk: Arc<dyn Daqc2Sdk>, address: u8) -> Result<Self, PlateError> {
        if !sdk.verify_addr(address) {
            return Err(PlateError::InvalidAddress(address));
        }
        Ok(Self {
            sdk,
            address,
            active: [false; 2],
            duty_cycle: [0; 2],
        })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    fn index(channel: u8) -> Result<usize, PlateError> {
        match channel {
            1 | 2 => Ok(usize::from(channel - 1)),
            _ => Err(PlateError::out_of_range("PWM channel", channel)),
        }
    }

    pub fn is_active(&self, channel: u8) -> Result<bool, PlateError> {
        Ok(self.active[Self::index(channel)?])
    }

    pub fn set_active(&mut self, channel: u8, active: bool) -> Result<(), PlateError> {
        self.active[Self::index(channel)?] = active;
        self.push();
        Ok(())
    }

    pub fn duty_cycle(&self, channel: u8) -> Result<u8, PlateError> {
        Ok(self.duty_cycle[Self::index(channel)?])
    }

    /// Duty cycle in percent.
    pub fn set_duty_cycle(&mut self, channel: u8, duty_cycle: u8) -> Result<(), PlateError> {
        let i = Self::index(channel)?;
        if duty_cycle > Self::MAX_DUTY_CYCLE {
            return Err(PlateError::out_of_range("duty cycle", duty_cycle));
        }
        self.duty_cycle[i] = duty_cycle;
        self.push();
        Ok(())
    }

    fn push(&self) {
        for (channel, (active, duty)) in (1..=2).zip(self.active.iter().zip(self.duty_cycle)) {
            self.sdk
                .set_pwm(self.address, channel, if *active { duty } else { 0 });
        }
    }
}
