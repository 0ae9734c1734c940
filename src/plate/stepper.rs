use super::{Daqc2Sdk, PlateError};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepDirection {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl StepDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clockwise => "cw",
            Self::CounterClockwise => "ccw",
        }
    }

    /// `1` for clockwise, `-1` for counter-clockwise.
    pub fn sign(&self) -> i8 {
        match self {
            Self::Clockwise => 1,
            Self::CounterClockwise => -1,
        }
    }
}

impl TryFrom<i8> for StepDirection {
    type Error = PlateError;

    fn try_from(sign: i8) -> Result<Self, PlateError> {
        match sign {
            1 => Ok(Self::Clockwise),
            -1 => Ok(Self::CounterClockwise),
            other => Err(PlateError::out_of_range("direction", other)),
        }
    }
}

/// Stepper motor controller on the DAQC2 motor outputs 1 and 2.
pub struct Stepper {
    sdk: Arc<dyn Daqc2Sdk>,
    address: u8,
    directions: [StepDirection; 2],
}

impl Stepper {
    pub fn new(sdk: Arc<dyn Daqc2Sdk>, address: u8) -> Result<Self, PlateError> {
        if !sdk.verify_addr(address) {
            return Err(PlateError::InvalidAddress(address));
        }
        Ok(Self {
            sdk,
            address,
            directions: [StepDirection::default(); 2],
        })
    }

    fn index(motor: u8) -> Result<usize, PlateError> {
        match motor {
            1 | 2 => Ok(usize::from(motor - 1)),
            _ => Err(PlateError::out_of_range("motor", motor)),
        }
    }

    /// Enable motor control on the plate.
    pub fn enable(&self) {
        self.sdk.motor_enable(self.address);
    }

    pub fn disable(&self) {
        self.sdk.motor_disable(self.address);
    }

    /// Stop the motor and remove its power.
    pub fn turn_off_motor(&self, motor: u8) -> Result<(), PlateError> {
        Self::index(motor)?;
        self.sdk.motor_off(self.address, motor);
        Ok(())
    }

    /// Stop the motor, keeping it powered.
    pub fn stop_motor(&self, motor: u8) -> Result<(), PlateError> {
        Self::index(motor)?;
        self.sdk.motor_stop(self.address, motor);
        Ok(())
    }

    pub fn move_steps(&self, motor: u8, steps: i32) -> Result<(), PlateError> {
        Self::index(motor)?;
        self.sdk.stepper_move(self.address, motor, steps);
        Ok(())
    }

    /// Run continuously in the motor's current direction until stopped.
    pub fn jog(&self, motor: u8) -> Result<(), PlateError> {
        let direction = self.directions[Self::index(motor)?];
        self.sdk.stepper_jog(self.address, motor, direction.as_str());
        Ok(())
    }

    /// `1` for clockwise, `-1` for counter-clockwise.
    pub fn set_direction(&mut self, motor: u8, direction: i8) -> Result<(), PlateError> {
        let direction = StepDirection::try_from(direction)?;
        let i = Self::index(motor)?;
        self.directions[i] = direction;
        self.sdk.motor_dir(self.address, motor, direction.as_str());
        Ok(())
    }

    pub fn get_direction(&self, motor: u8) -> Result<i8, PlateError> {
        Ok(self.directions[Self::index(motor)?].sign())
    }

    /// Step rate in steps per second.
    pub fn set_speed(&self, motor: u8, rate: u32) -> Result<(), PlateError> {
        Self::index(motor)?;
        self.sdk.stepper_rate(self.address, motor, rate);
        Ok(())
    }
}
