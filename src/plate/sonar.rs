use super::{DaqcSdk, PlateError};
use std::sync::Arc;

/// Ultrasonic rangers on the DAQC plate's sonar channels 1 to 7.
pub struct DaqcSonar {
    sdk: Arc<dyn DaqcSdk>,
    address: u8,
    active: [bool; 7],
}

impl DaqcSonar {
    pub const CHANNELS: std::ops::RangeInclusive<u8> = 1..=7;

    pub fn new(sdk: Arc<dyn DaqcSdk>, address: u8) -> Result<Self, PlateError> {
        if !sdk.verify_addr(address) {
            return Err(PlateError::InvalidAddress(address));
        }
        Ok(Self {
            sdk,
            address,
            active: [false; 7],
        })
    }

    fn index(channel: u8) -> Result<usize, PlateError> {
        if Self::CHANNELS.contains(&channel) {
            Ok(usize::from(channel - 1))
        } else {
            Err(PlateError::out_of_range("sonar channel", channel))
        }
    }

    pub fn set_active(&mut self, channel: u8) -> Result<(), PlateError> {
        self.active[Self::index(channel)?] = true;
        Ok(())
    }

    pub fn set_inactive(&mut self, channel: u8) -> Result<(), PlateError> {
        self.active[Self::index(channel)?] = false;
        Ok(())
    }

    pub fn is_active(&self, channel: u8) -> Result<bool, PlateError> {
        Ok(self.active[Self::index(channel)?])
    }

    /// Distance in centimetres from an active channel.
    pub fn get_distance(&self, channel: u8) -> Result<f64, PlateError> {
        if !self.is_active(channel)? {
            return Err(PlateError::ChannelNotActive(channel));
        }
        Ok(self.get_distance_fast(channel))
    }

    /// Distance without checking the channel.
    pub fn get_distance_fast(&self, channel: u8) -> f64 {
        self.sdk.get_range(self.address, channel)
    }

    /// One entry per channel, `None` for inactive ones.
    pub fn get_distance_all(&self) -> Vec<Option<f64>> {
        Self::CHANNELS
            .zip(self.active)
            .map(|(channel, active)| active.then(|| self.get_distance_fast(channel)))
            .collect()
    }
}
