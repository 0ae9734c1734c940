use super::{Daqc2Sdk, PlateError};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FgWaveform {
    Sine,
    Triangle,
    Square,
    SawtoothRising,
    SawtoothFalling,
    Noise,
    Sinc,
}

impl FgWaveform {
    pub const ALL: [Self; 7] = [
        Self::Sine,
        Self::Triangle,
        Self::Square,
        Self::SawtoothRising,
        Self::SawtoothFalling,
        Self::Noise,
        Self::Sinc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Triangle => "triangle",
            Self::Square => "square",
            Self::SawtoothRising => "sawtooth rising",
            Self::SawtoothFalling => "sawtooth falling",
            Self::Noise => "noise",
            Self::Sinc => "sinc",
        }
    }

    /// Waveform number as the plate firmware counts them.
    pub fn index(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for FgWaveform {
    type Error = PlateError;

    fn try_from(index: u8) -> Result<Self, PlateError> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or_else(|| PlateError::out_of_range("waveform", index))
    }
}

impl FromStr for FgWaveform {
    type Err = PlateError;

    fn from_str(name: &str) -> Result<Self, PlateError> {
        Self::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| PlateError::out_of_range("waveform", name))
    }
}

impl fmt::Display for FgWaveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output amplitude divider: level 1 is 0 to 5 V, each further level halves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attenuation(u8);

impl Attenuation {
    const NAMES: [&'static str; 4] = ["1", "1/2", "1/4", "1/8"];

    pub fn level(&self) -> u8 {
        self.0
    }

    pub fn as_str(&self) -> &'static str {
        Self::NAMES[usize::from(self.0 - 1)]
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u8> for Attenuation {
    type Error = PlateError;

    fn try_from(level: u8) -> Result<Self, PlateError> {
        if (1..=4).contains(&level) {
            Ok(Self(level))
        } else {
            Err(PlateError::out_of_range("attenuation", level))
        }
    }
}

impl FromStr for Attenuation {
    type Err = PlateError;

    fn from_str(name: &str) -> Result<Self, PlateError> {
        Self::NAMES
            .iter()
            .position(|n| *n == name.trim())
            .map(|i| Self(i as u8 + 1))
            .ok_or_else(|| PlateError::out_of_range("attenuation", name))
    }
}

/// The DAQC2 two-channel function generator on DAC 0 and 1.
///
/// Enabling it puts the whole plate in generator mode; DAC 0 and 1 must not
/// be in use and the plate oscilloscope must be off. Neither is checked.
pub struct FunctionGenerator {
    sdk: Arc<dyn Daqc2Sdk>,
    address: u8,
    waveform: [FgWaveform; 2],
    frequency: [u32; 2],
    attenuation: [Attenuation; 2],
}

impl FunctionGenerator {
    pub const FREQUENCY_RANGE: std::ops::RangeInclusive<u32> = 10..=10_000;

    pub fn new(sdk: Arc<dyn Daqc2Sdk>, address: u8) -> Result<Self, PlateError> {
        if !sdk.verify_addr(address) {
            return Err(PlateError::InvalidAddress(address));
        }
        Ok(Self {
            sdk,
            address,
            waveform: [FgWaveform::Sine; 2],
            frequency: [1000; 2],
            attenuation: [Attenuation::default(); 2],
        })
    }

    fn index(channel: u8) -> Result<usize, PlateError> {
        match channel {
            0 | 1 => Ok(usize::from(channel)),
            _ => Err(PlateError::out_of_range("function generator channel", channel)),
        }
    }

    pub fn enable(&self) {
        log::debug!("Function generator on at address {}", self.address);
        self.sdk.fg_on(self.address);
    }

    /// Generator mode ends once both channels are off.
    pub fn disable(&self) {
        log::debug!("Function generator off at address {}", self.address);
        self.sdk.fg_off(self.address);
    }

    pub fn set_waveform(&mut self, channel: u8, waveform: FgWaveform) -> Result<(), PlateError> {
        let i = Self::index(channel)?;
        self.sdk.fg_type(self.address, channel, waveform.index());
        self.waveform[i] = waveform;
        Ok(())
    }

    pub fn get_waveform(&self, channel: u8) -> Result<FgWaveform, PlateError> {
        Ok(self.waveform[Self::index(channel)?])
    }

    pub fn set_frequency(&mut self, channel: u8, hertz: u32) -> Result<(), PlateError> {
        let i = Self::index(channel)?;
        if !Self::FREQUENCY_RANGE.contains(&hertz) {
            return Err(PlateError::out_of_range("frequency", hertz));
        }
        self.sdk.fg_freq(self.address, channel, hertz);
        self.frequency[i] = hertz;
        Ok(())
    }

    pub fn get_frequency(&self, channel: u8) -> Result<u32, PlateError> {
        Ok(self.frequency[Self::index(channel)?])
    }

    pub fn set_attenuation(&mut self, channel: u8, attenuation: Attenuation) -> Result<(), PlateError> {
        let i = Self::index(channel)?;
        self.sdk.fg_ampl(self.address, channel, attenuation.level());
        self.attenuation[i] = attenuation;
        Ok(())
    }

    pub fn get_attenuation(&self, channel: u8) -> Result<Attenuation, PlateError> {
        Ok(self.attenuation[Self::index(channel)?])
    }
}

impl fmt::Display for FunctionGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function generator at address {}", self.address)
    }
}
