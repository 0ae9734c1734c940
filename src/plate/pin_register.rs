use super::PlateError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PinKind {
    DigitalInput,
    DigitalOutput,
    AnalogInput,
    AnalogOutput,
}

impl PinKind {
    pub const ALL: [Self; 4] = [
        Self::DigitalInput,
        Self::DigitalOutput,
        Self::AnalogInput,
        Self::AnalogOutput,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DigitalInput => "digital input",
            Self::DigitalOutput => "digital output",
            Self::AnalogInput => "analog input",
            Self::AnalogOutput => "analog output",
        }
    }

    /// Pin numbers a register accepts for this kind.
    pub fn valid_pins(&self) -> RangeInclusive<u8> {
        match self {
            Self::DigitalInput | Self::DigitalOutput | Self::AnalogInput => 0..=7,
            Self::AnalogOutput => 1..=3,
        }
    }
}

impl fmt::Display for PinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pins currently handed out by one plate, per kind.
#[derive(Debug, Default)]
pub struct PinRegister {
    pins: Mutex<BTreeMap<PinKind, BTreeSet<u8>>>,
}

impl PinRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: PinKind, pin: u8) -> Result<(), PlateError> {
        if !kind.valid_pins().contains(&pin) {
            return Err(PlateError::InvalidPin { kind, pin });
        }
        let mut pins = self.pins.lock();
        if !pins.entry(kind).or_default().insert(pin) {
            return Err(PlateError::PinAlreadyRegistered { kind, pin });
        }
        log::debug!("Registered {} {}", kind, pin);
        Ok(())
    }

    pub fn unregister(&self, kind: PinKind, pin: u8) -> Result<(), PlateError> {
        let removed = self
            .pins
            .lock()
            .get_mut(&kind)
            .is_some_and(|set| set.remove(&pin));
        if removed {
            log::debug!("Released {} {}", kind, pin);
            Ok(())
        } else {
            Err(PlateError::PinNotRegistered { kind, pin })
        }
    }

    pub fn is_registered(&self, kind: PinKind, pin: u8) -> bool {
        self.pins
            .lock()
            .get(&kind)
            .is_some_and(|set| set.contains(&pin))
    }

    /// Sorted pins claimed for `kind`.
    pub fn pins(&self, kind: PinKind) -> Vec<u8> {
        self.pins
            .lock()
            .get(&kind)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// A pin held in a shared register until released.
#[derive(Debug)]
pub struct PinClaim {
    register: Arc<PinRegister>,
    kind: PinKind,
    pin: u8,
}

impl PinClaim {
    pub fn acquire(register: &Arc<PinRegister>, kind: PinKind, pin: u8) -> Result<Self, PlateError> {
        register.register(kind, pin)?;
        Ok(Self {
            register: Arc::clone(register),
            kind,
            pin,
        })
    }

    pub fn kind(&self) -> PinKind {
        self.kind
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn release(self) -> Result<(), PlateError> {
        self.register.unregister(self.kind, self.pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_double_registration_fails() {
        let register = PinRegister::new();
        register.register(PinKind::DigitalInput, 3).unwrap();
        assert_eq!(
            register.register(PinKind::DigitalInput, 3),
            Err(PlateError::PinAlreadyRegistered {
                kind: PinKind::DigitalInput,
                pin: 3
            })
        );
    }

    #[test]
    fn test_kinds_are_independent() {
        let register = PinRegister::new();
        register.register(PinKind::DigitalInput, 2).unwrap();
        register.register(PinKind::AnalogInput, 2).unwrap();
        assert_eq!(register.pins(PinKind::DigitalInput), vec![2]);
        assert_eq!(register.pins(PinKind::AnalogInput), vec![2]);
        assert!(register.pins(PinKind::DigitalOutput).is_empty());
    }

    #[test]
    fn test_ranges() {
        let register = PinRegister::new();
        assert!(register.register(PinKind::DigitalOutput, 7).is_ok());
        assert!(register.register(PinKind::DigitalOutput, 8).is_err());
        assert!(register.register(PinKind::AnalogOutput, 0).is_err());
        assert!(register.register(PinKind::AnalogOutput, 3).is_ok());
        assert!(register.register(PinKind::AnalogOutput, 4).is_err());
    }

    #[test]
    fn test_unregister() {
        let register = PinRegister::new();
        assert!(matches!(
            register.unregister(PinKind::AnalogInput, 1),
            Err(PlateError::PinNotRegistered { .. })
        ));
        register.register(PinKind::AnalogInput, 1).unwrap();
        register.unregister(PinKind::AnalogInput, 1).unwrap();
        assert!(!register.is_registered(PinKind::AnalogInput, 1));
        register.register(PinKind::AnalogInput, 1).unwrap();
    }

    #[test]
    fn test_claim_release() {
        let register = Arc::new(PinRegister::new());
        let claim = PinClaim::acquire(&register, PinKind::DigitalOutput, 4).unwrap();
        assert!(PinClaim::acquire(&register, PinKind::DigitalOutput, 4).is_err());
        assert_eq!(claim.pin(), 4);
        claim.release().unwrap();
        assert!(PinClaim::acquire(&register, PinKind::DigitalOutput, 4).is_ok());
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let register = Arc::new(PinRegister::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let register = Arc::clone(&register);
                thread::spawn(move || register.register(PinKind::DigitalInput, 5).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .filter_map(|h| h.join().ok())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
