//! # labdrivers
//!
//! Drivers for a handful of lab instruments found on an automated test bench.
//!
//! ## Features
//!
//! - **TTi 1604 multimeter**: key presses and decoding of the 10-byte display frames
//!   sent over the optical serial cable
//! - **Delta power supply bridge**: line-based serial protocol with typed error codes
//! - **Tektronix oscilloscopes**: SCPI waveform transfer with calibration caching,
//!   returning voltages that can be turned into a `polars` `DataFrame`
//! - **Pi-Plates DAQC and DAQC2**: typed pin handles, function generator, PWM,
//!   stepper motors, sonar and the DAQC2 oscilloscope
//! - **Thread safety**: serial drivers share one link between threads and never
//!   interleave two exchanges
//!
//! ## Examples
//!
//! ### Multimeter
//!
//! ```rust,no_run
//! use labdrivers::{Key, SerialConfig, Tti1604};
//! use std::time::Duration;
//!
//! let dmm = Tti1604::connect_new(SerialConfig::dmm_default())?;
//! dmm.press(Key::Ac, Tti1604::DEFAULT_LOCK_TIMEOUT)?;
//! println!("Reading: {}", dmm.get_value()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Power supply
//!
//! ```rust,no_run
//! use labdrivers::{DeltaPsu, SerialConfig};
//!
//! let psu = DeltaPsu::connect_new(SerialConfig::psu("/dev/ttyACM0"))?;
//! psu.set_voltage(5.0)?;
//! psu.set_current(0.5)?;
//! psu.set_runmode()?;
//! println!("Output at {} V", psu.get_voltage()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Oscilloscope
//!
//! Any [`ScopeSession`] can drive the scope. With the `visa` feature,
//! `TektronixScope::open` connects through a VISA resource string.
//!
//! ```rust,ignore
//! use labdrivers::{AcquisitionRequest, TektronixScope};
//!
//! let mut scope = TektronixScope::open("TCPIP::192.168.1.20::INSTR")?;
//! let request = AcquisitionRequest::new()
//!     .channel(1)
//!     .samples(1, 5000)
//!     .with_time_axis();
//! let waveform = scope.read_data_one_channel(&request)?;
//! println!("{}", waveform.to_dataframe()?);
//! ```

pub mod config;
pub mod dmm;
pub mod dmm_frame;
pub mod plate;
pub mod psu;
pub mod scope;
pub mod serial_link;
#[cfg(feature = "visa")]
pub mod visa_session;

// Re-export the main types for convenience
pub use config::SerialConfig;

pub use serial_link::{available_ports, PortInfo, SerialLink, SerialLinkError, SerialPortLink};

pub use dmm::{DmmError, Key, Tti1604};

pub use dmm_frame::{Coupling, DmmFrame, DmmRange, DmmState, MeasurementType, Reading};

pub use psu::{DeltaPsu, PsuError};

pub use scope::{
    AcquisitionRequest, Calibration, ChannelRef, Impedance, ScopeError, ScopeSession,
    TektronixScope, Waveform,
};

#[cfg(feature = "visa")]
pub use visa_session::VisaSession;

pub use plate::PlateError;
