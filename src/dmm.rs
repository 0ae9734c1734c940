use crate::config::SerialConfig;
use crate::dmm_frame::{self, DmmFrame, DmmState, Reading, FRAME_LEN};
use crate::serial_link::{SerialLink, SerialLinkError, SerialPortLink};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DmmError {
    #[error("Not connected to TTi 1604, call connect() first")]
    NotConnected,

    #[error("Could not acquire the serial link within {0:?}")]
    LockTimeout(Duration),

    #[error("Expected a 10-byte frame but the meter sent {len} bytes")]
    IncompleteFrame { len: usize },

    #[error("Serial link error: {0}")]
    Link(#[from] SerialLinkError),
}

/// Front panel keys. The meter echoes the key code when it accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Auto,
    Amp,
    MilliAmp,
    Volt,
    Operate,
    Ohm,
    Hertz,
    Shift,
    Ac,
    Dc,
    MilliVolt,
    Remote,
    Local,
}

impl Key {
    pub const fn as_byte(&self) -> u8 {
        match self {
            Self::Up => b'a',
            Self::Down => b'b',
            Self::Auto => b'c',
            Self::Amp => b'd',
            Self::MilliAmp => b'e',
            Self::Volt => b'f',
            Self::Operate => b'g',
            Self::Ohm => b'i',
            Self::Hertz => b'j',
            Self::Shift => b'k',
            Self::Ac => b'l',
            Self::Dc => b'm',
            Self::MilliVolt => b'n',
            Self::Remote => b'u',
            Self::Local => b'v',
        }
    }
}

type Link = Box<dyn SerialLink>;

/// TTi 1604 bench multimeter on its optical serial cable.
///
/// Safe to share between threads. Every exchange with the meter holds the
/// link lock for its whole reset/write/read sequence, so a keypress and a
/// data poll never interleave on the wire.
pub struct Tti1604 {
    config: SerialConfig,
    link: Mutex<Option<Link>>,
    // last known link state, for status reads while an exchange runs
    connected: AtomicBool,
}

impl Tti1604 {
    /// Time the meter needs to act on a keypress before it echoes.
    pub const SETTLE_TIME: Duration = Duration::from_millis(300);
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create the driver without opening the port.
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            link: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Create the driver and open the port right away.
    pub fn connect_new(config: SerialConfig) -> Result<Self, DmmError> {
        let dmm = Self::new(config);
        dmm.connect(Self::DEFAULT_LOCK_TIMEOUT)?;
        Ok(dmm)
    }

    /// Wrap an already open link.
    pub fn with_link(config: SerialConfig, link: impl SerialLink + 'static) -> Self {
        let connected = AtomicBool::new(link.is_open());
        Self {
            config,
            link: Mutex::new(Some(Box::new(link))),
            connected,
        }
    }

    pub fn serial_port(&self) -> &str {
        &self.config.port
    }

    /// Never waits for the link: while another thread is mid-exchange the
    /// state recorded at the last connect or disconnect is reported.
    pub fn is_connected(&self) -> bool {
        match self.link.try_lock() {
            Some(guard) => guard.as_ref().is_some_and(|l| l.is_open()),
            None => self.connected.load(Ordering::Acquire),
        }
    }

    /// Open the serial port unless it is already open.
    pub fn connect(&self, timeout: Duration) -> Result<(), DmmError> {
        let mut guard = self.acquire(timeout)?;
        if guard.as_ref().is_some_and(|l| l.is_open()) {
            log::info!("Already connected to TTi 1604 on port {}", self.config.port);
            return Ok(());
        }

        let mut link = SerialPortLink::open(
            &self.config.port,
            self.config.baud_rate,
            self.config.timeout(),
        )?;
        link.set_control_lines(false, true)?;
        *guard = Some(Box::new(link));
        self.connected.store(true, Ordering::Release);
        log::info!("Connected to TTi 1604 on port {}", self.config.port);
        Ok(())
    }

    pub fn disconnect(&self, timeout: Duration) -> Result<(), DmmError> {
        let mut guard = self.acquire(timeout)?;
        self.connected.store(false, Ordering::Release);
        if guard.take().is_some() {
            log::info!("Disconnected from TTi 1604 on port {}", self.config.port);
        }
        Ok(())
    }

    fn acquire(&self, timeout: Duration) -> Result<MutexGuard<'_, Option<Link>>, DmmError> {
        self.link
            .try_lock_for(timeout)
            .ok_or(DmmError::LockTimeout(timeout))
    }

    fn open_link<'a>(guard: &'a mut MutexGuard<'_, Option<Link>>) -> Result<&'a mut Link, DmmError> {
        match guard.as_mut() {
            Some(link) if link.is_open() => Ok(link),
            _ => Err(DmmError::NotConnected),
        }
    }

    /// Send a raw command and report whether the meter echoed it back.
    ///
    /// A missing or wrong echo is not an error; it just returns `false`.
    /// Command bytes are forwarded unchecked.
    pub fn send_command(&self, command: &[u8], timeout: Duration) -> Result<bool, DmmError> {
        let mut guard = self.acquire(timeout)?;
        let link = Self::open_link(&mut guard)?;

        link.reset_input_buffer()?;
        link.reset_output_buffer()?;
        link.write_all(command)?;
        thread::sleep(Self::SETTLE_TIME);
        let response = link.read_up_to(FRAME_LEN)?;
        drop(guard);

        let accepted = command.len() == 1 && response.as_slice() == command;
        if accepted {
            log::debug!("Command {:?} ok", String::from_utf8_lossy(command));
        } else {
            log::warn!(
                "Command {:?} not acknowledged, meter answered {:?}",
                String::from_utf8_lossy(command),
                response
            );
        }
        Ok(accepted)
    }

    pub fn press(&self, key: Key, timeout: Duration) -> Result<bool, DmmError> {
        self.send_command(&[key.as_byte()], timeout)
    }

    /// Read one raw frame (up to [`FRAME_LEN`] bytes) from the meter.
    pub fn read_data(&self, timeout: Duration) -> Result<Vec<u8>, DmmError> {
        let mut guard = self.acquire(timeout)?;
        let link = Self::open_link(&mut guard)?;

        link.reset_input_buffer()?;
        link.reset_output_buffer()?;
        let data = link.read_up_to(FRAME_LEN)?;
        Ok(data)
    }

    /// Read and fully decode one frame; `None` when the meter had no reading.
    pub fn get_complete_state(&self) -> Result<Option<DmmState>, DmmError> {
        let raw = self.read_data(Self::DEFAULT_LOCK_TIMEOUT)?;
        let state = DmmFrame::from_bytes(&raw).and_then(|f| dmm_frame::parse_data(&f));
        match &state {
            Some(s) => log::debug!(
                "{} {} {} value={} hold={} minmax={} hertz={} null={} auto={}",
                s.measurement_label(),
                s.coupling.as_str(),
                s.range_label(),
                s.value,
                s.hold,
                s.min_max,
                s.hertz,
                s.null,
                s.auto
            ),
            None => log::debug!("No data in frame {:?}", raw),
        }
        Ok(state)
    }

    /// Read the display value, scaled to ohms on the kOhm ranges.
    pub fn get_value(&self) -> Result<Reading, DmmError> {
        let raw = self.read_data(Self::DEFAULT_LOCK_TIMEOUT)?;
        let frame =
            DmmFrame::from_bytes(&raw).ok_or(DmmError::IncompleteFrame { len: raw.len() })?;
        Ok(dmm_frame::parse_number_unit(&frame))
    }
}
