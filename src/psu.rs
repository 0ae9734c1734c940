use crate::config::SerialConfig;
use crate::serial_link::{SerialLink, SerialLinkError, SerialPortLink};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum PsuError {
    #[error("Not connected to PSU")]
    NotConnected,

    #[error("Timeout while waiting for PSU lock after {0:?}, the last command is not finished yet")]
    LockTimeout(Duration),

    #[error("Timeout while waiting for PSU response after {0:?}")]
    ResponseTimeout(Duration),

    #[error("PSU does not know the command: {0}")]
    UnknownCommand(String),

    #[error("PSU rejected value as out of bounds: {0}")]
    ValueOutOfBounds(String),

    #[error("PSU current limit tripped: {0}")]
    CurrentLimit(String),

    #[error("PSU runtime error: {0}")]
    Runtime(String),

    #[error("Unknown error code {0} returned by PSU")]
    UnknownErrorCode(i32),

    #[error("{what} must be between {min} and {max}, not {value}")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Unexpected PSU response: {0:?}")]
    InvalidResponse(String),

    #[error("Serial link error: {0}")]
    Link(#[from] SerialLinkError),
}

type Link = Box<dyn SerialLink>;

/// Delta Elektronika power supply driven through the analog control
/// connector by a small microcontroller bridge speaking a line protocol.
///
/// Commands are terminated with `\r`; each is answered by one line that is
/// either a value, `OK`, or `err: <code> <message>`.
pub struct DeltaPsu {
    config: SerialConfig,
    link: Mutex<Option<Link>>,
    // last known link state, for status reads while an exchange runs
    connected: AtomicBool,
}

impl DeltaPsu {
    pub const VOLTAGE_RANGE: (f64, f64) = (0.0, 30.0);
    pub const CURRENT_RANGE: (f64, f64) = (0.0, 5.0);

    const POLL_INTERVAL: Duration = Duration::from_millis(1);

    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            link: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    pub fn connect_new(config: SerialConfig) -> Result<Self, PsuError> {
        let psu = Self::new(config);
        psu.connect()?;
        Ok(psu)
    }

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

    pub fn connect(&self) -> Result<(), PsuError> {
        let mut guard = self.acquire(self.config.timeout())?;
        if guard.as_ref().is_some_and(|l| l.is_open()) {
            return Ok(());
        }
        let link = SerialPortLink::open(
            &self.config.port,
            self.config.baud_rate,
            self.config.timeout(),
        )?;
        *guard = Some(Box::new(link));
        self.connected.store(true, Ordering::Release);
        log::info!("Connected to PSU on port {}", self.config.port);
        Ok(())
    }

    pub fn disconnect(&self) -> Result<(), PsuError> {
        let mut guard = self.acquire(self.config.timeout())?;
        self.connected.store(false, Ordering::Release);
        if guard.take().is_some() {
            log::info!("Disconnected from PSU on port {}", self.config.port);
        }
        Ok(())
    }

    fn acquire(&self, timeout: Duration) -> Result<MutexGuard<'_, Option<Link>>, PsuError> {
        self.link
            .try_lock_for(timeout)
            .ok_or(PsuError::LockTimeout(timeout))
    }

    /// Send one command and wait for its reply line. `Ok(None)` means `OK`.
    #[tracing::instrument(skip(self), level = "debug")]
    fn exchange(&self, command: &str, timeout: Duration) -> Result<Option<String>, PsuError> {
        let mut command = command.to_string();
        if !command.ends_with('\r') {
            command.push('\r');
        }

        let mut guard = self.acquire(timeout)?;
        let link = match guard.as_mut() {
            Some(link) if link.is_open() => link,
            _ => return Err(PsuError::NotConnected),
        };

        link.write_all(command.as_bytes())?;

        let deadline = Instant::now() + timeout;
        while link.bytes_waiting()? == 0 {
            if Instant::now() >= deadline {
                return Err(PsuError::ResponseTimeout(timeout));
            }
            thread::sleep(Self::POLL_INTERVAL);
        }
        let line = link.read_line()?;
        drop(guard);

        let response = String::from_utf8_lossy(&line).trim().to_string();
        log::debug!("PSU {:?} -> {:?}", command.trim_end(), response);
        parse_response(response)
    }

    fn send(&self, command: &str) -> Result<Option<String>, PsuError> {
        self.exchange(command, self.config.timeout())
    }

    pub fn set_runmode(&self) -> Result<(), PsuError> {
        self.send("r").map(|_| ())
    }

    pub fn set_stopmode(&self) -> Result<(), PsuError> {
        self.send("s").map(|_| ())
    }

    /// Set the output voltage in volts.
    pub fn set_voltage(&self, voltage: f64) -> Result<(), PsuError> {
        let millivolts = to_milli("voltage", voltage, Self::VOLTAGE_RANGE)?;
        self.send(&format!("sv {millivolts}")).map(|_| ())
    }

    pub fn get_voltage(&self) -> Result<f64, PsuError> {
        self.read_milli("gv")
    }

    /// Set the current limit in amperes.
    pub fn set_current(&self, current: f64) -> Result<(), PsuError> {
        let milliamps = to_milli("current", current, Self::CURRENT_RANGE)?;
        self.send(&format!("sc {milliamps}")).map(|_| ())
    }

    pub fn get_current(&self) -> Result<f64, PsuError> {
        self.read_milli("gc")
    }

    fn read_milli(&self, command: &str) -> Result<f64, PsuError> {
        let response = self
            .send(command)?
            .ok_or_else(|| PsuError::InvalidResponse("OK".to_string()))?;
        let milli: f64 = response
            .parse()
            .map_err(|_| PsuError::InvalidResponse(response.clone()))?;
        Ok(milli / 1000.0)
    }
}

fn to_milli(what: &'static str, value: f64, (min, max): (f64, f64)) -> Result<i64, PsuError> {
    if !(min..=max).contains(&value) {
        return Err(PsuError::OutOfRange {
            what,
            value,
            min,
            max,
        });
    }
    Ok((value * 1000.0).round() as i64)
}

fn parse_response(response: String) -> Result<Option<String>, PsuError> {
    if response == "OK" {
        return Ok(None);
    }
    let Some(rest) = response.strip_prefix("err:") else {
        return Ok(Some(response));
    };

    let mut parts = rest.trim_start().splitn(2, ' ');
    let code: i32 = parts
        .next()
        .and_then(|c| c.parse().ok())
        .ok_or_else(|| PsuError::InvalidResponse(response.clone()))?;
    let message = parts.next().unwrap_or_default().trim().to_string();

    Err(match code {
        0 => PsuError::UnknownCommand(message),
        1 => PsuError::ValueOutOfBounds(message),
        2 => PsuError::CurrentLimit(message),
        3 => PsuError::Runtime(message),
        other => PsuError::UnknownErrorCode(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial_link::mock::MockLink;
    use std::sync::Arc;

    fn psu(link: &MockLink) -> DeltaPsu {
        let config = SerialConfig::psu("/dev/ttyACM0").with_timeout(Duration::from_millis(100));
        DeltaPsu::with_link(config, link.clone())
    }

    #[test]
    fn test_set_voltage_sends_millivolts() {
        let link = MockLink::new();
        link.queue_reply(b"OK\r\n");
        psu(&link).set_voltage(12.5).unwrap();
        assert_eq!(link.written(), vec![b"sv 12500\r".to_vec()]);
    }

    #[test]
    fn test_set_current_sends_milliamps() {
        let link = MockLink::new();
        link.queue_reply(b"OK\r\n");
        psu(&link).set_current(0.25).unwrap();
        assert_eq!(link.written(), vec![b"sc 250\r".to_vec()]);
    }

    #[test]
    fn test_get_voltage_and_current() {
        let link = MockLink::new();
        let psu = psu(&link);
        link.queue_reply(b"12000\r\n");
        assert!((psu.get_voltage().unwrap() - 12.0).abs() < 1e-9);
        link.queue_reply(b"1500\r\n");
        assert!((psu.get_current().unwrap() - 1.5).abs() < 1e-9);
        assert_eq!(link.written(), vec![b"gv\r".to_vec(), b"gc\r".to_vec()]);
    }

    #[test]
    fn test_run_and_stop_mode() {
        let link = MockLink::new();
        let psu = psu(&link);
        link.queue_reply(b"OK\r\n");
        link.queue_reply(b"OK\r\n");
        psu.set_runmode().unwrap();
        psu.set_stopmode().unwrap();
        assert_eq!(link.written(), vec![b"r\r".to_vec(), b"s\r".to_vec()]);
    }

    #[test]
    fn test_out_of_range_is_rejected_before_io() {
        let link = MockLink::new();
        let psu = psu(&link);
        assert!(matches!(
            psu.set_voltage(30.5),
            Err(PsuError::OutOfRange { what: "voltage", .. })
        ));
        assert!(matches!(
            psu.set_current(-0.1),
            Err(PsuError::OutOfRange { what: "current", .. })
        ));
        assert!(link.events().is_empty());
    }

    #[test]
    fn test_error_codes() {
        let link = MockLink::new();
        let psu = psu(&link);

        link.queue_reply(b"err: 0 xy\r\n");
        assert!(matches!(psu.set_runmode(), Err(PsuError::UnknownCommand(m)) if m == "xy"));
        link.queue_reply(b"err: 1 value too high\r\n");
        assert!(
            matches!(psu.set_runmode(), Err(PsuError::ValueOutOfBounds(m)) if m == "value too high")
        );
        link.queue_reply(b"err: 2 limit\r\n");
        assert!(matches!(psu.set_runmode(), Err(PsuError::CurrentLimit(_))));
        link.queue_reply(b"err: 3 fault\r\n");
        assert!(matches!(psu.set_runmode(), Err(PsuError::Runtime(_))));
        link.queue_reply(b"err: 9 what\r\n");
        assert!(matches!(psu.set_runmode(), Err(PsuError::UnknownErrorCode(9))));
        link.queue_reply(b"err: x\r\n");
        assert!(matches!(psu.set_runmode(), Err(PsuError::InvalidResponse(_))));
    }

    #[test]
    fn test_ok_where_value_expected() {
        let link = MockLink::new();
        link.queue_reply(b"OK\r\n");
        assert!(matches!(psu(&link).get_voltage(), Err(PsuError::InvalidResponse(_))));
    }

    #[test]
    fn test_response_timeout() {
        let link = MockLink::new();
        assert!(matches!(
            psu(&link).get_voltage(),
            Err(PsuError::ResponseTimeout(_))
        ));
    }

    #[test]
    fn test_not_connected() {
        let psu = DeltaPsu::new(SerialConfig::psu("/dev/null"));
        assert!(!psu.is_connected());
        assert!(matches!(psu.set_runmode(), Err(PsuError::NotConnected)));
    }

    #[test]
    fn test_lock_timeout() {
        let link = MockLink::new();
        let psu = Arc::new(psu(&link));

        // no reply queued: the first exchange holds the lock until it times out
        let slow = {
            let psu = Arc::clone(&psu);
            thread::spawn(move || psu.exchange("gv", Duration::from_millis(300)))
        };
        thread::sleep(Duration::from_millis(50));
        assert!(matches!(
            psu.exchange("gc", Duration::from_millis(20)),
            Err(PsuError::LockTimeout(_))
        ));

        let started = Instant::now();
        assert!(psu.is_connected());
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(matches!(
            slow.join().unwrap(),
            Err(PsuError::ResponseTimeout(_))
        ));
    }

    #[test]
    fn test_disconnect() {
        let link = MockLink::new();
        let psu = psu(&link);
        assert!(psu.is_connected());
        psu.disconnect().unwrap();
        assert!(!psu.is_connected());
    }
}
