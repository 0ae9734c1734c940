use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum SerialLinkError {
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-oriented duplex channel owned by exactly one driver.
///
/// `read_up_to` returns whatever arrived within the link's read timeout,
/// which may be fewer than `max` bytes or none at all.
pub trait SerialLink: Send {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialLinkError>;

    fn read_up_to(&mut self, max: usize) -> Result<Vec<u8>, SerialLinkError>;

    fn reset_input_buffer(&mut self) -> Result<(), SerialLinkError>;

    fn reset_output_buffer(&mut self) -> Result<(), SerialLinkError>;

    fn is_open(&self) -> bool;

    /// Number of bytes already received and waiting to be read.
    fn bytes_waiting(&mut self) -> Result<u32, SerialLinkError>;

    /// Read until `\n` or until a read returns nothing.
    fn read_line(&mut self) -> Result<Vec<u8>, SerialLinkError> {
        let mut line = Vec::new();
        loop {
            let byte = self.read_up_to(1)?;
            match byte.first() {
                Some(&b) => {
                    line.push(b);
                    if b == b'\n' {
                        break;
                    }
                }
                None => break,
            }
        }
        Ok(line)
    }
}

#[derive(Debug)]
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl SerialPortLink {
    /// Open `port` at `baud_rate`; `timeout` bounds every read call.
    pub fn open(port: &str, baud_rate: u32, timeout: Duration) -> Result<Self, SerialLinkError> {
        log::debug!("Opening serial port {} at {} baud", port, baud_rate);
        let port = serialport::new(port, baud_rate).timeout(timeout).open()?;
        Ok(Self { port, timeout })
    }

    /// Drive the modem control lines. Some meters power their optical
    /// interface from DTR and need RTS held low.
    pub fn set_control_lines(&mut self, rts: bool, dtr: bool) -> Result<(), SerialLinkError> {
        self.port.write_request_to_send(rts)?;
        self.port.write_data_terminal_ready(dtr)?;
        Ok(())
    }

    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl SerialPortLink {
    /// Wrap a port that is already open.
    pub fn from_port(port: Box<dyn SerialPort>, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Each read waits at most for what is left of the window, so the whole
    /// call returns within `timeout` even when bytes trickle in late.
    fn read_within_window(&mut self, max: usize) -> Result<Vec<u8>, SerialLinkError> {
        let mut buffer = vec![0u8; max];
        let mut filled = 0;
        let start = Instant::now();

        while filled < max {
            let remaining = self.timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            self.port.set_timeout(remaining)?;
            match self.port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        buffer.truncate(filled);
        Ok(buffer)
    }
}

impl SerialLink for SerialPortLink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialLinkError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_up_to(&mut self, max: usize) -> Result<Vec<u8>, SerialLinkError> {
        let result = self.read_within_window(max);
        // writes keep using the configured timeout
        self.port.set_timeout(self.timeout)?;
        result
    }

    fn reset_input_buffer(&mut self) -> Result<(), SerialLinkError> {
        self.port.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }

    fn reset_output_buffer(&mut self) -> Result<(), SerialLinkError> {
        self.port.clear(serialport::ClearBuffer::Output)?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        // The handle is closed by dropping it.
        true
    }

    fn bytes_waiting(&mut self) -> Result<u32, SerialLinkError> {
        Ok(self.port.bytes_to_read()?)
    }
}

#[derive(Debug, Clone)]
pub struct PortInfo {
    pub port: String,
    pub description: String,
}

/// List the serial ports the operating system reports.
pub fn available_ports() -> Result<Vec<PortInfo>, SerialLinkError> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let description = match &p.port_type {
                serialport::SerialPortType::UsbPort(usb) => format!(
                    "USB {:04x}:{:04x} {}",
                    usb.vid,
                    usb.pid,
                    usb.product.as_deref().unwrap_or("Serial Port")
                ),
                serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
                serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
                serialport::SerialPortType::Unknown => "Serial Port".to_string(),
            };
            PortInfo {
                port: p.port_name,
                description,
            }
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod mock {
    use super::{SerialLink, SerialLinkError};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::thread::{self, ThreadId};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        ResetInput,
        ResetOutput,
        Write(Vec<u8>),
        Read(usize),
    }

    #[derive(Debug, Default)]
    pub struct Shared {
        pub events: Vec<(ThreadId, Event)>,
        pub replies: VecDeque<Vec<u8>>,
        pub written: Vec<Vec<u8>>,
    }

    /// Scripted link: every `read_up_to` pops the next queued reply.
    #[derive(Debug, Clone, Default)]
    pub struct MockLink {
        pub shared: Arc<Mutex<Shared>>,
        pub echo: bool,
        pub closed: bool,
    }

    impl MockLink {
        pub fn new() -> Self {
            Self::default()
        }

        /// A link that answers every write with the written bytes.
        pub fn echoing() -> Self {
            Self {
                echo: true,
                ..Self::default()
            }
        }

        pub fn queue_reply(&self, reply: &[u8]) {
            self.shared.lock().replies.push_back(reply.to_vec());
        }

        pub fn written(&self) -> Vec<Vec<u8>> {
            self.shared.lock().written.clone()
        }

        pub fn events(&self) -> Vec<(ThreadId, Event)> {
            self.shared.lock().events.clone()
        }

        fn record(&self, event: Event) {
            self.shared.lock().events.push((thread::current().id(), event));
        }
    }

    impl SerialLink for MockLink {
        fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialLinkError> {
            self.record(Event::Write(bytes.to_vec()));
            let mut shared = self.shared.lock();
            shared.written.push(bytes.to_vec());
            if self.echo {
                shared.replies.push_back(bytes.to_vec());
            }
            Ok(())
        }

        fn read_up_to(&mut self, max: usize) -> Result<Vec<u8>, SerialLinkError> {
            self.record(Event::Read(max));
            let mut shared = self.shared.lock();
            let Some(mut reply) = shared.replies.pop_front() else {
                return Ok(Vec::new());
            };
            if reply.len() > max {
                let rest = reply.split_off(max);
                shared.replies.push_front(rest);
            }
            Ok(reply)
        }

        fn reset_input_buffer(&mut self) -> Result<(), SerialLinkError> {
            self.record(Event::ResetInput);
            Ok(())
        }

        fn reset_output_buffer(&mut self) -> Result<(), SerialLinkError> {
            self.record(Event::ResetOutput);
            Ok(())
        }

        fn is_open(&self) -> bool {
            !self.closed
        }

        fn bytes_waiting(&mut self) -> Result<u32, SerialLinkError> {
            let shared = self.shared.lock();
            Ok(shared.replies.iter().map(|r| r.len() as u32).sum())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockLink;
    use super::*;

    #[test]
    fn test_read_line_stops_at_newline() {
        let mut link = MockLink::new();
        link.queue_reply(b"12000\r\nnext");
        let line = link.read_line().unwrap();
        assert_eq!(line, b"12000\r\n");
        assert_eq!(link.read_up_to(10).unwrap(), b"next");
    }

    #[test]
    fn test_read_line_returns_partial_on_silence() {
        let mut link = MockLink::new();
        link.queue_reply(b"OK");
        assert_eq!(link.read_line().unwrap(), b"OK");
    }

    #[cfg(unix)]
    #[test]
    fn test_read_up_to_returns_within_window() {
        use serialport::TTYPort;
        use std::thread;

        let (master, mut slave) = TTYPort::pair().unwrap();
        let window = Duration::from_millis(1000);
        let mut link = SerialPortLink::from_port(Box::new(master), window);

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(900));
            slave.write_all(b"a").unwrap();
            slave.flush().unwrap();
            // keep the pty open until the reader is done
            thread::sleep(Duration::from_millis(600));
            slave
        });

        let started = Instant::now();
        let bytes = link.read_up_to(10).unwrap();
        let elapsed = started.elapsed();
        writer.join().unwrap();

        assert_eq!(bytes, b"a");
        assert!(elapsed < Duration::from_millis(1200), "took {:?}", elapsed);
    }

    #[test]
    fn test_available_ports_does_not_fail_without_hardware() {
        // Enumeration may legitimately fail in sandboxed environments.
        if let Ok(ports) = available_ports() {
            for port in ports {
                assert!(!port.port.is_empty());
            }
        }
    }
}
