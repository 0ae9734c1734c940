use polars::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::io::{ErrorKind, Read};

#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("Scope protocol error: {0}")]
    Protocol(String),

    #[error("Unexpected response to {command:?}: {response:?}")]
    InvalidResponse { command: String, response: String },

    #[error("Malformed binary block: {0}")]
    InvalidBlock(String),

    #[error("Could not construct scope: {0}")]
    Construction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "visa")]
    #[error("VISA error: {0}")]
    Visa(#[from] visa_rs::Error),
}

/// Message-based connection to an instrument.
pub trait ScopeSession {
    fn write(&mut self, command: &str) -> Result<(), ScopeError>;

    /// Send a query and return the reply without its line terminator.
    fn query(&mut self, command: &str) -> Result<String, ScopeError>;

    /// Send a query whose reply is binary. Sessions that cannot read raw
    /// bytes fall back to the text reply.
    fn query_raw(&mut self, command: &str) -> Result<Vec<u8>, ScopeError> {
        Ok(self.query(command)?.into_bytes())
    }
}

impl<S: ScopeSession + ?Sized> ScopeSession for Box<S> {
    fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        (**self).write(command)
    }

    fn query(&mut self, command: &str) -> Result<String, ScopeError> {
        (**self).query(command)
    }

    fn query_raw(&mut self, command: &str) -> Result<Vec<u8>, ScopeError> {
        (**self).query_raw(command)
    }
}

/// A channel as a caller names it: `2`, `"2"` or `"CH2"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    Number(i64),
    Name(String),
}

impl From<i32> for ChannelRef {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<u8> for ChannelRef {
    fn from(n: u8) -> Self {
        Self::Number(n.into())
    }
}

impl From<u32> for ChannelRef {
    fn from(n: u32) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for ChannelRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ChannelRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Name(s) => write!(f, "{}", s),
        }
    }
}

const IMPEDANCE_NAMES: [&str; 8] = [
    "FIF",
    "FIFty",
    "SEVENTYF",
    "SEVENTYFive",
    "MEG",
    "50",
    "75",
    "1.00E+06",
];
const IMPEDANCE_OHMS: [f64; 3] = [50.0, 75.0, 1.0e6];
const COUPLINGS: [&str; 3] = ["AC", "DC", "GND"];

/// Input impedance, either as an instrument token or in ohms.
#[derive(Debug, Clone, PartialEq)]
pub enum Impedance {
    Name(String),
    Ohms(f64),
}

impl From<&str> for Impedance {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<f64> for Impedance {
    fn from(ohms: f64) -> Self {
        Self::Ohms(ohms)
    }
}

impl From<i32> for Impedance {
    fn from(ohms: i32) -> Self {
        Self::Ohms(ohms.into())
    }
}

impl Impedance {
    /// The token sent to the instrument, or a protocol error naming the
    /// accepted values.
    pub fn token(&self) -> Result<String, ScopeError> {
        match self {
            Self::Name(name) => {
                if IMPEDANCE_NAMES.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                    Ok(name.clone())
                } else {
                    Err(ScopeError::Protocol(format!(
                        "Impedance is {}. It should be in {:?}",
                        name, IMPEDANCE_NAMES
                    )))
                }
            }
            Self::Ohms(ohms) => {
                if !IMPEDANCE_OHMS.contains(ohms) {
                    return Err(ScopeError::Protocol(format!(
                        "Impedance is {}. It should be in {:?}",
                        ohms, IMPEDANCE_OHMS
                    )));
                }
                if *ohms < 100.0 {
                    Ok(format!("{}", *ohms as i64))
                } else {
                    Ok("1.00E+06".to_string())
                }
            }
        }
    }
}

/// The four constants the instrument reports for converting raw curve
/// samples to physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Seconds between samples (`WFMO:XIN?`).
    pub x_increment: f64,
    /// Time of the first record point (`WFMO:XZERO?`).
    pub x_zero: f64,
    /// Volts per digitizer level (`WFMO:YMUlt?`).
    pub y_multiplier: f64,
    /// Digitizer level of zero volts (`WFMO:YOFf?`).
    pub y_offset: f64,
}

impl Calibration {
    pub fn rescale(&self, raw: i16) -> f64 {
        (f64::from(raw) - self.y_offset) * self.y_multiplier
    }

    /// Time of record point `index` (1-based, as `DATA:START` counts).
    pub fn time_of(&self, index: i64) -> f64 {
        self.x_zero + (index - 1) as f64 * self.x_increment
    }
}

/// Parameters of one curve transfer.
///
/// `data_start`/`data_stop` and `t0`/`delta_t` select the window and are
/// mutually exclusive. With `booster` set, every setting except the
/// channel is assumed unchanged since the previous transfer on the same
/// driver: window and calibration are reused without asking the
/// instrument. If the instrument was reconfigured in between, the returned
/// scaling is wrong.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcquisitionRequest {
    pub channel: Option<ChannelRef>,
    pub data_start: Option<i64>,
    pub data_stop: Option<i64>,
    pub t0: Option<f64>,
    pub delta_t: Option<f64>,
    pub with_time_axis: bool,
    pub booster: bool,
}

impl AcquisitionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(mut self, channel: impl Into<ChannelRef>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn samples(mut self, data_start: i64, data_stop: i64) -> Self {
        self.data_start = Some(data_start);
        self.data_stop = Some(data_stop);
        self
    }

    pub fn data_start(mut self, data_start: i64) -> Self {
        self.data_start = Some(data_start);
        self
    }

    pub fn data_stop(mut self, data_stop: i64) -> Self {
        self.data_stop = Some(data_stop);
        self
    }

    pub fn time_window(mut self, t0: f64, delta_t: f64) -> Self {
        self.t0 = Some(t0);
        self.delta_t = Some(delta_t);
        self
    }

    pub fn with_time_axis(mut self) -> Self {
        self.with_time_axis = true;
        self
    }

    pub fn booster(mut self, booster: bool) -> Self {
        self.booster = booster;
        self
    }

    fn validate(&self) -> Result<(), ScopeError> {
        let by_index = self.data_start.is_some() || self.data_stop.is_some();
        let by_time = self.t0.is_some() || self.delta_t.is_some();
        if by_index && by_time {
            return Err(ScopeError::Protocol(
                "t0, delta_t and data_start, data_stop are mutually exclusive".to_string(),
            ));
        }
        if by_time && (self.t0.is_none() || self.delta_t.is_none()) {
            return Err(ScopeError::Protocol(
                "t0 and delta_t must be given together".to_string(),
            ));
        }
        Ok(())
    }
}

const TIME_COLUMN_NAME: &str = "time";
const VOLTAGE_COLUMN_NAME: &str = "voltage";

/// One transferred curve in volts, optionally with its time axis in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub time: Option<Vec<f64>>,
    pub voltage: Vec<f64>,
}

impl Waveform {
    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }

    pub fn to_dataframe(&self) -> Result<DataFrame, PolarsError> {
        let mut columns: Vec<Column> = Vec::with_capacity(2);
        if let Some(time) = &self.time {
            columns.push(Series::new(TIME_COLUMN_NAME.into(), time.clone()).into());
        }
        columns.push(Series::new(VOLTAGE_COLUMN_NAME.into(), self.voltage.clone()).into());
        DataFrame::new(columns)
    }

    /// Single-row frame with `min`, `max` and `mean` of the voltage.
    pub fn voltage_summary(&self) -> Result<DataFrame, PolarsError> {
        self.to_dataframe()?
            .lazy()
            .select([
                col(VOLTAGE_COLUMN_NAME).min().alias("min"),
                col(VOLTAGE_COLUMN_NAME).max().alias("max"),
                col(VOLTAGE_COLUMN_NAME).mean().alias("mean"),
            ])
            .collect()
    }
}

/// Strip an IEEE 488.2 definite-length block header (`#<n><len><data>`)
/// and return the data. `#0` marks an indefinite block ending at the
/// line terminator.
pub fn parse_block(buffer: &[u8]) -> Result<&[u8], ScopeError> {
    let rest = match buffer.split_first() {
        Some((b'#', rest)) => rest,
        _ => return Err(ScopeError::InvalidBlock("missing '#' header".to_string())),
    };
    let (&digits, rest) = rest
        .split_first()
        .ok_or_else(|| ScopeError::InvalidBlock("truncated header".to_string()))?;
    if !digits.is_ascii_digit() {
        return Err(ScopeError::InvalidBlock(format!(
            "header length digit is {:?}",
            digits as char
        )));
    }

    let digits = usize::from(digits - b'0');
    if digits == 0 {
        return Ok(rest.strip_suffix(b"\n").unwrap_or(rest));
    }
    if rest.len() < digits {
        return Err(ScopeError::InvalidBlock("truncated header".to_string()));
    }
    let (len, data) = rest.split_at(digits);
    let len: usize = std::str::from_utf8(len)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            ScopeError::InvalidBlock(format!("bad length {:?}", String::from_utf8_lossy(len)))
        })?;
    data.get(..len).ok_or_else(|| {
        ScopeError::InvalidBlock(format!(
            "header announces {} bytes but only {} arrived",
            len,
            data.len()
        ))
    })
}

/// Read one IEEE 488.2 block reply off a message-based stream and return
/// it with its header, ready for [`parse_block`].
///
/// A definite block is done once the announced bytes are in; the line
/// terminator is taken along when it arrives in the same read, so an
/// instrument that ends the message with EOI alone is not waited on. A
/// `#0` block runs until a short read, a `\n` or a read timeout.
pub fn read_block(reader: &mut impl Read) -> Result<Vec<u8>, ScopeError> {
    let mut block = vec![0u8; 2];
    reader.read_exact(&mut block)?;
    let digits = match block.as_slice() {
        [b'#', d] if d.is_ascii_digit() => usize::from(d - b'0'),
        _ => {
            return Err(ScopeError::InvalidBlock(format!(
                "unexpected header {:?}",
                String::from_utf8_lossy(&block)
            )))
        }
    };

    if digits == 0 {
        read_to_message_end(reader, &mut block)?;
        return Ok(block);
    }

    let mut len = vec![0u8; digits];
    reader.read_exact(&mut len)?;
    let data_len: usize = std::str::from_utf8(&len)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            ScopeError::InvalidBlock(format!("bad length {:?}", String::from_utf8_lossy(&len)))
        })?;
    block.extend_from_slice(&len);

    // one spare byte for the terminator
    let start = block.len();
    block.resize(start + data_len + 1, 0);
    let mut filled = 0;
    while filled < data_len {
        match reader.read(&mut block[start + filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::TimedOut => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    if filled < data_len {
        return Err(ScopeError::InvalidBlock(format!(
            "header announces {} bytes but only {} arrived",
            data_len, filled
        )));
    }

    block.truncate(start + data_len);
    Ok(block)
}

fn read_to_message_end(reader: &mut impl Read, block: &mut Vec<u8>) -> Result<(), ScopeError> {
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(n) => {
                block.extend_from_slice(&chunk[..n]);
                if n < chunk.len() || chunk[n - 1] == b'\n' {
                    return Ok(());
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(()),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
}

/// Decode big-endian signed 16-bit samples.
pub fn decode_samples(data: &[u8]) -> Result<Vec<i16>, ScopeError> {
    if data.len() % 2 != 0 {
        return Err(ScopeError::InvalidBlock(format!(
            "{} data bytes is not a whole number of 16-bit samples",
            data.len()
        )));
    }
    Ok(data
        .chunks_exact(2)
        .map(|c| i16::from_be_bytes([c[0], c[1]]))
        .collect())
}

#[derive(Debug, Clone, Copy)]
struct LastAcquisition {
    data_start: i64,
    data_stop: i64,
    calibration: Calibration,
}

/// Tektronix TDS/DPO/MSO series oscilloscope.
///
/// Not synchronized: use one driver per thread or serialize access.
pub struct TektronixScope<S> {
    session: S,
    setup: Option<HashMap<String, String>>,
    last: Option<LastAcquisition>,
}

impl<S: ScopeSession> TektronixScope<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            setup: None,
            last: None,
        }
    }

    pub fn session(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    pub fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        log::debug!("scope <- {}", command);
        self.session.write(command)
    }

    pub fn ask(&mut self, command: &str) -> Result<String, ScopeError> {
        let response = self.session.query(command)?;
        log::debug!("scope {} -> {}", command, response);
        Ok(response)
    }

    fn ask_parsed<T: std::str::FromStr>(&mut self, command: &str) -> Result<T, ScopeError> {
        let response = self.ask(command)?;
        response
            .trim()
            .parse()
            .map_err(|_| ScopeError::InvalidResponse {
                command: command.to_string(),
                response,
            })
    }

    fn ask_f64(&mut self, command: &str) -> Result<f64, ScopeError> {
        self.ask_parsed(command)
    }

    // Some firmware answers integer queries in float notation.
    fn ask_i64(&mut self, command: &str) -> Result<i64, ScopeError> {
        let value = self.ask_f64(command)?;
        Ok(value as i64)
    }

    pub fn start_acq(&mut self) -> Result<(), ScopeError> {
        self.write("ACQ:STATE RUN")
    }

    pub fn stop_acq(&mut self) -> Result<(), ScopeError> {
        self.write("ACQ:STATE STOP")
    }

    /// Seconds per division.
    pub fn get_horizontal_scale(&mut self) -> Result<f64, ScopeError> {
        self.ask_f64("HORizontal:SCAle?")
    }

    pub fn set_horizontal_scale(&mut self, seconds_per_div: f64) -> Result<(), ScopeError> {
        if !seconds_per_div.is_finite() {
            return Err(ScopeError::Protocol(format!(
                "Horizontal scale should be a number not {}",
                seconds_per_div
            )));
        }
        self.write(&format!("HORizontal:SCAle {}", seconds_per_div))
    }

    /// Number of points in the waveform record.
    pub fn get_horizontal_record_length(&mut self) -> Result<i64, ScopeError> {
        self.ask_i64("horizontal:recordlength?")
    }

    pub fn set_horizontal_record_length(&mut self, length: u64) -> Result<(), ScopeError> {
        self.write(&format!("HORizontal:RECOrdlength {}", length))
    }

    /// The `SET?` dump as a key/value map. Loaded once unless `force_load`.
    pub fn get_setup_dict(
        &mut self,
        force_load: bool,
    ) -> Result<&HashMap<String, String>, ScopeError> {
        if force_load || self.setup.is_none() {
            let dump = self.ask("SET?")?;
            let setup = dump
                .split(';')
                .skip(1)
                .map(|entry| match entry.split_once(' ') {
                    Some((key, value)) => (key.to_string(), value.to_string()),
                    None => (entry.to_string(), String::new()),
                })
                .collect();
            self.setup = Some(setup);
        }
        Ok(self.setup.get_or_insert_with(HashMap::new))
    }

    /// 4 if the setup mentions a fourth channel, otherwise 2.
    pub fn number_of_channels(&mut self) -> Result<u8, ScopeError> {
        let setup = self.get_setup_dict(false)?;
        Ok(if setup.contains_key(":CH4:SCA") { 4 } else { 2 })
    }

    /// Normalize a channel reference to `CHn`.
    pub fn channel_name(&mut self, channel: impl Into<ChannelRef>) -> Result<String, ScopeError> {
        let channel = channel.into();
        let n_max = i64::from(self.number_of_channels()?);

        let number = match &channel {
            ChannelRef::Number(n) => Some(*n),
            ChannelRef::Name(name) => {
                let name = name.trim();
                let digits = match name.get(..2) {
                    Some(prefix) if prefix.eq_ignore_ascii_case("CH") => &name[2..],
                    _ => name,
                };
                digits.parse::<i64>().ok()
            }
        };

        match number {
            Some(n) if (1..=n_max).contains(&n) => Ok(format!("CH{}", n)),
            _ => Err(ScopeError::Protocol(format!(
                "Requested channel {} while channel should be between 1 and {}",
                channel, n_max
            ))),
        }
    }

    pub fn is_channel_selected(&mut self, channel: impl Into<ChannelRef>) -> Result<bool, ScopeError> {
        let channel = self.channel_name(channel)?;
        Ok(self.ask(&format!("SEL:{}?", channel))?.trim() == "1")
    }

    pub fn get_channel_offset(&mut self, channel: impl Into<ChannelRef>) -> Result<f64, ScopeError> {
        let channel = self.channel_name(channel)?;
        self.ask_f64(&format!("{}:OFFS?", channel))
    }

    pub fn get_channel_position(&mut self, channel: impl Into<ChannelRef>) -> Result<f64, ScopeError> {
        let channel = self.channel_name(channel)?;
        self.ask_f64(&format!("{}:POS?", channel))
    }

    /// Volts per division.
    pub fn get_vertical_scale(&mut self, channel: impl Into<ChannelRef>) -> Result<f64, ScopeError> {
        let channel = self.channel_name(channel)?;
        self.ask_f64(&format!("{}:SCA?", channel))
    }

    pub fn set_impedance(
        &mut self,
        channel: impl Into<ChannelRef>,
        impedance: impl Into<Impedance>,
    ) -> Result<(), ScopeError> {
        let token = impedance.into().token()?;
        let channel = self.channel_name(channel)?;
        self.write(&format!("{}:IMPedance {}", channel, token))
    }

    pub fn get_impedance(&mut self, channel: impl Into<ChannelRef>) -> Result<String, ScopeError> {
        let channel = self.channel_name(channel)?;
        self.ask(&format!("{}:IMPedance?", channel))
    }

    /// `AC`, `DC` or `GND`, any case.
    pub fn set_coupling(&mut self, channel: impl Into<ChannelRef>, coupling: &str) -> Result<(), ScopeError> {
        if !COUPLINGS.iter().any(|c| c.eq_ignore_ascii_case(coupling)) {
            return Err(ScopeError::Protocol(format!(
                "Coupling is {}. It should be in {:?}",
                coupling, COUPLINGS
            )));
        }
        let channel = self.channel_name(channel)?;
        self.write(&format!("{}:COUPling {}", channel, coupling))
    }

    pub fn get_coupling(&mut self, channel: impl Into<ChannelRef>) -> Result<String, ScopeError> {
        let channel = self.channel_name(channel)?;
        self.ask(&format!("{}:COUPling?", channel))
    }

    pub fn set_data_source(&mut self, channel: impl Into<ChannelRef>) -> Result<(), ScopeError> {
        let channel = self.channel_name(channel)?;
        self.write(&format!("DAT:SOUR {}", channel))
    }

    /// First record point to transfer; `None` means the first point.
    pub fn set_data_start(&mut self, data_start: Option<i64>) -> Result<(), ScopeError> {
        self.write(&format!("DATA:START {}", data_start.unwrap_or(1)))
    }

    pub fn get_data_start(&mut self) -> Result<i64, ScopeError> {
        self.ask_i64("DATA:START?")
    }

    /// Last record point to transfer; `None` means the whole record.
    pub fn set_data_stop(&mut self, data_stop: Option<i64>) -> Result<(), ScopeError> {
        let data_stop = match data_stop {
            Some(stop) => stop,
            None => self.get_horizontal_record_length()?,
        };
        self.write(&format!("DATA:STOP {}", data_stop))
    }

    pub fn get_data_stop(&mut self) -> Result<i64, ScopeError> {
        self.ask_i64("DATA:STOP?")
    }

    pub fn get_out_waveform_horizontal_sampling_interval(&mut self) -> Result<f64, ScopeError> {
        self.ask_f64("WFMO:XIN?")
    }

    pub fn get_out_waveform_horizontal_zero(&mut self) -> Result<f64, ScopeError> {
        self.ask_f64("WFMO:XZERO?")
    }

    pub fn get_out_waveform_vertical_scale_factor(&mut self) -> Result<f64, ScopeError> {
        self.ask_f64("WFMO:YMUlt?")
    }

    pub fn get_out_waveform_vertical_position(&mut self) -> Result<f64, ScopeError> {
        self.ask_f64("WFMO:YOFf?")
    }

    pub fn read_calibration(&mut self) -> Result<Calibration, ScopeError> {
        Ok(Calibration {
            y_offset: self.get_out_waveform_vertical_position()?,
            y_multiplier: self.get_out_waveform_vertical_scale_factor()?,
            x_zero: self.get_out_waveform_horizontal_zero()?,
            x_increment: self.get_out_waveform_horizontal_sampling_interval()?,
        })
    }

    /// Calibration of the previous transfer, if any.
    pub fn last_calibration(&self) -> Option<Calibration> {
        self.last.map(|l| l.calibration)
    }

    /// Transfer one channel's curve and convert it to volts.
    ///
    /// See [`AcquisitionRequest`] for the window and booster semantics.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn read_data_one_channel(
        &mut self,
        request: &AcquisitionRequest,
    ) -> Result<Waveform, ScopeError> {
        request.validate()?;

        let booster = match self.last {
            Some(last) if request.booster => Some(last),
            _ => None,
        };

        let last = match booster {
            Some(last) => {
                if let Some(channel) = &request.channel {
                    self.set_data_source(channel.clone())?;
                }
                last
            }
            None => self.prepare_transfer(request)?,
        };

        let buffer = self.session.query_raw("CURVE?")?;
        let samples = decode_samples(parse_block(&buffer)?)?;
        log::debug!("CURVE? returned {} samples", samples.len());

        let voltage = samples
            .iter()
            .map(|&r| last.calibration.rescale(r))
            .collect();
        let time = request.with_time_axis.then(|| {
            (last.data_start..=last.data_stop)
                .map(|index| last.calibration.time_of(index))
                .collect()
        });

        self.last = Some(last);
        Ok(Waveform { time, voltage })
    }

    fn prepare_transfer(&mut self, request: &AcquisitionRequest) -> Result<LastAcquisition, ScopeError> {
        let (mut start, mut stop) = (request.data_start, request.data_stop);
        if let (Some(t0), Some(delta_t)) = (request.t0, request.delta_t) {
            let x_zero = self.get_out_waveform_horizontal_zero()?;
            let x_increment = self.get_out_waveform_horizontal_sampling_interval()?;
            start = Some(((t0 - x_zero) / x_increment).floor() as i64 + 1);
            stop = Some(((t0 + delta_t - x_zero) / x_increment).floor() as i64);
        }

        if start.is_some() {
            self.set_data_start(start)?;
        }
        if stop.is_some() {
            self.set_data_stop(stop)?;
        }
        let data_start = self.get_data_start()?;
        let data_stop = self.get_data_stop()?;

        let channel = match &request.channel {
            Some(channel) => {
                let channel = self.channel_name(channel.clone())?;
                self.set_data_source(channel.as_str())?;
                channel
            }
            None => {
                let source = self.ask("DATA:SOURCE?")?;
                self.channel_name(source.trim())?
            }
        };
        if !self.is_channel_selected(channel.as_str())? {
            return Err(ScopeError::Protocol(format!(
                "Tried to read channel {} which is not selected",
                channel
            )));
        }

        self.write("DATA:ENCDG RIB")?;
        self.write("WFMO:BYTE_NR 2")?;
        let calibration = self.read_calibration()?;
        log::debug!(
            "Transfer {} points {}..={} with {:?}",
            channel,
            data_start,
            data_stop,
            calibration
        );

        Ok(LastAcquisition {
            data_start,
            data_stop,
            calibration,
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::{ScopeError, ScopeSession};
    use std::collections::HashMap;

    /// Instrument stand-in. A write `KEY VALUE` makes `KEY?` answer `VALUE`.
    #[derive(Debug, Default)]
    pub struct MockSession {
        pub answers: HashMap<String, String>,
        pub curve: Vec<u8>,
        pub log: Vec<String>,
    }

    impl MockSession {
        pub fn two_channels() -> Self {
            let mut session = Self::default();
            session.answer("SET?", ":HEADER 0;:ACQ:STATE 1;:CH1:SCA 1.0E0;:CH2:SCA 1.0E0");
            session
        }

        pub fn four_channels() -> Self {
            let mut session = Self::default();
            session.answer(
                "SET?",
                ":HEADER 0;:CH1:SCA 1.0E0;:CH2:SCA 1.0E0;:CH3:SCA 1.0E0;:CH4:SCA 5.0E-1",
            );
            session
        }

        pub fn answer(&mut self, query: &str, response: &str) {
            self.answers.insert(query.to_string(), response.to_string());
        }
    }

    impl ScopeSession for MockSession {
        fn write(&mut self, command: &str) -> Result<(), ScopeError> {
            self.log.push(command.to_string());
            if let Some((key, value)) = command.split_once(' ') {
                self.answers.insert(format!("{}?", key), value.to_string());
            }
            Ok(())
        }

        fn query(&mut self, command: &str) -> Result<String, ScopeError> {
            self.log.push(command.to_string());
            self.answers
                .get(command)
                .cloned()
                .ok_or_else(|| ScopeError::InvalidResponse {
                    command: command.to_string(),
                    response: String::new(),
                })
        }

        fn query_raw(&mut self, command: &str) -> Result<Vec<u8>, ScopeError> {
            self.log.push(command.to_string());
            Ok(self.curve.clone())
        }
    }
}
