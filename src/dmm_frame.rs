//! Decoder for the display-mirroring frames sent by the TTi 1604.
//!
//! The meter streams one 10-byte frame per display update:
//!
//! | byte | content |
//! |------|---------|
//! | 0    | 13 when a reading is present |
//! | 1    | measurement type (bits 0-2), AC flag (bit 3), range (bits 4-6) |
//! | 2    | hold, min/max, hertz, null and auto flags |
//! | 3    | minus sign (bit 0) |
//! | 4-8  | seven-segment codes of the five display digits |
//! | 9    | beeper, autorange, buzzer, min/max/hold display, 10 s gate |
//!
//! Decoding never fails. A frame without the presence marker yields `None`
//! from [`parse_data`], and a display that does not read as a number yields
//! [`Reading::Diagnostic`].

use std::fmt;

pub const FRAME_LEN: usize = 10;

/// Value of byte 0 when the frame carries a reading.
pub const DATA_PRESENT: u8 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmmFrame([u8; FRAME_LEN]);

impl DmmFrame {
    pub const fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Take the first [`FRAME_LEN`] bytes of a raw read, or `None` if the
    /// read came up short.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let head = bytes.get(..FRAME_LEN)?;
        let mut frame = [0u8; FRAME_LEN];
        frame.copy_from_slice(head);
        Some(Self(frame))
    }

    pub const fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub const fn has_data(&self) -> bool {
        self.0[0] == DATA_PRESENT
    }

    pub const fn type_code(&self) -> u8 {
        self.0[1] & 0b0000_0111
    }

    pub const fn coupling_code(&self) -> u8 {
        (self.0[1] & 0b0000_1111) >> 3
    }

    pub const fn range_code(&self) -> u8 {
        (self.0[1] & 0b0111_1111) >> 4
    }

    pub const fn is_negative(&self) -> bool {
        bit(self.0[3], 0)
    }
}

const fn bit(byte: u8, n: u8) -> bool {
    byte & (1 << n) != 0
}

/// What the display shows: a number, or something that is not one
/// (`OL`, `FUSE`, a blank display, ...). The text is kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Numeric(f64),
    Diagnostic(String),
}

impl Reading {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            Self::Diagnostic(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{}", v),
            Self::Diagnostic(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementType {
    MilliVolt,
    Volt,
    MilliAmp,
    Amp,
    Ohm,
    Continuity,
    DiodeTest,
}

impl MeasurementType {
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::MilliVolt),
            2 => Some(Self::Volt),
            3 => Some(Self::MilliAmp),
            4 => Some(Self::Amp),
            5 => Some(Self::Ohm),
            6 => Some(Self::Continuity),
            7 => Some(Self::DiodeTest),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MilliVolt => "mV",
            Self::Volt => "V",
            Self::MilliAmp => "mA",
            Self::Amp => "A",
            Self::Ohm => "Ohm",
            Self::Continuity => "Continuity",
            Self::DiodeTest => "Diode Test",
        }
    }
}

/// Range switch position. The same position means different full-scale
/// values depending on the measurement type, so the label lists them all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmmRange {
    Range0,
    Range1,
    Range2,
    Range3,
    Range4,
    Range5,
}

impl DmmRange {
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Range0),
            1 => Some(Self::Range1),
            2 => Some(Self::Range2),
            3 => Some(Self::Range3),
            4 => Some(Self::Range4),
            5 => Some(Self::Range5),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Range0 => "400 Ohm",
            Self::Range1 => "4 kOhm / 4 Vac / 4 Vdc / 4 mAdc / 1 mAac",
            Self::Range2 => "40 kOhm / 40 Vac / 40 Vdc / 10 Adc / 10 Aac",
            Self::Range3 => {
                "400 kOhm / 400 Vac / 400 Vdc / 400 mAdc / 400 mAac / 400 mVdc / 400 mVac"
            }
            Self::Range4 => "4 MOhm / 750 Vac / 1000 Vdc",
            Self::Range5 => "40 MOhm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coupling {
    Dc,
    Ac,
}

impl Coupling {
    pub const fn from_code(code: u8) -> Self {
        if code == 0 {
            Self::Dc
        } else {
            Self::Ac
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dc => "DC",
            Self::Ac => "AC",
        }
    }
}

/// Everything one frame says about the meter.
#[derive(Debug, Clone, PartialEq)]
pub struct DmmState {
    pub measurement: Option<MeasurementType>,
    pub coupling: Coupling,
    pub range: Option<DmmRange>,
    pub hold: bool,
    pub min_max: bool,
    pub hertz: bool,
    pub null: bool,
    pub auto: bool,
    pub negative: bool,
    pub double_beep: bool,
    pub autorange_set: bool,
    pub continuity_buzzer: bool,
    pub display_min: bool,
    pub display_max: bool,
    pub display_hold: bool,
    pub gate_10s: bool,
    /// Display value, already scaled to ohms on the kOhm ranges.
    pub value: Reading,
}

impl DmmState {
    pub fn measurement_label(&self) -> &'static str {
        self.measurement.map_or("unknown", |m| m.as_str())
    }

    pub fn range_label(&self) -> &'static str {
        self.range.map_or("unknown", |r| r.as_str())
    }
}

/// Seven-segment code to display character(s). Odd codes carry the
/// decimal point of the digit. Codes not listed contribute nothing.
// TODO: count dropped codes so a noisy link can be told apart from a blank digit.
const fn segment(code: u8) -> Option<&'static str> {
    let s = match code {
        252 => "0",
        253 => "0.",
        96 => "1",
        97 => "1.",
        218 => "2",
        219 => "2.",
        242 => "3",
        243 => "3.",
        102 => "4",
        103 => "4.",
        182 => "5",
        183 => "5.",
        190 => "6",
        191 => "6.",
        224 => "7",
        225 => "7.",
        254 => "8",
        255 => "8.",
        230 => "9",
        231 => "9.",
        238 => "A",
        156 => "C",
        122 => "D",
        158 => "E",
        142 => "F",
        140 => "R",
        30 => "T",
        124 => "U",
        28 => "L",
        0 | 2 => "",
        _ => return None,
    };
    Some(s)
}

/// Read the number on the display.
pub fn parse_number(frame: &DmmFrame) -> Reading {
    let bytes = frame.as_bytes();
    let mut text = String::with_capacity(8);
    if frame.is_negative() {
        text.push('-');
    }
    for &code in &bytes[4..9] {
        if let Some(s) = segment(code) {
            text.push_str(s);
        }
    }

    match text.parse::<f64>() {
        Ok(v) => Reading::Numeric(v),
        Err(_) => Reading::Diagnostic(text),
    }
}

/// Like [`parse_number`], but resistance readings above the lowest range
/// are converted from kOhm to Ohm.
pub fn parse_number_unit(frame: &DmmFrame) -> Reading {
    let reading = parse_number(frame);
    let is_kilo_ohm = MeasurementType::from_code(frame.type_code()) == Some(MeasurementType::Ohm)
        && frame.range_code() != 0;
    match reading {
        Reading::Numeric(v) if is_kilo_ohm => Reading::Numeric(v * 1000.0),
        other => other,
    }
}

/// Decode every field of the frame, or `None` when the frame holds no data.
pub fn parse_data(frame: &DmmFrame) -> Option<DmmState> {
    if !frame.has_data() {
        return None;
    }
    let b = frame.as_bytes();

    Some(DmmState {
        measurement: MeasurementType::from_code(frame.type_code()),
        coupling: Coupling::from_code(frame.coupling_code()),
        range: DmmRange::from_code(frame.range_code()),
        hold: bit(b[2], 0),
        min_max: bit(b[2], 2),
        hertz: bit(b[2], 4),
        null: bit(b[2], 5),
        auto: bit(b[2], 6),
        negative: frame.is_negative(),
        double_beep: bit(b[9], 0),
        autorange_set: bit(b[9], 2),
        continuity_buzzer: bit(b[9], 3),
        display_min: bit(b[9], 4),
        display_max: bit(b[9], 5),
        display_hold: bit(b[9], 6),
        gate_10s: bit(b[9], 7),
        value: parse_number_unit(frame),
    })
}
