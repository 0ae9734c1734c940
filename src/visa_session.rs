//! VISA-backed [`ScopeSession`], available with the `visa` feature.
//!
//! Resource strings look like `USB0::0x0699::0x0401::C000000::INSTR` or
//! `TCPIP0::192.168.1.100::INSTR`.

use crate::scope::{read_block, ScopeError, ScopeSession, TektronixScope};
use std::ffi::CString;
use std::io::{BufRead, BufReader, Write};
use visa_rs::prelude::*;

pub struct VisaSession {
    // Declared before the resource manager so the session closes first.
    instrument: Instrument,
    _rm: DefaultRM,
    address: String,
}

impl VisaSession {
    pub fn open(address: &str) -> Result<Self, ScopeError> {
        log::info!("Opening VISA resource {}", address);
        let rm = DefaultRM::new()?;
        let c_string = CString::new(address)
            .map_err(|e| ScopeError::Construction(format!("invalid resource string: {}", e)))?;
        let visa_string = visa_rs::VisaString::from(c_string);
        let instrument = rm.open(&visa_string, AccessMode::NO_LOCK, TIMEOUT_IMMEDIATE)?;
        Ok(Self {
            instrument,
            _rm: rm,
            address: address.to_string(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn send(&mut self, command: &str) -> Result<(), ScopeError> {
        let mut line = command.to_string();
        line.push('\n');
        (&self.instrument).write_all(line.as_bytes())?;
        Ok(())
    }
}

impl ScopeSession for VisaSession {
    fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        self.send(command)
    }

    fn query(&mut self, command: &str) -> Result<String, ScopeError> {
        self.send(command)?;
        let mut response = String::new();
        BufReader::new(&self.instrument).read_line(&mut response)?;
        Ok(response.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Reads one IEEE 488.2 block reply and returns it including its header.
    fn query_raw(&mut self, command: &str) -> Result<Vec<u8>, ScopeError> {
        self.send(command)?;
        let mut reader = &self.instrument;
        read_block(&mut reader)
    }
}

impl TektronixScope<VisaSession> {
    /// Open the instrument at a VISA resource address.
    pub fn open(address: &str) -> Result<Self, ScopeError> {
        Ok(Self::new(VisaSession::open(address)?))
    }
}
