use super::{Daqc2Sdk, PlateError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerType {
    #[default]
    Auto,
    Edge,
}

impl TriggerType {
    pub fn code(&self) -> u8 {
        match self {
            Self::Auto => 0,
            Self::Edge => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerEdge {
    #[default]
    Rising,
    Falling,
}

impl TriggerEdge {
    pub fn code(&self) -> u8 {
        match self {
            Self::Rising => 0,
            Self::Falling => 1,
        }
    }
}

/// Latest sweep of both channels, in volts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Traces {
    pub channel_one: Vec<f64>,
    pub channel_two: Vec<f64>,
}

struct Sweep {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// The DAQC2 two-channel oscilloscope on ADC 0 and 1.
///
/// [`enable`](Self::enable) starts a background thread that keeps fetching
/// traces; [`traces`](Self::traces) returns the latest ones. Settings are
/// pushed to the plate as soon as they change. The plate must not be in
/// function generator mode.
///
/// Sweep rates run from 0 (100 Hz) to 12 (1 MHz, single channel only).
pub struct PlateScope {
    sdk: Arc<dyn Daqc2Sdk>,
    address: u8,
    sweep_rate: u8,
    trigger_source: u8,
    trigger_level: u16,
    trigger_type: TriggerType,
    trigger_edge: TriggerEdge,
    channel_one_active: bool,
    channel_two_active: bool,
    traces: Arc<Mutex<Traces>>,
    sweep: Option<Sweep>,
}

impl PlateScope {
    pub const MAX_SWEEP_RATE: u8 = 12;
    /// Highest trigger level in digitizer counts (exclusive).
    pub const TRIGGER_LEVEL_LIMIT: u16 = 4095;
    const POLL_INTERVAL: Duration = Duration::from_micros(200);

    pub fn new(sdk: Arc<dyn Daqc2Sdk>, address: u8) -> Result<Self, PlateError> {
        if !sdk.verify_addr(address) {
            return Err(PlateError::InvalidAddress(address));
        }
        Ok(Self {
            sdk,
            address,
            sweep_rate: 9,
            trigger_source: 1,
            trigger_level: 0,
            trigger_type: TriggerType::default(),
            trigger_edge: TriggerEdge::default(),
            channel_one_active: false,
            channel_two_active: false,
            traces: Arc::new(Mutex::new(Traces::default())),
            sweep: None,
        })
    }

    pub fn sweep_rate(&self) -> u8 {
        self.sweep_rate
    }

    pub fn set_sweep_rate(&mut self, rate: u8) -> Result<(), PlateError> {
        if rate > Self::MAX_SWEEP_RATE {
            return Err(PlateError::out_of_range("sweep rate", rate));
        }
        if rate == Self::MAX_SWEEP_RATE && self.channel_one_active && self.channel_two_active {
            return Err(PlateError::out_of_range(
                "sweep rate with both channels active",
                rate,
            ));
        }
        self.sweep_rate = rate;
        self.push_sweep_rate();
        Ok(())
    }

    pub fn channel_one_active(&self) -> bool {
        self.channel_one_active
    }

    pub fn set_channel_one_active(&mut self, active: bool) -> Result<(), PlateError> {
        self.check_channels(active, self.channel_two_active)?;
        self.channel_one_active = active;
        self.push_channels();
        Ok(())
    }

    pub fn channel_two_active(&self) -> bool {
        self.channel_two_active
    }

    pub fn set_channel_two_active(&mut self, active: bool) -> Result<(), PlateError> {
        self.check_channels(self.channel_one_active, active)?;
        self.channel_two_active = active;
        self.push_channels();
        Ok(())
    }

    fn check_channels(&self, one: bool, two: bool) -> Result<(), PlateError> {
        if one && two && self.sweep_rate == Self::MAX_SWEEP_RATE {
            return Err(PlateError::out_of_range(
                "channel set for sweep rate",
                self.sweep_rate,
            ));
        }
        Ok(())
    }

    pub fn trigger_source(&self) -> u8 {
        self.trigger_source
    }

    pub fn set_trigger_source(&mut self, channel: u8) -> Result<(), PlateError> {
        if !(1..=2).contains(&channel) {
            return Err(PlateError::out_of_range("trigger source", channel));
        }
        self.trigger_source = channel;
        self.push_trigger();
        Ok(())
    }

    pub fn trigger_level(&self) -> u16 {
        self.trigger_level
    }

    pub fn set_trigger_level(&mut self, level: u16) -> Result<(), PlateError> {
        if level >= Self::TRIGGER_LEVEL_LIMIT {
            return Err(PlateError::out_of_range("trigger level", level));
        }
        self.trigger_level = level;
        self.push_trigger();
        Ok(())
    }

    pub fn trigger_type(&self) -> TriggerType {
        self.trigger_type
    }

    pub fn set_trigger_type(&mut self, trigger_type: TriggerType) {
        self.trigger_type = trigger_type;
        self.push_trigger();
    }

    pub fn trigger_edge(&self) -> TriggerEdge {
        self.trigger_edge
    }

    pub fn set_trigger_edge(&mut self, edge: TriggerEdge) {
        self.trigger_edge = edge;
        self.push_trigger();
    }

    pub fn traces(&self) -> Traces {
        self.traces.lock().clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.sweep.is_some()
    }

    /// Put the plate in oscilloscope mode and start sweeping.
    pub fn enable(&mut self) {
        if self.sweep.is_some() {
            return;
        }
        self.sdk.start_osc(self.address);
        self.push_channels();
        self.push_trigger();
        self.push_sweep_rate();

        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let sdk = Arc::clone(&self.sdk);
            let traces = Arc::clone(&self.traces);
            let stop = Arc::clone(&stop);
            let address = self.address;
            thread::spawn(move || sweep_loop(sdk.as_ref(), address, &traces, &stop))
        };
        log::debug!("Plate oscilloscope at address {} enabled", self.address);
        self.sweep = Some(Sweep { stop, handle });
    }

    /// Stop the sweep thread and leave oscilloscope mode.
    pub fn disable(&mut self) {
        let Some(sweep) = self.sweep.take() else {
            return;
        };
        sweep.stop.store(true, Ordering::SeqCst);
        if sweep.handle.join().is_err() {
            log::warn!("Sweep thread for plate at address {} panicked", self.address);
        }
        self.sdk.stop_osc(self.address);
        log::debug!("Plate oscilloscope at address {} disabled", self.address);
    }

    fn push_trigger(&self) {
        self.sdk.set_osc_trigger(
            self.address,
            self.trigger_source,
            self.trigger_type.code(),
            self.trigger_edge.code(),
            self.trigger_level,
        );
    }

    fn push_channels(&self) {
        self.sdk
            .set_osc_channel(self.address, self.channel_one_active, self.channel_two_active);
    }

    fn push_sweep_rate(&self) {
        self.sdk.set_osc_sweep(self.address, self.sweep_rate);
    }
}

impl Drop for PlateScope {
    fn drop(&mut self) {
        self.disable();
    }
}

fn sweep_loop(sdk: &dyn Daqc2Sdk, address: u8, traces: &Mutex<Traces>, stop: &AtomicBool) {
    sdk.int_enabled(address);
    sdk.run_osc(address);
    while !stop.load(Ordering::SeqCst) {
        if !sdk.data_ready() {
            thread::sleep(PlateScope::POLL_INTERVAL);
            continue;
        }
        sdk.get_int_flags(address);
        let (channel_one, channel_two) = sdk.get_osc_traces(address);
        *traces.lock() = Traces {
            channel_one,
            channel_two,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::mock::MockSdk;
    use std::time::Instant;

    fn scope() -> (Arc<MockSdk>, PlateScope) {
        let sdk = Arc::new(MockSdk::new());
        let scope = PlateScope::new(sdk.clone(), 0).unwrap();
        (sdk, scope)
    }

    #[test]
    fn test_settings_are_pushed() {
        let (sdk, mut scope) = scope();
        scope.set_trigger_source(2).unwrap();
        scope.set_trigger_level(2000).unwrap();
        scope.set_trigger_type(TriggerType::Edge);
        scope.set_trigger_edge(TriggerEdge::Falling);
        scope.set_channel_one_active(true).unwrap();
        scope.set_sweep_rate(3).unwrap();
        assert_eq!(
            sdk.calls(),
            vec![
                "setOSCtrigger(0,2,0,0,0)",
                "setOSCtrigger(0,2,0,0,2000)",
                "setOSCtrigger(0,2,1,0,2000)",
                "setOSCtrigger(0,2,1,1,2000)",
                "setOSCchannel(0,1,0)",
                "setOSCsweep(0,3)"
            ]
        );
    }

    #[test]
    fn test_validation() {
        let (sdk, mut scope) = scope();
        assert!(scope.set_sweep_rate(13).is_err());
        assert!(scope.set_trigger_source(0).is_err());
        assert!(scope.set_trigger_source(3).is_err());
        assert!(scope.set_trigger_level(4095).is_err());
        assert!(scope.set_trigger_level(4094).is_ok());
        assert_eq!(sdk.count("setOSCtrigger"), 1);
    }

    #[test]
    fn test_fastest_sweep_needs_single_channel() {
        let (_, mut scope) = scope();
        scope.set_channel_one_active(true).unwrap();
        scope.set_channel_two_active(true).unwrap();
        assert!(scope.set_sweep_rate(12).is_err());

        scope.set_channel_two_active(false).unwrap();
        scope.set_sweep_rate(12).unwrap();
        assert!(scope.set_channel_two_active(true).is_err());
        assert!(!scope.channel_two_active());
    }

    #[test]
    fn test_enable_sweeps_until_disabled() {
        let (sdk, mut scope) = scope();
        scope.enable();
        assert!(scope.is_enabled());

        let deadline = Instant::now() + Duration::from_secs(5);
        while sdk.count("getOSCtraces") == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        scope.disable();
        assert!(!scope.is_enabled());

        let calls = sdk.calls();
        assert_eq!(
            &calls[..6],
            &[
                "startOSC(0)",
                "setOSCchannel(0,0,0)",
                "setOSCtrigger(0,1,0,0,0)",
                "setOSCsweep(0,9)",
                "intEnabled(0)",
                "runOSC(0)"
            ]
        );
        assert_eq!(calls.last().map(String::as_str), Some("stopOSC(0)"));
        assert_eq!(scope.traces().channel_one, vec![1.0, 2.0, 3.0]);

        // a second disable is a no-op
        scope.disable();
        assert_eq!(sdk.count("stopOSC"), 1);
    }

    #[test]
    fn test_drop_disables() {
        let (sdk, mut scope) = scope();
        sdk.data_ready.store(false, Ordering::SeqCst);
        scope.enable();
        drop(scope);
        assert_eq!(sdk.count("stopOSC"), 1);
        assert_eq!(sdk.count("getOSCtraces"), 0);
    }
}
