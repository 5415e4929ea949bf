use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::counters::EventSpec;
use crate::error::{PerfmonError, Result};

/// Which register backend drives the PMU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// CP15 coprocessor access on the pinned core
    Hardware,
    /// In-memory register file with the given number of event counters
    Simulated { slots: usize },
}

/// Cycle counter settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CycleConfig {
    pub wide: bool,
    pub divide_by_64: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub core: i32,
    pub events: Vec<EventSpec>,
    pub cycles: Option<CycleConfig>,
    pub user_enable: bool,
    pub interval_ms: u64,
    pub listen: SocketAddr,
    pub backend: BackendKind,
}

impl SessionConfig {
    pub fn new(core: i32, events: Vec<EventSpec>, backend: BackendKind) -> Self {
        Self {
            core,
            events,
            cycles: None,
            user_enable: false,
            interval_ms: 1000,
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            backend,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Reject settings that cannot start a session
    pub fn validate(&self) -> Result<()> {
        if self.core < 0 {
            return Err(PerfmonError::ConfigError(format!(
                "Invalid core: {}",
                self.core
            )));
        }
        if self.interval_ms == 0 {
            return Err(PerfmonError::ConfigError(
                "Sampling interval must be positive".to_string(),
            ));
        }
        if let BackendKind::Simulated { slots } = self.backend {
            if slots > perfmon_raw::current_arch::pmu::MAX_SLOTS {
                return Err(PerfmonError::ConfigError(format!(
                    "A PMU has at most {} event counters, not {slots}",
                    perfmon_raw::current_arch::pmu::MAX_SLOTS
                )));
            }
        }
        for (i, spec) in self.events.iter().enumerate() {
            if self.events[..i].iter().any(|s| s.code == spec.code) {
                return Err(PerfmonError::ConfigError(format!(
                    "Event {spec} listed more than once"
                )));
            }
        }
        Ok(())
    }
}

/// Parse event lists like ["inst_retired,cpu_cycles", "br_pred:wide"]
pub fn parse_event_list(inputs: &[String]) -> Result<Vec<EventSpec>> {
    let mut result = Vec::new();

    for input in inputs {
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            result.push(part.parse::<EventSpec>()?);
        }
    }

    Ok(result)
}
