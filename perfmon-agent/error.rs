use std::io;

use perfmon_raw::{EventCode, RawError, SlotIndex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PerfmonError {
    #[error("Event {0} is not implemented by this PMU")]
    EventUnavailable(EventCode),

    #[error("Event {code} is already monitored on slot {slot}")]
    AlreadyMonitored { code: EventCode, slot: SlotIndex },

    #[error("Event {0} is not being monitored")]
    NoSuchWatch(EventCode),

    #[error("No free {} available", counter_kind(.wide))]
    NoFreeSlot { wide: bool },

    #[error("Invalid event code: {0}")]
    InvalidEventCode(String),

    #[error("Required output location not supplied: {0}")]
    NullArgument(&'static str),

    #[error("Control bits 0x{0:08X} are not writable")]
    ReadOnlyControlBits(u32),

    #[error("Register error: {0}")]
    Raw(#[from] RawError),

    #[error("Affinity operation failed: {0}")]
    AffinityError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Nix error: {0}")]
    NixError(#[from] nix::Error),

    #[error("Prometheus error: {0}")]
    PrometheusError(#[from] prometheus::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

fn counter_kind(wide: &bool) -> &'static str {
    if *wide {
        "even-aligned counter pair"
    } else {
        "event counter"
    }
}

/// Broad classes of failure, for callers deciding whether to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Every counter is busy; retry after a `remove`
    ResourceExhaustion,
    /// The hardware cannot count this event
    Unsupported,
    /// The request contradicts the current bindings
    StateConflict,
    InvalidInput,
    /// Failure outside the PMU itself (OS, exporter, I/O)
    Environment,
}

impl PerfmonError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PerfmonError::NoFreeSlot { .. } => ErrorKind::ResourceExhaustion,
            PerfmonError::EventUnavailable(_) => ErrorKind::Unsupported,
            PerfmonError::AlreadyMonitored { .. } | PerfmonError::NoSuchWatch(_) => {
                ErrorKind::StateConflict
            }
            PerfmonError::InvalidEventCode(_)
            | PerfmonError::NullArgument(_)
            | PerfmonError::ReadOnlyControlBits(_)
            | PerfmonError::Raw(_)
            | PerfmonError::ConfigError(_) => ErrorKind::InvalidInput,
            PerfmonError::AffinityError(_)
            | PerfmonError::IoError(_)
            | PerfmonError::NixError(_)
            | PerfmonError::PrometheusError(_)
            | PerfmonError::JsonError(_) => ErrorKind::Environment,
        }
    }
}

pub type Result<T> = std::result::Result<T, PerfmonError>;

#[cfg(test)]
mod tests {
    use super::*;
    use perfmon_raw::current_arch::events::INST_RETIRED;

    #[test]
    fn test_error_display() {
        let err = PerfmonError::NoFreeSlot { wide: true };
        assert_eq!(err.to_string(), "No free even-aligned counter pair available");

        let err = PerfmonError::NoSuchWatch(INST_RETIRED);
        assert!(err.to_string().contains("0x08"));
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            PerfmonError::NoFreeSlot { wide: false }.kind(),
            ErrorKind::ResourceExhaustion
        );
        assert_eq!(
            PerfmonError::EventUnavailable(INST_RETIRED).kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            PerfmonError::NoSuchWatch(INST_RETIRED).kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(
            PerfmonError::NullArgument("value").kind(),
            ErrorKind::InvalidInput
        );
    }
}
