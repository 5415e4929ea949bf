//! Virtualized access to the event counters of an ARM Performance Monitors
//! unit: watch, release, reset and read named hardware events, chain counter
//! pairs into 64-bit counters, and save/restore the whole PMU configuration
//! around hand-offs to another consumer.

// Macros (must be first for visibility)
#[macro_use]
pub mod macros;

pub mod common;
pub mod config;
pub mod counters;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod pmu;
pub mod prom;
pub mod session;
pub mod state;

pub use config::{BackendKind, CycleConfig, SessionConfig};
pub use counters::{CycleCounter, EventMonitor, EventSpec, Watch};
pub use error::{ErrorKind, PerfmonError, Result};
pub use orchestrator::{CollectorConfig, MetricCollector};
pub use pmu::Pmu;
pub use prom::PmuMetricExporter;
pub use session::Session;
pub use state::{SavedState, StateManager};
