pub mod cycle;
pub mod events;
pub mod monitor;

pub use cycle::CycleCounter;
pub use events::{event_code, event_name, parse_event, EventSpec};
pub use monitor::{EventMonitor, Watch};
