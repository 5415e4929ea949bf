pub mod pmu;

pub use pmu::PmuMetric;
