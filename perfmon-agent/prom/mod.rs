pub mod pmu;

pub use pmu::PmuMetricExporter;
