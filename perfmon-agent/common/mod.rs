pub mod affinity;

pub use affinity::AffinityGuard;
