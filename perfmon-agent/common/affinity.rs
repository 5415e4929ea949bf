use nix::sched::{sched_getaffinity, sched_setaffinity, CpuSet};
use nix::unistd::Pid;

use crate::error::{PerfmonError, Result};

/// Pins the calling thread to one core until dropped
///
/// PMU registers are banked per core, so every access to a [`Pmu`] must
/// happen on the core it was created for.
///
/// [`Pmu`]: crate::pmu::Pmu
pub struct AffinityGuard {
    cpu: usize,
    old_affinity: CpuSet,
}

impl AffinityGuard {
    pub fn new(cpu: i32) -> Result<Self> {
        let cpu = usize::try_from(cpu)
            .map_err(|_| PerfmonError::AffinityError(format!("Invalid CPU ID: {cpu}")))?;

        let old_affinity = sched_getaffinity(Pid::from_raw(0))
            .map_err(|e| PerfmonError::AffinityError(format!("Failed to get affinity: {e}")))?;

        let mut new_affinity = CpuSet::new();
        new_affinity.set(cpu).map_err(|e| {
            PerfmonError::AffinityError(format!("Failed to set CPU {cpu} in set: {e}"))
        })?;

        sched_setaffinity(Pid::from_raw(0), &new_affinity).map_err(|e| {
            PerfmonError::AffinityError(format!("Failed to set affinity to CPU {cpu}: {e}"))
        })?;

        tracing::info!("Pinned to core {}", cpu);

        Ok(Self { cpu, old_affinity })
    }

    pub fn cpu(&self) -> usize {
        self.cpu
    }
}

impl Drop for AffinityGuard {
    fn drop(&mut self) {
        let _ = sched_setaffinity(Pid::from_raw(0), &self.old_affinity);
    }
}
