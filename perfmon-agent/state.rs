//! Snapshot and restore of the whole PMU configuration
//!
//! Used around any stretch where another consumer takes over the PMU: `save`
//! before handing it over, `restore` once it comes back.

use perfmon_raw::current_arch::pmu::pmcr;
use perfmon_raw::RegisterBackend;
use serde::{Deserialize, Serialize};

use crate::pmu::Pmu;

/// PMU configuration captured by [`StateManager::save`]
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    /// PMCR as read before `save` touched it
    pub control: u32,
    /// Enable bitmask, cycle counter bit included
    pub enabled: u32,
    pub user_enable: u32,
    /// Type register of every implemented slot, reserved bits included
    pub event_types: Vec<u32>,
}

pub struct StateManager<'a, B: RegisterBackend> {
    pmu: &'a mut Pmu<B>,
}

impl<'a, B: RegisterBackend> StateManager<'a, B> {
    pub(crate) fn new(pmu: &'a mut Pmu<B>) -> Self {
        Self { pmu }
    }

    /// Capture the current configuration
    ///
    /// The control register is captured first, then the master enable is set,
    /// so the PMU is left enabled. Callers that need `save` to be read-only
    /// must disable the PMU again themselves.
    pub fn save(&mut self) -> SavedState {
        let control = self.pmu.registers().read_control();
        self.pmu.enable();

        let regs = self.pmu.registers();
        let user_enable = regs.read_user_enable();
        let enabled = regs.read_enabled();
        let event_types = self
            .pmu
            .slots()
            .map(|slot| regs.read_event_type(slot))
            .collect::<Vec<_>>();

        tracing::debug!(
            "Saved PMU state: control=0x{:08x} enabled=0x{:08x} user=0x{:x} ({} slots)",
            control,
            enabled,
            user_enable,
            event_types.len()
        );

        SavedState {
            control,
            enabled,
            user_enable,
            event_types,
        }
    }

    /// [`save`](Self::save), then zero every counter. The returned state is
    /// the one captured before the reset.
    pub fn save_and_reset(&mut self) -> SavedState {
        let state = self.save();
        self.reset_counters();
        state
    }

    /// Reapply a saved configuration
    ///
    /// The control register is written last, so the master enable ends up
    /// exactly as captured. Counter values are not part of the snapshot.
    pub fn restore(&mut self, state: SavedState) {
        let slots = self.pmu.slots().collect::<Vec<_>>();
        if slots.len() != state.event_types.len() {
            tracing::warn!(
                "Saved state covers {} slots but the PMU implements {}",
                state.event_types.len(),
                slots.len()
            );
        }

        let regs = self.pmu.registers_mut();
        for (slot, &event_type) in slots.iter().zip(&state.event_types) {
            regs.write_event_type(*slot, event_type);
        }

        regs.enable_set(state.enabled);
        regs.enable_clear(!state.enabled);
        regs.write_user_enable(state.user_enable);
        regs.write_control(state.control);

        tracing::debug!("Restored PMU state: control=0x{:08x}", state.control);
    }

    /// [`restore`](Self::restore), then zero every counter
    pub fn restore_and_reset(&mut self, state: SavedState) {
        self.restore(state);
        self.reset_counters();
    }

    fn reset_counters(&mut self) {
        self.pmu
            .control_set(pmcr::EVENT_COUNTER_RESET | pmcr::CYCLE_COUNTER_RESET);
    }
}
