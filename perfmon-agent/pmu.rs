//! The PMU of one core, as a single owned resource
//!
//! Every operation goes through a [`Pmu`] handle that owns the register
//! backend. The Event Monitor, Cycle Counter and State Manager are views that
//! borrow the handle mutably, so the borrow checker enforces the single-owner
//! rule; cross-thread sharing goes through a caller-held lock.

use once_cell::unsync::OnceCell;
use perfmon_raw::current_arch::pmu::{pmcr, Pmcr, USER_ENABLE_BIT};
use perfmon_raw::{RegisterBackend, RegisterLayout, SlotIndex};

use crate::counters::{CycleCounter, EventMonitor};
use crate::error::{PerfmonError, Result};
use crate::state::StateManager;

pub struct Pmu<B: RegisterBackend> {
    regs: B,
    slot_count: OnceCell<usize>,
}

impl<B: RegisterBackend> Pmu<B> {
    pub fn new(regs: B) -> Self {
        Self {
            regs,
            slot_count: OnceCell::new(),
        }
    }

    /// Number of event counters (PMCR.N), read once and then cached
    pub fn slot_count(&self) -> usize {
        *self.slot_count.get_or_init(|| {
            let n = usize::from(Pmcr::from_raw(self.regs.read_control()).slot_count);
            tracing::info!("PMU implements {} event counters", n);
            n
        })
    }

    /// Implemented slots, lowest index first
    pub(crate) fn slots(&self) -> impl Iterator<Item = SlotIndex> {
        (0..self.slot_count()).filter_map(|i| SlotIndex::new(i).ok())
    }

    pub(crate) fn slot(&self, index: usize) -> Option<SlotIndex> {
        if index < self.slot_count() {
            SlotIndex::new(index).ok()
        } else {
            None
        }
    }

    pub fn registers(&self) -> &B {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut B {
        &mut self.regs
    }

    /// Set PMCR bits, keeping the others as they are
    pub(crate) fn control_set(&mut self, bits: u32) {
        let value = self.regs.read_control() | bits;
        self.regs.write_control(value);
    }

    /// Clear PMCR bits, keeping the others as they are
    pub(crate) fn control_clear(&mut self, bits: u32) {
        let value = self.regs.read_control() & !bits;
        self.regs.write_control(value);
    }

    /// Set the master enable bit
    pub fn enable(&mut self) {
        self.control_set(pmcr::ENABLE);
        tracing::debug!("PMU enabled");
    }

    pub fn disable(&mut self) {
        self.control_clear(pmcr::ENABLE);
        tracing::debug!("PMU disabled");
    }

    pub fn is_enabled(&self) -> bool {
        Pmcr::from_raw(self.regs.read_control()).enable
    }

    /// Allow user-mode (PL0) access to the PMU
    pub fn user_enable(&mut self) {
        let value = self.regs.read_user_enable() | USER_ENABLE_BIT;
        self.regs.write_user_enable(value);
        tracing::debug!("PMU user-mode access enabled");
    }

    pub fn user_disable(&mut self) {
        let value = self.regs.read_user_enable() & !USER_ENABLE_BIT;
        self.regs.write_user_enable(value);
        tracing::debug!("PMU user-mode access disabled");
    }

    pub fn is_user_enabled(&self) -> bool {
        self.regs.read_user_enable() & USER_ENABLE_BIT != 0
    }

    /// Set writable PMCR flags, refusing any read-only bit
    pub fn set_control_flags(&mut self, flags: u32) -> Result<()> {
        let flags =
            Pmcr::check_writable(flags).map_err(|_| PerfmonError::ReadOnlyControlBits(flags))?;
        self.control_set(flags);
        Ok(())
    }

    /// Check that every bit in `flags` is currently set in PMCR
    pub fn control_flags_set(&self, flags: u32) -> bool {
        self.regs.read_control() & flags == flags
    }

    /// Zero every event counter at once
    pub fn reset_event_counters(&mut self) {
        self.control_set(pmcr::EVENT_COUNTER_RESET);
    }

    pub fn events(&mut self) -> EventMonitor<'_, B> {
        EventMonitor::new(self)
    }

    pub fn cycles(&mut self) -> CycleCounter<'_, B> {
        CycleCounter::new(self)
    }

    pub fn state(&mut self) -> StateManager<'_, B> {
        StateManager::new(self)
    }
}
