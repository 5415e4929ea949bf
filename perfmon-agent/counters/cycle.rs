//! The dedicated cycle counter (PMCCNTR), outside the slot pool

use perfmon_raw::current_arch::pmu::{pmcr, CYCLE_COUNTER_BIT};
use perfmon_raw::RegisterBackend;

use crate::pmu::Pmu;

pub struct CycleCounter<'a, B: RegisterBackend> {
    pmu: &'a mut Pmu<B>,
}

impl<'a, B: RegisterBackend> CycleCounter<'a, B> {
    pub(crate) fn new(pmu: &'a mut Pmu<B>) -> Self {
        Self { pmu }
    }

    pub fn enable(&mut self) {
        self.pmu.registers_mut().enable_set(CYCLE_COUNTER_BIT);
    }

    pub fn disable(&mut self) {
        self.pmu.registers_mut().enable_clear(CYCLE_COUNTER_BIT);
    }

    pub fn is_enabled(&self) -> bool {
        self.pmu.registers().read_enabled() & CYCLE_COUNTER_BIT != 0
    }

    /// Select 64-bit overflow and the divide-by-64 clock, then restart the
    /// counter from zero. Leaves the cycle counter and the PMU enabled.
    pub fn configure(&mut self, wide: bool, divide_by_64: bool) {
        let mut set = 0;
        let mut clear = 0;
        if wide {
            set |= pmcr::CYCLE_COUNTER_64_BITS;
        } else {
            clear |= pmcr::CYCLE_COUNTER_64_BITS;
        }
        if divide_by_64 {
            set |= pmcr::CYCLE_COUNT_EVERY_64;
        } else {
            clear |= pmcr::CYCLE_COUNT_EVERY_64;
        }
        self.pmu.control_clear(clear);
        self.pmu.control_set(set);

        self.reset();
        self.enable();
        self.pmu.enable();

        tracing::debug!(
            "Cycle counter configured: 64-bit={}, divide-by-64={}",
            wide,
            divide_by_64
        );
    }

    pub fn reset(&mut self) {
        self.pmu.control_set(pmcr::CYCLE_COUNTER_RESET);
    }

    /// Current cycle count, honouring the configured counter width
    pub fn read(&self) -> u64 {
        let regs = self.pmu.registers();
        if regs.read_control() & pmcr::CYCLE_COUNTER_64_BITS != 0 {
            regs.read_cycle_count_64()
        } else {
            u64::from(regs.read_cycle_count_32())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfmon_raw::FakeBackend;

    #[test]
    fn test_enable_toggles_only_cycle_bit() {
        let mut pmu = Pmu::new(FakeBackend::new(4));
        pmu.registers_mut().enable_set(0b0101);

        pmu.cycles().enable();
        assert!(pmu.cycles().is_enabled());
        assert_eq!(pmu.registers().read_enabled(), 0b0101 | CYCLE_COUNTER_BIT);

        pmu.cycles().disable();
        assert!(!pmu.cycles().is_enabled());
        assert_eq!(pmu.registers().read_enabled(), 0b0101);
    }

    #[test]
    fn test_configure_wide_reads_64_bits() {
        let mut pmu = Pmu::new(FakeBackend::new(4));
        pmu.cycles().configure(true, false);
        assert!(pmu.is_enabled());

        pmu.registers_mut().tick_cycles(u64::from(u32::MAX) + 11);
        assert_eq!(pmu.cycles().read(), u64::from(u32::MAX) + 11);
    }

    #[test]
    fn test_configure_narrow_zero_extends() {
        let mut pmu = Pmu::new(FakeBackend::new(4));
        pmu.cycles().configure(true, false);
        pmu.registers_mut().tick_cycles(u64::from(u32::MAX) + 11);

        pmu.cycles().configure(false, true);
        assert_eq!(pmu.cycles().read(), 0);

        pmu.registers_mut().tick_cycles(6400);
        assert_eq!(pmu.cycles().read(), 100);
        assert!(!pmu.control_flags_set(pmcr::CYCLE_COUNTER_64_BITS));
    }

    #[test]
    fn test_reset() {
        let mut pmu = Pmu::new(FakeBackend::new(4));
        pmu.cycles().configure(false, false);
        pmu.registers_mut().tick_cycles(500);
        assert_eq!(pmu.cycles().read(), 500);

        pmu.cycles().reset();
        assert_eq!(pmu.cycles().read(), 0);
    }
}
