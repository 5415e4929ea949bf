//! Event Monitor: binds event codes to free counter slots
//!
//! A slot is bound when its enable bit is set; its type register then names
//! the event it counts. A 64-bit watch occupies an even slot `i` holding the
//! event and slot `i + 1` holding `CHAIN`, which counts overflows of slot `i`.
//! The `CHAIN` half is only ever reached through its primary slot.

use perfmon_raw::current_arch::events::CHAIN;
use perfmon_raw::current_arch::pmu::{pmcr, slot_mask, EventType};
use perfmon_raw::{EventCode, EventIdBank, RawError, RegisterBackend, SlotIndex};
use serde::Serialize;

use crate::counters::EventSpec;
use crate::error::{PerfmonError, Result};
use crate::pmu::Pmu;

/// One bound event as seen by [`EventMonitor::watches`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Watch {
    pub code: EventCode,
    pub slot: SlotIndex,
    pub wide: bool,
}

pub struct EventMonitor<'a, B: RegisterBackend> {
    pmu: &'a mut Pmu<B>,
}

impl<'a, B: RegisterBackend> EventMonitor<'a, B> {
    pub(crate) fn new(pmu: &'a mut Pmu<B>) -> Self {
        Self { pmu }
    }

    /// Whether the PMU implements `code`, per PMCEID0/PMCEID1
    ///
    /// Codes above 63 cannot be identified and are reported unavailable.
    pub fn availability(&self, code: EventCode) -> bool {
        let (bank, bit) = match code.value() {
            c @ 0..=31 => (EventIdBank::Low, c),
            c @ 32..=63 => (EventIdBank::High, c - 32),
            _ => return false,
        };
        self.pmu.registers().read_event_id(bank) & (1 << bit) != 0
    }

    /// [`availability`](Self::availability) for an unvalidated number; any
    /// value that is not an event code is simply unavailable
    pub fn is_available(&self, code: i64) -> bool {
        EventCode::try_from(code).is_ok_and(|c| self.availability(c))
    }

    /// Start counting `code` on the lowest free slot, or on the lowest free
    /// even-aligned pair when `wide` is set. Returns the primary slot.
    pub fn add(&mut self, code: EventCode, wide: bool) -> Result<SlotIndex> {
        check_not_chain(code)?;

        if !self.availability(code) {
            return Err(PerfmonError::EventUnavailable(code));
        }
        if let Some(slot) = self.find(code) {
            return Err(PerfmonError::AlreadyMonitored { code, slot });
        }

        let slot = self
            .find_free(wide)
            .ok_or(PerfmonError::NoFreeSlot { wide })?;

        self.bind(slot, code);
        if wide {
            let high = self
                .pmu
                .slot(slot.index() + 1)
                .ok_or(PerfmonError::NoFreeSlot { wide })?;
            self.bind(high, CHAIN);
        }

        tracing::debug!(
            "Watching event {} on slot {}{}",
            code,
            slot,
            if wide { " (chained)" } else { "" }
        );
        Ok(slot)
    }

    /// Stop counting `code`, releasing its chained half too
    ///
    /// Counter values are left in place, so the final count stays readable
    /// through [`read_slot`](Self::read_slot).
    pub fn remove(&mut self, code: EventCode) -> Result<()> {
        let slot = self.locate(code)?;
        let high = self.chained_high(slot);

        let mut mask = slot.bit();
        if let Some(high) = high {
            mask |= high.bit();
        }
        self.pmu.registers_mut().enable_clear(mask);

        tracing::debug!("Released event {} from slot {}", code, slot);
        Ok(())
    }

    /// Zero the count of `code`, high half first. Bindings are unchanged.
    pub fn reset(&mut self, code: EventCode) -> Result<()> {
        let slot = self.locate(code)?;

        if let Some(high) = self.chained_high(slot) {
            self.pmu.registers_mut().write_event_count(high, 0);
        }
        self.pmu.registers_mut().write_event_count(slot, 0);

        tracing::debug!("Reset event {} on slot {}", code, slot);
        Ok(())
    }

    /// Current count of `code`, combining both halves of a chained pair
    pub fn read(&self, code: EventCode) -> Result<(SlotIndex, u64)> {
        let slot = self.locate(code)?;
        let regs = self.pmu.registers();

        let low = u64::from(regs.read_event_count(slot));
        let high = self
            .chained_high(slot)
            .map_or(0, |high| u64::from(regs.read_event_count(high)));

        Ok((slot, low | (high << 32)))
    }

    /// Low 32 bits of the count of `code`, without looking for a chained half
    pub fn read_fast(&self, code: EventCode) -> Result<(SlotIndex, u32)> {
        let slot = self.locate(code)?;
        Ok((slot, self.pmu.registers().read_event_count(slot)))
    }

    /// [`read`](Self::read) into a caller-supplied location
    pub fn read_into(&self, code: EventCode, out: Option<&mut u64>) -> Result<SlotIndex> {
        let slot = self.locate(code)?;
        let out = out.ok_or(PerfmonError::NullArgument("read_into output value"))?;
        let (_, value) = self.read(code)?;
        *out = value;
        Ok(slot)
    }

    /// Read the logical counter rooted at `slot` whether or not it is still
    /// bound. A following slot typed `CHAIN` is taken as the high half.
    pub fn read_slot(&self, slot: SlotIndex) -> Result<u64> {
        let slot = self
            .pmu
            .slot(slot.index())
            .ok_or_else(|| RawError::SlotOutOfRange {
                index: slot.index(),
                max: self.pmu.slot_count(),
            })?;
        let regs = self.pmu.registers();

        let low = u64::from(regs.read_event_count(slot));
        let high = if slot.is_even() {
            self.pmu
                .slot(slot.index() + 1)
                .filter(|&next| self.slot_event(next) == CHAIN)
                .map_or(0, |next| u64::from(regs.read_event_count(next)))
        } else {
            0
        };

        Ok(low | (high << 32))
    }

    /// Every bound event, lowest slot first
    pub fn watches(&self) -> Vec<Watch> {
        let bound = self.bound_mask();
        self.pmu
            .slots()
            .filter(|slot| bound & slot.bit() != 0)
            .filter_map(|slot| {
                let code = self.slot_event(slot);
                if code == CHAIN {
                    return None;
                }
                Some(Watch {
                    code,
                    slot,
                    wide: self.chained_high(slot).is_some(),
                })
            })
            .collect()
    }

    /// Slots that `requests` would take, in order, once every slot is
    /// released. Nothing is written, so a request that [`add`](Self::add)
    /// would refuse is reported while the PMU is still untouched.
    pub fn plan(&self, requests: &[EventSpec]) -> Result<Vec<SlotIndex>> {
        let n = self.pmu.slot_count();
        let mut bound = 0u32;
        let mut planned = Vec::with_capacity(requests.len());

        for (i, request) in requests.iter().enumerate() {
            check_not_chain(request.code)?;
            if !self.availability(request.code) {
                return Err(PerfmonError::EventUnavailable(request.code));
            }
            if let Some(earlier) = requests[..i].iter().position(|r| r.code == request.code) {
                return Err(PerfmonError::AlreadyMonitored {
                    code: request.code,
                    slot: planned[earlier],
                });
            }

            let slot = free_index(bound, n, request.wide)
                .and_then(|i| self.pmu.slot(i))
                .ok_or(PerfmonError::NoFreeSlot { wide: request.wide })?;
            bound |= if request.wide { 0b11 << slot.index() } else { slot.bit() };
            planned.push(slot);
        }

        Ok(planned)
    }

    /// Return the PMU to a quiescent state: every counter disabled and
    /// zeroed, cycle counter included, and the master enable cleared
    pub fn disable_all(&mut self) {
        let regs = self.pmu.registers_mut();
        regs.enable_clear(u32::MAX);

        let control = regs.read_control();
        regs.write_control(
            (control | pmcr::EVENT_COUNTER_RESET | pmcr::CYCLE_COUNTER_RESET) & !pmcr::ENABLE,
        );

        tracing::info!("All PMU counters disabled and reset");
    }

    /// Enable bits of implemented slots
    fn bound_mask(&self) -> u32 {
        self.pmu.registers().read_enabled() & slot_mask(self.pmu.slot_count())
    }

    fn slot_event(&self, slot: SlotIndex) -> EventCode {
        EventCode::from_type_register(self.pmu.registers().read_event_type(slot))
    }

    /// Lowest bound slot counting `code`
    fn find(&self, code: EventCode) -> Option<SlotIndex> {
        let bound = self.bound_mask();
        self.pmu
            .slots()
            .filter(|slot| bound & slot.bit() != 0)
            .find(|&slot| self.slot_event(slot) == code)
    }

    fn locate(&self, code: EventCode) -> Result<SlotIndex> {
        check_not_chain(code)?;
        self.find(code).ok_or(PerfmonError::NoSuchWatch(code))
    }

    /// The bound `CHAIN` slot paired with `slot`, if any
    fn chained_high(&self, slot: SlotIndex) -> Option<SlotIndex> {
        if !slot.is_even() {
            return None;
        }
        let bound = self.bound_mask();
        self.pmu
            .slot(slot.index() + 1)
            .filter(|high| bound & high.bit() != 0)
            .filter(|&high| self.slot_event(high) == CHAIN)
    }

    fn find_free(&self, wide: bool) -> Option<SlotIndex> {
        free_index(self.bound_mask(), self.pmu.slot_count(), wide).and_then(|i| self.pmu.slot(i))
    }

    fn bind(&mut self, slot: SlotIndex, code: EventCode) {
        let regs = self.pmu.registers_mut();
        let previous = regs.read_event_type(slot);
        regs.write_event_type(slot, EventType::new(code).merge_into(previous));
        regs.enable_set(slot.bit());
    }
}

/// Lowest free slot, or lowest free even-aligned pair when `wide`, among
/// the first `n` slots of the enable mask `bound`
fn free_index(bound: u32, n: usize, wide: bool) -> Option<usize> {
    if wide {
        (0..n)
            .step_by(2)
            .filter(|i| i + 1 < n)
            .find(|&i| bound & (0b11 << i) == 0)
    } else {
        (0..n).find(|&i| bound & (1 << i) == 0)
    }
}

fn check_not_chain(code: EventCode) -> Result<()> {
    if code == CHAIN {
        return Err(PerfmonError::InvalidEventCode(format!(
            "{code} (CHAIN is reserved for the high half of a 64-bit counter)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfmon_raw::current_arch::events::{
        BR_PRED, CPU_CYCLES, INST_RETIRED, L1D_CACHE, L1D_CACHE_REFILL, MEM_ACCESS,
    };
    use perfmon_raw::FakeBackend;

    fn pmu(slots: usize) -> Pmu<FakeBackend> {
        let mut pmu = Pmu::new(FakeBackend::new(slots));
        pmu.enable();
        pmu
    }

    fn slot(i: usize) -> SlotIndex {
        SlotIndex::new(i).unwrap()
    }

    fn code(c: u16) -> EventCode {
        EventCode::new(c).unwrap()
    }

    #[test]
    fn test_availability_banks() {
        let mut pmu = Pmu::new(FakeBackend::new(4).with_event_id(1 << 8, 1 << 0));
        let events = pmu.events();

        assert!(events.availability(INST_RETIRED));
        assert!(!events.availability(CPU_CYCLES));
        // bank 1 is indexed with code - 32
        assert!(events.availability(code(32)));
        assert!(!events.availability(code(33)));
        assert!(!events.availability(code(64)));
        assert!(!events.is_available(-1));
        assert!(events.is_available(8));
    }

    #[test]
    fn test_add_then_read_is_zero() {
        let mut pmu = pmu(4);
        let mut events = pmu.events();

        let slot = events.add(INST_RETIRED, false).unwrap();
        assert!(slot.index() < 4);
        assert_eq!(events.read(INST_RETIRED).unwrap(), (slot, 0));
    }

    #[test]
    fn test_add_unavailable_event() {
        let mut pmu = Pmu::new(FakeBackend::new(4).with_supported_events(&[INST_RETIRED]));
        let err = pmu.events().add(BR_PRED, false).unwrap_err();
        assert!(matches!(err, PerfmonError::EventUnavailable(c) if c == BR_PRED));
    }

    #[test]
    fn test_add_twice_is_already_monitored() {
        let mut pmu = pmu(4);
        let mut events = pmu.events();

        events.add(INST_RETIRED, false).unwrap();
        let err = events.add(INST_RETIRED, true).unwrap_err();
        assert!(matches!(
            err,
            PerfmonError::AlreadyMonitored { code, slot } if code == INST_RETIRED && slot.index() == 0
        ));
    }

    #[test]
    fn test_add_remove_add_reuses_slot() {
        let mut pmu = pmu(4);
        let mut events = pmu.events();

        events.add(CPU_CYCLES, false).unwrap();
        let first = events.add(INST_RETIRED, false).unwrap();
        events.remove(INST_RETIRED).unwrap();
        let second = events.add(INST_RETIRED, false).unwrap();

        assert_eq!(first.index(), 1);
        assert_eq!(second, first);
    }

    #[test]
    fn test_chain_is_not_addressable() {
        let mut pmu = pmu(4);
        let mut events = pmu.events();
        events.add(INST_RETIRED, true).unwrap();

        assert!(matches!(
            events.add(CHAIN, false),
            Err(PerfmonError::InvalidEventCode(_))
        ));
        assert!(matches!(
            events.read(CHAIN),
            Err(PerfmonError::InvalidEventCode(_))
        ));
        assert!(matches!(
            events.remove(CHAIN),
            Err(PerfmonError::InvalidEventCode(_))
        ));
    }

    #[test]
    fn test_wide_add_programs_chain() {
        let mut pmu = pmu(4);
        let slot = pmu.events().add(INST_RETIRED, true).unwrap();
        assert_eq!(slot.index(), 0);

        let regs = pmu.registers_mut();
        assert_eq!(EventCode::from_type_register(regs.read_event_type(slot)), INST_RETIRED);
        assert_eq!(EventCode::from_type_register(regs.read_event_type(self::slot(1))), CHAIN);
        assert_eq!(regs.read_enabled() & 0b11, 0b11);

        regs.write_event_count(self::slot(0), 0x89AB_CDEF);
        regs.write_event_count(self::slot(1), 0x0123_4567);
        let low = u64::from(regs.read_event_count(self::slot(0)));
        let high = u64::from(regs.read_event_count(self::slot(1)));

        let (at, value) = pmu.events().read(INST_RETIRED).unwrap();
        assert_eq!(at, slot);
        assert_eq!(value, low | (high << 32));
        assert_eq!(value, 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn test_wide_counter_accumulates_overflow() {
        let mut pmu = pmu(4);
        let slot = pmu.events().add(L1D_CACHE, true).unwrap();

        pmu.registers_mut().count_events(slot, (3u64 << 32) + 17);

        assert_eq!(pmu.events().read(L1D_CACHE).unwrap().1, (3u64 << 32) + 17);
        assert_eq!(pmu.events().read_fast(L1D_CACHE).unwrap(), (slot, 17));
    }

    #[test]
    fn test_fill_every_slot_then_exhaust() {
        let mut pmu = pmu(4);
        let mut events = pmu.events();
        let codes = [INST_RETIRED, CPU_CYCLES, BR_PRED, L1D_CACHE];

        for (i, &c) in codes.iter().enumerate() {
            assert_eq!(events.add(c, false).unwrap().index(), i);
        }
        assert!(matches!(
            events.add(MEM_ACCESS, false),
            Err(PerfmonError::NoFreeSlot { wide: false })
        ));

        events.remove(BR_PRED).unwrap();
        assert_eq!(events.add(MEM_ACCESS, false).unwrap().index(), 2);
    }

    #[test]
    fn test_wide_pair_must_be_even_aligned() {
        let mut pmu = pmu(4);
        let mut events = pmu.events();

        events.add(INST_RETIRED, false).unwrap(); // slot 0
        events.add(CPU_CYCLES, false).unwrap(); // slot 1
        events.add(BR_PRED, false).unwrap(); // slot 2

        events.remove(CPU_CYCLES).unwrap();
        // slots 1 and 3 are free but (1, 2) is not an even pair and (2, 3) is busy
        assert!(matches!(
            events.add(L1D_CACHE, true),
            Err(PerfmonError::NoFreeSlot { wide: true })
        ));
    }

    #[test]
    fn test_wide_pair_needs_upper_slot() {
        let mut pmu = pmu(3);
        let mut events = pmu.events();

        events.add(INST_RETIRED, true).unwrap(); // slots 0 and 1
        assert!(matches!(
            events.add(CPU_CYCLES, true),
            Err(PerfmonError::NoFreeSlot { wide: true })
        ));
        assert_eq!(events.add(CPU_CYCLES, false).unwrap().index(), 2);
    }

    #[test]
    fn test_worked_scenario() {
        let mut pmu = pmu(4);
        let mut events = pmu.events();

        assert_eq!(events.add(INST_RETIRED, false).unwrap().index(), 0);
        assert_eq!(events.add(CPU_CYCLES, false).unwrap().index(), 1);
        events.remove(INST_RETIRED).unwrap();
        assert_eq!(events.add(BR_PRED, true).unwrap().index(), 2);

        let chain = EventCode::from_type_register(pmu.registers().read_event_type(slot(3)));
        assert_eq!(chain, CHAIN);
    }

    #[test]
    fn test_remove_releases_chain_and_keeps_count() {
        let mut pmu = pmu(4);
        let slot = pmu.events().add(INST_RETIRED, true).unwrap();
        pmu.registers_mut().count_events(slot, (1u64 << 32) + 5);

        pmu.events().remove(INST_RETIRED).unwrap();

        assert_eq!(pmu.registers().read_enabled() & 0b11, 0);
        assert!(matches!(
            pmu.events().read(INST_RETIRED),
            Err(PerfmonError::NoSuchWatch(_))
        ));
        assert_eq!(pmu.events().read_slot(slot).unwrap(), (1u64 << 32) + 5);
    }

    #[test]
    fn test_stale_chain_type_is_not_read_as_high_half() {
        let mut pmu = pmu(4);
        let slot = pmu.events().add(INST_RETIRED, true).unwrap();
        pmu.registers_mut().count_events(slot, 1u64 << 32);
        pmu.events().remove(INST_RETIRED).unwrap();

        let again = pmu.events().add(CPU_CYCLES, false).unwrap();
        assert_eq!(again, slot);
        pmu.events().reset(CPU_CYCLES).unwrap();
        assert_eq!(pmu.events().read(CPU_CYCLES).unwrap(), (slot, 0));
    }

    #[test]
    fn test_remove_unknown_event() {
        let mut pmu = pmu(4);
        assert!(matches!(
            pmu.events().remove(INST_RETIRED),
            Err(PerfmonError::NoSuchWatch(c)) if c == INST_RETIRED
        ));
        assert!(matches!(
            pmu.events().reset(INST_RETIRED),
            Err(PerfmonError::NoSuchWatch(_))
        ));
    }

    #[test]
    fn test_reset_zeroes_both_halves() {
        let mut pmu = pmu(4);
        let slot = pmu.events().add(L1D_CACHE_REFILL, true).unwrap();
        pmu.registers_mut().count_events(slot, (2u64 << 32) + 9);

        pmu.events().reset(L1D_CACHE_REFILL).unwrap();

        assert_eq!(pmu.events().read(L1D_CACHE_REFILL).unwrap(), (slot, 0));
        assert_eq!(pmu.registers().read_enabled() & 0b11, 0b11);
    }

    #[test]
    fn test_read_into_requires_output() {
        let mut pmu = pmu(4);
        let slot = pmu.events().add(INST_RETIRED, false).unwrap();
        pmu.registers_mut().count_events(slot, 42);

        let events = pmu.events();
        assert!(matches!(
            events.read_into(INST_RETIRED, None),
            Err(PerfmonError::NullArgument(_))
        ));

        let mut value = 0;
        assert_eq!(events.read_into(INST_RETIRED, Some(&mut value)).unwrap(), slot);
        assert_eq!(value, 42);

        // a missing watch is reported before a missing output
        assert!(matches!(
            events.read_into(BR_PRED, None),
            Err(PerfmonError::NoSuchWatch(_))
        ));
    }

    #[test]
    fn test_watches_lists_primary_slots() {
        let mut pmu = pmu(6);
        let mut events = pmu.events();
        events.add(INST_RETIRED, false).unwrap();
        events.add(BR_PRED, true).unwrap();

        assert_eq!(
            events.watches(),
            vec![
                Watch { code: INST_RETIRED, slot: slot(0), wide: false },
                Watch { code: BR_PRED, slot: slot(2), wide: true },
            ]
        );
    }

    #[test]
    fn test_disable_all() {
        let mut pmu = pmu(4);
        pmu.cycles().enable();
        let slot = pmu.events().add(INST_RETIRED, true).unwrap();
        pmu.registers_mut().count_events(slot, u64::from(u32::MAX) + 3);
        pmu.registers_mut().tick_cycles(1000);

        pmu.events().disable_all();
        pmu.events().disable_all();

        let regs = pmu.registers();
        assert_eq!(regs.read_enabled(), 0);
        for i in 0..4 {
            assert_eq!(regs.read_event_count(self::slot(i)), 0);
        }
        assert_eq!(regs.read_cycle_count_64(), 0);
        assert!(!pmu.is_enabled());
    }

    #[test]
    fn test_wide_add_keeps_reserved_type_bits() {
        let mut pmu = pmu(4);
        pmu.registers_mut().write_event_type(slot(0), 0xC800_0013);
        pmu.registers_mut().write_event_type(slot(1), 0x0800_0004);

        assert_eq!(pmu.events().add(INST_RETIRED, true).unwrap(), slot(0));

        let regs = pmu.registers();
        assert_eq!(regs.read_event_type(slot(0)), 0xC800_0008);
        assert_eq!(regs.read_event_type(slot(1)), 0x0800_001E);
    }

    #[test]
    fn test_plan_matches_add_without_writing() {
        let mut pmu = pmu(4);
        pmu.events().add(L1D_CACHE, false).unwrap();
        let enabled = pmu.registers().read_enabled();

        let requests = [
            EventSpec { code: INST_RETIRED, wide: false },
            EventSpec { code: BR_PRED, wide: true },
            EventSpec { code: CPU_CYCLES, wide: false },
        ];
        let planned = pmu.events().plan(&requests).unwrap();
        assert_eq!(planned, vec![slot(0), slot(2), slot(1)]);
        assert_eq!(pmu.registers().read_enabled(), enabled);

        pmu.events().disable_all();
        let added = requests
            .iter()
            .map(|r| pmu.events().add(r.code, r.wide).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(added, planned);
    }

    #[test]
    fn test_plan_rejects_what_add_would() {
        let mut pmu = Pmu::new(FakeBackend::new(2).with_supported_events(&[INST_RETIRED, BR_PRED]));
        let events = pmu.events();

        let narrow = |code| EventSpec { code, wide: false };
        assert!(matches!(
            events.plan(&[narrow(CPU_CYCLES)]),
            Err(PerfmonError::EventUnavailable(_))
        ));
        assert!(matches!(
            events.plan(&[narrow(CHAIN)]),
            Err(PerfmonError::InvalidEventCode(_))
        ));
        assert!(matches!(
            events.plan(&[narrow(INST_RETIRED), narrow(INST_RETIRED)]),
            Err(PerfmonError::AlreadyMonitored { slot, .. }) if slot.index() == 0
        ));
        assert!(matches!(
            events.plan(&[narrow(INST_RETIRED), EventSpec { code: BR_PRED, wide: true }]),
            Err(PerfmonError::NoFreeSlot { wide: true })
        ));
    }
}
