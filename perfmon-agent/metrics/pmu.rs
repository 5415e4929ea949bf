// PMU metrics exported per core
use crate::metric_enum;

metric_enum! {
    pub enum PmuMetric {
        EventCount => "perfmon_event_count",
        CycleCount => "perfmon_cycle_count",
        SlotsInUse => "perfmon_slots_in_use",
        SlotCount => "perfmon_slot_count",
    }
}

impl PmuMetric {
    pub fn help(&self) -> &'static str {
        match self {
            PmuMetric::EventCount => "Events counted since the watch was added",
            PmuMetric::CycleCount => "Cycle counter value",
            PmuMetric::SlotsInUse => "Event counters currently bound",
            PmuMetric::SlotCount => "Event counters implemented by the PMU",
        }
    }
}
