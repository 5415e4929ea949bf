//! Common architectural event numbers counted by the Cortex-A53
//!
//! See ARM DDI 0500J, section 12.9 for the full list.

use crate::types::EventCode;

pub const SW_INCR: EventCode = EventCode(0x00);
pub const L1I_CACHE_REFILL: EventCode = EventCode(0x01);
pub const L1I_TLB_REFILL: EventCode = EventCode(0x02);
pub const L1D_CACHE_REFILL: EventCode = EventCode(0x03);
pub const L1D_CACHE: EventCode = EventCode(0x04);
pub const L1D_TLB_REFILL: EventCode = EventCode(0x05);
pub const LD_RETIRED: EventCode = EventCode(0x06);
pub const ST_RETIRED: EventCode = EventCode(0x07);
pub const INST_RETIRED: EventCode = EventCode(0x08);
pub const EXC_TAKEN: EventCode = EventCode(0x09);
pub const EXC_RETURN: EventCode = EventCode(0x0A);
pub const CID_WRITE_RETIRED: EventCode = EventCode(0x0B);
pub const PC_WRITE_RETIRED: EventCode = EventCode(0x0C);
pub const BR_IMMED_RETIRED: EventCode = EventCode(0x0D);
pub const BR_RETURN_RETIRED: EventCode = EventCode(0x0E);
pub const UNALIGNED_LDST_RETIRED: EventCode = EventCode(0x0F);
pub const BR_MIS_PRED: EventCode = EventCode(0x10);
pub const CPU_CYCLES: EventCode = EventCode(0x11);
pub const BR_PRED: EventCode = EventCode(0x12);
pub const MEM_ACCESS: EventCode = EventCode(0x13);
pub const L1I_CACHE: EventCode = EventCode(0x14);
pub const L1D_CACHE_WB: EventCode = EventCode(0x15);
pub const L2D_CACHE: EventCode = EventCode(0x16);
pub const L2D_CACHE_REFILL: EventCode = EventCode(0x17);
pub const L2D_CACHE_WB: EventCode = EventCode(0x18);
pub const BUS_ACCESS: EventCode = EventCode(0x19);
pub const MEMORY_ERROR: EventCode = EventCode(0x1A);
pub const BUS_CYCLES: EventCode = EventCode(0x1D);

/// Counts overflows of the preceding even-numbered counter. Only valid on an
/// odd-numbered counter; used to build 64-bit counters from a pair.
pub const CHAIN: EventCode = EventCode(0x1E);

/// Event names accepted on the command line
pub const NAMED_EVENTS: &[(&str, EventCode)] = &[
    ("SW_INCR", SW_INCR),
    ("L1I_CACHE_REFILL", L1I_CACHE_REFILL),
    ("L1I_TLB_REFILL", L1I_TLB_REFILL),
    ("L1D_CACHE_REFILL", L1D_CACHE_REFILL),
    ("L1D_CACHE", L1D_CACHE),
    ("L1D_TLB_REFILL", L1D_TLB_REFILL),
    ("LD_RETIRED", LD_RETIRED),
    ("ST_RETIRED", ST_RETIRED),
    ("INST_RETIRED", INST_RETIRED),
    ("EXC_TAKEN", EXC_TAKEN),
    ("EXC_RETURN", EXC_RETURN),
    ("CID_WRITE_RETIRED", CID_WRITE_RETIRED),
    ("PC_WRITE_RETIRED", PC_WRITE_RETIRED),
    ("BR_IMMED_RETIRED", BR_IMMED_RETIRED),
    ("BR_RETURN_RETIRED", BR_RETURN_RETIRED),
    ("UNALIGNED_LDST_RETIRED", UNALIGNED_LDST_RETIRED),
    ("BR_MIS_PRED", BR_MIS_PRED),
    ("CPU_CYCLES", CPU_CYCLES),
    ("BR_PRED", BR_PRED),
    ("MEM_ACCESS", MEM_ACCESS),
    ("L1I_CACHE", L1I_CACHE),
    ("L1D_CACHE_WB", L1D_CACHE_WB),
    ("L2D_CACHE", L2D_CACHE),
    ("L2D_CACHE_REFILL", L2D_CACHE_REFILL),
    ("L2D_CACHE_WB", L2D_CACHE_WB),
    ("BUS_ACCESS", BUS_ACCESS),
    ("MEMORY_ERROR", MEMORY_ERROR),
    ("BUS_CYCLES", BUS_CYCLES),
    ("CHAIN", CHAIN),
];

/// Look up an event by name, ignoring case
pub fn lookup(name: &str) -> Option<EventCode> {
    NAMED_EVENTS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, code)| code)
}

/// Name of a known event code
pub fn name_of(code: EventCode) -> Option<&'static str> {
    NAMED_EVENTS
        .iter()
        .find(|&&(_, c)| c == code)
        .map(|&(n, _)| n)
}
