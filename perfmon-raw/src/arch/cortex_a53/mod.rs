//! ARM Cortex-A53 Performance Monitors register definitions
//!
//! The Cortex-A53 implements the PMUv3 extension with six event counters and
//! a dedicated cycle counter. From AArch32 state every register is reached
//! through CP15.
//!
//! ## Registers
//!
//! - **PMCR** - control, including the implemented counter count
//! - **PMCNTENSET / PMCNTENCLR** - counter enable bitmask
//! - **PMEVTYPER<n> / PMEVCNTR<n>** - per-slot event type and count
//! - **PMCCNTR** - cycle counter
//! - **PMUSERENR** - user-mode access enable
//! - **PMCEID0 / PMCEID1** - common event identification
//!
//! ## References
//!
//! - ARM Cortex-A53 MPCore Processor Technical Reference Manual, Chapter 12
//! - ARM Architecture Reference Manual ARMv8, section G4 (AArch32 PMU)

pub mod events;
pub mod pmu;

/// Number of event counters implemented by the Cortex-A53
pub const CORTEX_A53_SLOTS: usize = 6;
