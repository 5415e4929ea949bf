//! # perfmon-raw
//!
//! Register definitions and access backends for the ARM Performance
//! Monitors extension, as seen from AArch32 state.
//!
//! This crate provides type-safe layouts for the PMU system registers,
//! the architectural event codes, and the [`RegisterBackend`] contract that
//! higher layers drive. Two backends are provided:
//!
//! - `Cp15Backend` issues real coprocessor instructions and is only compiled
//!   for `target_arch = "arm"`.
//! - [`FakeBackend`] keeps the whole register file in memory and can simulate
//!   counting, for tests and for running the agent off-target.
//!
//! ## Features
//!
//! Select the target core via feature flags:
//! - `cortex-a53` (default) - Cortex-A53 (Raspberry Pi 3) register definitions
//!
//! ## Usage
//!
//! ```
//! use perfmon_raw::current_arch::events;
//! use perfmon_raw::current_arch::pmu::{EventType, Pmcr};
//! use perfmon_raw::{FakeBackend, RegisterBackend, RegisterLayout, SlotIndex};
//!
//! let mut regs = FakeBackend::new(6);
//! let pmcr = Pmcr::from_raw(regs.read_control());
//! assert_eq!(pmcr.slot_count, 6);
//!
//! let slot = SlotIndex::new(0).unwrap();
//! let ty = EventType::new(events::INST_RETIRED);
//! regs.write_event_type(slot, ty.merge_into(regs.read_event_type(slot)));
//! ```

pub mod arch;
pub mod backend;
#[cfg(target_arch = "arm")]
pub mod cp15;
pub mod fake;
pub mod register;
pub mod types;

// Re-export for convenience
pub use backend::{EventIdBank, RegisterBackend};
#[cfg(target_arch = "arm")]
pub use cp15::Cp15Backend;
pub use fake::FakeBackend;
pub use register::RegisterLayout;
pub use types::{EventCode, RawError, Result, SlotIndex};

// Export current architecture based on feature flag
#[cfg(feature = "cortex-a53")]
pub use arch::cortex_a53 as current_arch;
