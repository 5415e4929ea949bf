//! Architecture-specific register definitions
//!
//! Each ARM core implements a different number of event counters and a
//! different subset of the common architectural events. This module provides
//! core-specific definitions organized by CPU.
//!
//! ## Supported Cores
//!
//! - **Cortex-A53** (`cortex-a53` feature) - ARMv8-A, running in AArch32 state

pub mod cortex_a53;

// Cortex-A7 and Cortex-A72 are not yet implemented
// #[cfg(feature = "cortex-a7")]
// pub mod cortex_a7;
