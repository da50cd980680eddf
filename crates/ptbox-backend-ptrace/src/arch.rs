//! Per-architecture register backends.
//!
//! Backends are compiled on every host so they can be exercised against stub
//! transfers, but only the one matching the tracee can talk to a real kernel.

pub mod aarch64;

pub use aarch64::{Arm64Capabilities, Arm64Debugger};
