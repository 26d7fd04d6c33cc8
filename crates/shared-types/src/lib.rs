//! # Shared Types Crate
//!
//! Domain entities shared by every component of the deployment monitor.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: keys, statuses and failures are defined once
//!   here and reused by the bus, the store and the monitor.
//! - **Normalised Identity**: addresses and hashes are parsed into fixed-size
//!   byte arrays, so casing never leaks into comparisons or storage keys.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
