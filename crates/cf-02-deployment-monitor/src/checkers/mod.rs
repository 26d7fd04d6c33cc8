//! # Checkers
//!
//! One short-lived task per in-flight entry. Each checker publishes exactly
//! one terminal event (`Success`, `Reverted` or `Failed`) and then ends.

mod confirmation;
mod relay;

pub use confirmation::ConfirmationChecker;
pub use relay::RelayTaskChecker;
