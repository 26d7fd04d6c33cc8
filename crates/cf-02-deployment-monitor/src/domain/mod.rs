//! # Domain Layer
//!
//! Pure decision logic shared by the checkers: backoff schedule, outcome
//! classification and the chain/relay views returned by the outbound ports.

mod backoff;
mod entities;
mod outcome;

pub use backoff::BackoffSchedule;
pub use entities::{
    NodeTransaction, RelayTaskStatus, ReplacementReason, TransactionReceipt, WatchTarget,
};
pub use outcome::CheckOutcome;
