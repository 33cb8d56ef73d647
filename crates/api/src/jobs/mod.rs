//! Background jobs.

pub mod refresh;

pub use refresh::{RefreshHandle, RefreshScheduler};
