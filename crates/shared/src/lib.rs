//! Shared utilities for the Zone Watch backend.

pub mod validation;
