//! Domain layer for the Zone Watch backend.
//!
//! This crate contains:
//! - Domain models (zones, payloads, thresholds, weather snapshots)
//! - The geospatial services (grid partitioning, radius/restriction filters,
//!   threshold evaluation)
//! - The abstract collaborator traits consumed by the refresh scheduler
//!   (`ZoneRepository`, `WeatherProvider`) with in-memory/mock implementations

pub mod error;
pub mod models;
pub mod services;

pub use error::DomainError;
