//! Domain services for the Zone Watch backend.
//!
//! Services contain the geospatial and evaluation logic that operates on
//! zones, plus the abstract collaborator traits the scheduler consumes.

pub mod evaluation;
pub mod filters;
pub mod partition;
pub mod repository;
pub mod weather;

pub use evaluation::evaluate_thresholds;
pub use filters::{expand_auto_groups, filter_by_radius, filter_by_restrictions, zone_within_radius};
pub use partition::partition;
pub use repository::{InMemoryZoneRepository, RepositoryError, ZoneRepository};
pub use weather::{MockWeatherProvider, WeatherError, WeatherProvider};
