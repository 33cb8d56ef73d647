//! Repository implementations for database operations.

pub mod zone;

pub use zone::PgZoneRepository;
