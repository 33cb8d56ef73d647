//! Entity definitions mapping database rows to domain models.

pub mod zone;

pub use zone::ZoneEntity;
