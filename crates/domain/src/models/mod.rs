//! Domain models for the Zone Watch backend.

pub mod geo;
pub mod weather;
pub mod zone;

pub use geo::{BoundingBox, GeoPoint};
pub use weather::WeatherSnapshot;
pub use zone::{
    AutoGroupPayload, Condition, Restriction, Threshold, Zone, ZonePayload, ZoneType,
};
