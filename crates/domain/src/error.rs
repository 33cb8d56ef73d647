//! Domain error types.

use thiserror::Error;

use crate::models::zone::ZoneType;

/// Errors produced by domain model construction and evaluation.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A threshold or restriction named a comparison operator outside the
    /// supported set. This is a configuration error and must not be
    /// silently treated as a no-op rule.
    #[error("unknown condition operator: {0:?} (expected one of >, >=, <, <=)")]
    UnknownCondition(String),

    /// A stored payload did not match the shape declared by the zone type.
    #[error("invalid payload for zone type {zone_type}: {source}")]
    InvalidPayload {
        zone_type: ZoneType,
        #[source]
        source: serde_json::Error,
    },

    /// A bounding rectangle whose corners are not ordered south-west /
    /// north-east.
    #[error("invalid bounding box: south-west corner must not exceed north-east corner")]
    InvalidBoundingBox,

    /// A rectangle was supplied with the wrong number of coordinates.
    #[error("expected 4 rectangle coordinates [swLat, swLon, neLat, neLon], got {0}")]
    InvalidRect(usize),
}
