//! Zone entity: the `zones` table row.
//!
//! The payload is stored as a JSONB document whose shape is discriminated by
//! the row's `zone_type`, mirroring how the domain model treats payloads as
//! a tagged union.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::geo::{BoundingBox, GeoPoint};
use domain::models::zone::{Zone, ZonePayload, ZoneType};
use domain::services::repository::RepositoryError;

/// Database representation of a zone.
#[derive(Debug, Clone, FromRow)]
pub struct ZoneEntity {
    pub id: Uuid,
    pub name: String,
    pub zone_type: String,
    pub sw_lat: f64,
    pub sw_lon: f64,
    pub ne_lat: f64,
    pub ne_lon: f64,
    pub active: bool,
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ZoneEntity {
    /// Decodes the row into a domain zone, validating the payload against
    /// the declared type.
    pub fn into_domain(self) -> Result<Zone, RepositoryError> {
        let zone_type = ZoneType::parse(&self.zone_type).ok_or_else(|| {
            RepositoryError::InvalidDocument(format!("unknown zone type {:?}", self.zone_type))
        })?;

        let payload = match self.payload {
            Some(value) => ZonePayload::from_value(zone_type, value)
                .map_err(|e| RepositoryError::InvalidDocument(e.to_string()))?,
            None => None,
        };

        Ok(Zone {
            id: Some(self.id),
            name: self.name,
            zone_type,
            bbox: BoundingBox {
                south_west: GeoPoint::new(self.sw_lat, self.sw_lon),
                north_east: GeoPoint::new(self.ne_lat, self.ne_lon),
            },
            active: self.active,
            payload,
        })
    }
}

/// Serializes a zone payload for the JSONB column.
pub fn payload_to_value(
    payload: &Option<ZonePayload>,
) -> Result<Option<serde_json::Value>, RepositoryError> {
    payload
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| RepositoryError::InvalidDocument(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(zone_type: &str, payload: Option<serde_json::Value>) -> ZoneEntity {
        ZoneEntity {
            id: Uuid::new_v4(),
            name: "zone".to_string(),
            zone_type: zone_type.to_string(),
            sw_lat: 51.43603249210615,
            sw_lon: 0.2943841187722374,
            ne_lat: 51.49912573429843,
            ne_lon: 0.4798380110186385,
            active: true,
            payload,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_decodes_to_domain_zone() {
        let row = entity(
            "temperature",
            Some(json!({"temp": 6.66, "tempMin": 4.91, "tempMax": 7.03, "pressure": 1007, "humidity": 64})),
        );
        let id = row.id;

        let zone = row.into_domain().unwrap();
        assert_eq!(zone.id, Some(id));
        assert_eq!(zone.zone_type, ZoneType::Temperature);
        assert_eq!(zone.payload.as_ref().unwrap().field("temp"), Some(6.66));
        assert_eq!(zone.bbox.south_west.lat, 51.43603249210615);
    }

    #[test]
    fn test_row_without_payload() {
        let zone = entity("wind", None).into_domain().unwrap();
        assert_eq!(zone.zone_type, ZoneType::Wind);
        assert!(zone.payload.is_none());
    }

    #[test]
    fn test_unknown_zone_type_is_invalid_document() {
        let err = entity("fog", None).into_domain().unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidDocument(_)));
    }

    #[test]
    fn test_mismatched_payload_is_invalid_document() {
        let row = entity("wind", Some(json!({"precipitation": 1.0})));
        assert!(matches!(
            row.into_domain(),
            Err(RepositoryError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_auto_group_payload_round_trips_through_value() {
        let payload_value = json!({
            "samplingSize": 4000,
            "refreshRate": 600,
            "nextRefresh": "2025-03-11T19:54:26.260Z",
            "subZoneType": "temperature",
            "zones": []
        });
        let zone = entity("auto_group", Some(payload_value)).into_domain().unwrap();

        let encoded = payload_to_value(&zone.payload).unwrap().unwrap();
        assert_eq!(encoded["samplingSize"], 4000);
        assert_eq!(encoded["subZoneType"], "temperature");
    }
}
