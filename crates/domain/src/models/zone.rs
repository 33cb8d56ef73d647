//! Zone domain model.
//!
//! A zone is a named geographic rectangle, optionally annotated with a typed
//! weather payload. The payload shape is a tagged union discriminated by
//! [`ZoneType`]: a plain weather zone carries one reading variant, an
//! auto-group zone carries a refresh policy plus a generated grid of
//! sub-zones.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::geo::BoundingBox;
use crate::models::weather::WeatherSnapshot;

/// The kind of weather reading a zone tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Empty,
    Wind,
    Rain,
    Visibility,
    Temperature,
    AutoGroup,
}

impl ZoneType {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Empty => "empty",
            ZoneType::Wind => "wind",
            ZoneType::Rain => "rain",
            ZoneType::Visibility => "visibility",
            ZoneType::Temperature => "temperature",
            ZoneType::AutoGroup => "auto_group",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "empty" => Some(ZoneType::Empty),
            "wind" => Some(ZoneType::Wind),
            "rain" => Some(ZoneType::Rain),
            "visibility" => Some(ZoneType::Visibility),
            "temperature" => Some(ZoneType::Temperature),
            "auto_group" => Some(ZoneType::AutoGroup),
            _ => None,
        }
    }

    /// True for the types whose payload is a single weather reading.
    pub fn is_weather_type(&self) -> bool {
        matches!(
            self,
            ZoneType::Wind | ZoneType::Rain | ZoneType::Visibility | ZoneType::Temperature
        )
    }
}

impl std::fmt::Display for ZoneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator used by thresholds and restrictions.
///
/// An unrecognized operator string is a configuration error: it is rejected
/// at parse time rather than defaulting to a no-op rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
}

impl Condition {
    /// Evaluates `value <op> limit`.
    pub fn holds(self, value: f64, limit: f64) -> bool {
        match self {
            Condition::GreaterThan => value > limit,
            Condition::GreaterOrEqual => value >= limit,
            Condition::LessThan => value < limit,
            Condition::LessOrEqual => value <= limit,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::GreaterThan => ">",
            Condition::GreaterOrEqual => ">=",
            Condition::LessThan => "<",
            Condition::LessOrEqual => "<=",
        }
    }
}

impl FromStr for Condition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Condition::GreaterThan),
            ">=" => Ok(Condition::GreaterOrEqual),
            "<" => Ok(Condition::LessThan),
            "<=" => Ok(Condition::LessOrEqual),
            other => Err(DomainError::UnknownCondition(other.to_string())),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored activation rule: payload field compared to a limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub limit: f64,
    pub condition: Condition,
}

/// A query-time filter rule, same semantics as [`Threshold`] but keyed by
/// field name instead of living in a mapping. Not persisted on the zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restriction {
    /// Name of the payload field compared to the limit.
    pub name: String,
    pub limit: f64,
    pub condition: Condition,
}

/// Wind reading payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindPayload {
    /// Meters per second.
    pub wind_speed: f64,
    /// Degrees.
    pub wind_direction: f64,
}

/// Rain reading payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RainPayload {
    /// Millimeters per hour.
    pub precipitation: f64,
}

/// Visibility reading payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityPayload {
    /// Meters.
    pub distance: f64,
}

/// Temperature reading payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperaturePayload {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: f64,
}

/// Refresh policy and generated sub-zone grid of an auto-group zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoGroupPayload {
    /// Minimum sampling cell size in meters.
    pub sampling_size: u32,
    /// Seconds between scheduler refreshes.
    pub refresh_rate: u32,
    /// Next time the scheduler owes this group a refresh.
    pub next_refresh: DateTime<Utc>,
    /// Activation rules applied to sub-zones after a refresh, keyed by
    /// payload field name. Evaluation order is the map's (stable) order.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub threshold: BTreeMap<String, Threshold>,
    /// Type every generated sub-zone carries. Never `auto_group`.
    pub sub_zone_type: ZoneType,
    /// The generated grid, row-major within each column.
    pub zones: Vec<Zone>,
}

/// Typed zone payload, discriminated by the owning zone's [`ZoneType`].
///
/// Serialization is untagged: the discriminator lives on the zone itself.
/// Deserialization therefore goes through [`ZonePayload::from_value`], which
/// dispatches on the declared type instead of guessing from field names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ZonePayload {
    Wind(WindPayload),
    Rain(RainPayload),
    Visibility(VisibilityPayload),
    Temperature(TemperaturePayload),
    AutoGroup(AutoGroupPayload),
}

impl ZonePayload {
    /// Decodes a raw payload value against the shape declared by
    /// `zone_type`. The `empty` type never carries a payload.
    pub fn from_value(
        zone_type: ZoneType,
        value: serde_json::Value,
    ) -> Result<Option<Self>, DomainError> {
        let invalid = |source| DomainError::InvalidPayload { zone_type, source };
        let payload = match zone_type {
            ZoneType::Empty => return Ok(None),
            ZoneType::Wind => ZonePayload::Wind(serde_json::from_value(value).map_err(invalid)?),
            ZoneType::Rain => ZonePayload::Rain(serde_json::from_value(value).map_err(invalid)?),
            ZoneType::Visibility => {
                ZonePayload::Visibility(serde_json::from_value(value).map_err(invalid)?)
            }
            ZoneType::Temperature => {
                ZonePayload::Temperature(serde_json::from_value(value).map_err(invalid)?)
            }
            ZoneType::AutoGroup => {
                ZonePayload::AutoGroup(serde_json::from_value(value).map_err(invalid)?)
            }
        };
        Ok(Some(payload))
    }

    /// Projects a raw weather snapshot into the payload variant for
    /// `zone_type`.
    ///
    /// Returns `None` when the snapshot lacks the section the type needs, or
    /// when the type is not a weather type (`empty` and `auto_group` are
    /// never projected directly; an auto-group's sub-zones are). A missing
    /// rain section projects to 0 mm/h rather than no payload: the provider
    /// omits it entirely in dry weather.
    pub fn from_snapshot(zone_type: ZoneType, snapshot: &WeatherSnapshot) -> Option<Self> {
        match zone_type {
            ZoneType::Wind => snapshot.wind.as_ref().map(|wind| {
                ZonePayload::Wind(WindPayload {
                    wind_speed: wind.speed,
                    wind_direction: wind.deg,
                })
            }),
            ZoneType::Rain => Some(ZonePayload::Rain(RainPayload {
                precipitation: snapshot
                    .rain
                    .as_ref()
                    .and_then(|rain| rain.one_hour)
                    .unwrap_or(0.0),
            })),
            ZoneType::Visibility => snapshot
                .visibility
                .map(|distance| ZonePayload::Visibility(VisibilityPayload { distance })),
            ZoneType::Temperature => snapshot.main.as_ref().map(|main| {
                ZonePayload::Temperature(TemperaturePayload {
                    temp: main.temp,
                    temp_min: main.temp_min,
                    temp_max: main.temp_max,
                    pressure: main.pressure,
                    humidity: main.humidity,
                })
            }),
            ZoneType::Empty | ZoneType::AutoGroup => None,
        }
    }

    /// Looks up a numeric payload field by its serialized name.
    ///
    /// This is the accessor thresholds and restrictions evaluate against; a
    /// name the variant does not expose yields `None` and the rule is
    /// skipped.
    pub fn field(&self, name: &str) -> Option<f64> {
        match self {
            ZonePayload::Wind(p) => match name {
                "windSpeed" => Some(p.wind_speed),
                "windDirection" => Some(p.wind_direction),
                _ => None,
            },
            ZonePayload::Rain(p) => match name {
                "precipitation" => Some(p.precipitation),
                _ => None,
            },
            ZonePayload::Visibility(p) => match name {
                "distance" => Some(p.distance),
                _ => None,
            },
            ZonePayload::Temperature(p) => match name {
                "temp" => Some(p.temp),
                "tempMin" => Some(p.temp_min),
                "tempMax" => Some(p.temp_max),
                "pressure" => Some(p.pressure),
                "humidity" => Some(p.humidity),
                _ => None,
            },
            ZonePayload::AutoGroup(_) => None,
        }
    }

    /// The auto-group payload, if this is one.
    pub fn as_auto_group(&self) -> Option<&AutoGroupPayload> {
        match self {
            ZonePayload::AutoGroup(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_auto_group_mut(&mut self) -> Option<&mut AutoGroupPayload> {
        match self {
            ZonePayload::AutoGroup(p) => Some(p),
            _ => None,
        }
    }
}

/// A named geographic rectangle with an optional typed weather payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Assigned by the repository on insert, immutable thereafter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    pub zone_type: ZoneType,
    pub bbox: BoundingBox,
    pub active: bool,
    /// Absent until the first weather refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ZonePayload>,
}

/// Wire shape used to deserialize a zone before the payload is decoded
/// against the declared type.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZoneWire {
    #[serde(default)]
    id: Option<Uuid>,
    name: String,
    zone_type: ZoneType,
    bbox: BoundingBox,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

fn default_active() -> bool {
    true
}

impl<'de> Deserialize<'de> for Zone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = ZoneWire::deserialize(deserializer)?;
        let payload = match wire.payload {
            Some(value) => ZonePayload::from_value(wire.zone_type, value)
                .map_err(serde::de::Error::custom)?,
            None => None,
        };
        Ok(Zone {
            id: wire.id,
            name: wire.name,
            zone_type: wire.zone_type,
            bbox: wire.bbox,
            active: wire.active,
            payload,
        })
    }
}

impl Zone {
    /// Creates a zone with no payload, active by default.
    pub fn new(name: impl Into<String>, zone_type: ZoneType, bbox: BoundingBox) -> Self {
        Self {
            id: None,
            name: name.into(),
            zone_type,
            bbox,
            active: true,
            payload: None,
        }
    }

    /// Applies a weather snapshot to this zone via projection.
    ///
    /// `None` (or the `empty` type) clears the payload. A snapshot that
    /// lacks the section this zone's type needs leaves the previous payload
    /// in place.
    pub fn apply_snapshot(&mut self, snapshot: Option<&WeatherSnapshot>) {
        match snapshot {
            None => self.payload = None,
            Some(_) if self.zone_type == ZoneType::Empty => self.payload = None,
            Some(snapshot) => {
                if let Some(payload) = ZonePayload::from_snapshot(self.zone_type, snapshot) {
                    tracing::debug!(zone = %self.name, zone_type = %self.zone_type, "zone payload updated");
                    self.payload = Some(payload);
                }
            }
        }
    }
}

/// Request payload for creating a single zone.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateZoneRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Rectangle as `[swLat, swLon, neLat, neLon]`.
    pub rect: Vec<f64>,

    pub zone_type: ZoneType,
}

/// Request payload for creating an auto-group zone.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AutoGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Rectangle as `[swLat, swLon, neLat, neLon]`.
    pub rect: Vec<f64>,

    /// Minimum sampling cell size in meters.
    pub sampling_size: u32,

    /// Seconds between scheduler refreshes.
    pub refresh_rate: u32,

    pub sub_zone_type: ZoneType,

    /// Optional activation rules evaluated after each refresh.
    #[serde(default)]
    pub threshold: BTreeMap<String, Threshold>,
}

/// Request payload for creating a local-situation group of auto-group zones
/// centered on a point.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LocalSituationRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub lat: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub lon: f64,

    /// Extent of the covered rectangle in meters.
    pub width: f64,
    pub height: f64,

    pub sampling_size: u32,
    pub refresh_rate: u32,

    pub weather_types: Vec<ZoneType>,
}

/// Request payload for a proximity query.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NearZonesRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub lat: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub lon: f64,

    /// Search radius in meters.
    #[validate(custom(function = "shared::validation::validate_radius"))]
    pub radius: f64,

    #[serde(default)]
    pub restrictions: Vec<Restriction>,
}

/// Request payload for editing a zone (partial update).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditZoneRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub zone_type: Option<ZoneType>,
}

/// Response for listing zones.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListZonesResponse {
    pub zones: Vec<Zone>,
    pub total: usize,
}
