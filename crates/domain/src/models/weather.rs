//! Raw weather snapshot as reported by the weather provider.
//!
//! The shape mirrors the OpenWeather current-weather response. Every section
//! is optional: the provider omits `rain` entirely when no precipitation was
//! observed, and `visibility` is not reported at every station. Projection
//! into typed zone payloads happens in [`crate::models::zone`].

use serde::{Deserialize, Serialize};

/// A weather observation for a single point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<WindReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain: Option<RainReading>,
    /// Visibility in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<MainReading>,
}

/// Wind section of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindReading {
    /// Wind speed in meters per second.
    pub speed: f64,
    /// Wind direction in degrees.
    pub deg: f64,
}

/// Rain section of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RainReading {
    /// Precipitation over the last hour, mm.
    #[serde(rename = "1h", default, skip_serializing_if = "Option::is_none")]
    pub one_hour: Option<f64>,
}

/// Temperature, pressure and humidity section of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainReading {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: f64,
}
