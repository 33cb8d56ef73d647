//! OpenWeather current-weather client.

use async_trait::async_trait;
use std::time::Duration;

use domain::models::geo::BoundingBox;
use domain::models::weather::WeatherSnapshot;
use domain::services::weather::{WeatherError, WeatherProvider};

use crate::config::WeatherConfig;

/// Weather provider backed by the OpenWeather current-weather endpoint.
///
/// A bounding box is sampled at its center point; the provider has no native
/// rectangle query.
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    units: String,
}

impl OpenWeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            units: config.units.clone(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch(&self, bbox: &BoundingBox) -> Result<WeatherSnapshot, WeatherError> {
        if self.api_key.is_empty() {
            return Err(WeatherError::MissingCredentials);
        }

        let center = bbox.center();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", center.lat.to_string()),
                ("lon", center.lon.to_string()),
                ("units", self.units.clone()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status.as_u16()));
        }

        response
            .json::<WeatherSnapshot>()
            .await
            .map_err(|e| WeatherError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: &str) -> OpenWeatherClient {
        OpenWeatherClient::new(&WeatherConfig {
            api_key: api_key.to_string(),
            base_url: format!("{}/data/2.5/weather", server.uri()),
            units: "metric".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn bbox() -> BoundingBox {
        BoundingBox::from_rect(&[51.0, 0.0, 52.0, 1.0]).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_decodes_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("lat", "51.5"))
            .and(query_param("lon", "0.5"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "coord": {"lon": 0.5, "lat": 51.5},
                "main": {
                    "temp": 6.66,
                    "temp_min": 4.91,
                    "temp_max": 7.03,
                    "pressure": 1007,
                    "humidity": 64
                },
                "wind": {"speed": 4.1, "deg": 80},
                "visibility": 10000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, "test-key");
        let snapshot = client.fetch(&bbox()).await.unwrap();

        assert_eq!(snapshot.main.as_ref().unwrap().temp, 6.66);
        assert_eq!(snapshot.wind.as_ref().unwrap().deg, 80.0);
        assert_eq!(snapshot.visibility, Some(10000.0));
        assert!(snapshot.rain.is_none());
    }

    #[tokio::test]
    async fn test_fetch_surfaces_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server, "bad-key");
        let err = client.fetch(&bbox()).await.unwrap_err();
        assert!(matches!(err, WeatherError::Status(401)));
    }

    #[tokio::test]
    async fn test_fetch_without_api_key_fails_fast() {
        let server = MockServer::start().await;
        let client = client_for(&server, "");

        let err = client.fetch(&bbox()).await.unwrap_err();
        assert!(matches!(err, WeatherError::MissingCredentials));
        // No request must have reached the server.
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server, "test-key");
        let err = client.fetch(&bbox()).await.unwrap_err();
        assert!(matches!(err, WeatherError::Decode(_)));
    }
}
