//! Abstract weather provider consumed by the scheduler and request handlers.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::geo::BoundingBox;
use crate::models::weather::WeatherSnapshot;

/// Errors surfaced by a weather provider.
///
/// All variants are recoverable for a single sub-zone refresh: the scheduler
/// logs them and moves on, leaving the sub-zone's previous payload in place.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather provider credentials are not configured")]
    MissingCredentials,

    #[error("weather request failed: {0}")]
    Request(String),

    #[error("weather provider returned status {0}")]
    Status(u16),

    #[error("could not decode weather response: {0}")]
    Decode(String),
}

/// Source of weather snapshots for a bounding box.
///
/// Implementations sample the box at its center point.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, bbox: &BoundingBox) -> Result<WeatherSnapshot, WeatherError>;
}

/// Mock weather provider for tests.
///
/// Returns a fixed snapshot, optionally failing for bounding boxes matching
/// a predicate, and counts fetches.
#[derive(Default)]
pub struct MockWeatherProvider {
    snapshot: WeatherSnapshot,
    fail_when: Option<Box<dyn Fn(&BoundingBox) -> bool + Send + Sync>>,
    calls: AtomicUsize,
}

impl MockWeatherProvider {
    /// Mock that always answers with `snapshot`.
    pub fn new(snapshot: WeatherSnapshot) -> Self {
        Self {
            snapshot,
            fail_when: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Mock that fails every fetch.
    pub fn failing() -> Self {
        Self::new(WeatherSnapshot::default()).failing_when(|_| true)
    }

    /// Fails fetches whose bounding box matches the predicate.
    pub fn failing_when(
        mut self,
        predicate: impl Fn(&BoundingBox) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    /// Number of fetches observed so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for MockWeatherProvider {
    async fn fetch(&self, bbox: &BoundingBox) -> Result<WeatherSnapshot, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fail_when) = &self.fail_when {
            if fail_when(bbox) {
                tracing::warn!("mock weather provider simulating failure");
                return Err(WeatherError::Request("simulated failure".to_string()));
            }
        }
        Ok(self.snapshot.clone())
    }
}
