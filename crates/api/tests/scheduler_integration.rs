//! End-to-end scheduler behavior against the in-memory repository and a
//! mock weather provider.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use domain::models::geo::BoundingBox;
use domain::models::weather::{MainReading, WeatherSnapshot};
use domain::models::zone::{AutoGroupPayload, Zone, ZonePayload, ZoneType};
use domain::services::partition::partition;
use domain::services::repository::{InMemoryZoneRepository, ZoneRepository};
use domain::services::weather::{MockWeatherProvider, WeatherProvider};

use zone_watch_api::config::SchedulerConfig;
use zone_watch_api::jobs::RefreshScheduler;

const RECT: [f64; 4] = [
    51.43603249210615,
    0.2943841187722374,
    51.49912573429843,
    0.4798380110186385,
];

fn snapshot() -> WeatherSnapshot {
    WeatherSnapshot {
        main: Some(MainReading {
            temp: 6.66,
            temp_min: 4.91,
            temp_max: 7.03,
            pressure: 1007.0,
            humidity: 64.0,
        }),
        ..Default::default()
    }
}

fn due_group(name: &str) -> Zone {
    let bbox = BoundingBox::from_rect(&RECT).unwrap();
    let zones = partition(name, ZoneType::Temperature, &bbox, 4000.0);
    let mut zone = Zone::new(name, ZoneType::AutoGroup, bbox);
    zone.payload = Some(ZonePayload::AutoGroup(AutoGroupPayload {
        sampling_size: 4000,
        refresh_rate: 600,
        next_refresh: Utc::now() - chrono::Duration::seconds(5),
        threshold: BTreeMap::new(),
        sub_zone_type: ZoneType::Temperature,
        zones,
    }));
    zone
}

fn config(wakeup_timeout_secs: u64) -> SchedulerConfig {
    SchedulerConfig {
        wakeup_timeout_secs,
        evaluate_thresholds: false,
        min_sampling_size: 1000,
        min_refresh_rate: 600,
    }
}

async fn stored_group(repo: &InMemoryZoneRepository) -> AutoGroupPayload {
    let zones = repo.list_all().await.unwrap();
    zones[0]
        .payload
        .as_ref()
        .and_then(ZonePayload::as_auto_group)
        .cloned()
        .unwrap()
}

/// Polls until the stored group has been rescheduled into the future, or
/// panics after the deadline.
async fn wait_until_refreshed(repo: &InMemoryZoneRepository) {
    for _ in 0..200 {
        if stored_group(repo).await.next_refresh > Utc::now() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("auto-group zone was not refreshed in time");
}

#[tokio::test]
async fn trigger_starts_a_pass_without_waiting_for_the_ceiling() {
    let repo = Arc::new(InMemoryZoneRepository::new());
    repo.seed(vec![due_group("grid")]).await;
    let weather = Arc::new(MockWeatherProvider::new(snapshot()));

    // Ceiling far beyond the test deadline: only the trigger can start a pass.
    let mut scheduler = RefreshScheduler::new(
        Arc::clone(&repo) as Arc<dyn ZoneRepository>,
        Arc::clone(&weather) as Arc<dyn WeatherProvider>,
        &config(3600),
    );
    let handle = scheduler.refresh_handle();
    scheduler.start();

    handle.trigger();
    wait_until_refreshed(&repo).await;

    let group = stored_group(&repo).await;
    assert_eq!(weather.call_count(), group.zones.len());
    for sub_zone in &group.zones {
        assert_eq!(sub_zone.payload.as_ref().unwrap().field("temp"), Some(6.66));
    }

    scheduler.stop().await;
}

#[tokio::test]
async fn shutdown_during_wait_exits_without_a_pass() {
    let repo = Arc::new(InMemoryZoneRepository::new());
    repo.seed(vec![due_group("grid")]).await;
    let weather = Arc::new(MockWeatherProvider::new(snapshot()));

    let mut scheduler = RefreshScheduler::new(
        Arc::clone(&repo) as Arc<dyn ZoneRepository>,
        Arc::clone(&weather) as Arc<dyn WeatherProvider>,
        &config(3600),
    );
    scheduler.start();

    // Stop while the scheduler sits in its wait phase.
    scheduler.stop().await;

    assert_eq!(weather.call_count(), 0);
    let group = stored_group(&repo).await;
    assert!(group.next_refresh < Utc::now(), "zone must still be due");
}

#[tokio::test]
async fn failed_sub_zones_do_not_block_the_rest_of_the_pass() {
    let repo = Arc::new(InMemoryZoneRepository::new());
    let group = due_group("grid");
    let first_bbox = group
        .payload
        .as_ref()
        .and_then(ZonePayload::as_auto_group)
        .unwrap()
        .zones[0]
        .bbox;
    repo.seed(vec![group]).await;

    let weather = Arc::new(
        MockWeatherProvider::new(snapshot()).failing_when(move |bbox| *bbox == first_bbox),
    );

    let mut scheduler = RefreshScheduler::new(
        Arc::clone(&repo) as Arc<dyn ZoneRepository>,
        Arc::clone(&weather) as Arc<dyn WeatherProvider>,
        &config(3600),
    );
    let handle = scheduler.refresh_handle();
    scheduler.start();

    handle.trigger();
    wait_until_refreshed(&repo).await;
    scheduler.stop().await;

    let stored = stored_group(&repo).await;
    assert!(stored.zones[0].payload.is_none());
    assert!(stored.zones[1..]
        .iter()
        .all(|sub_zone| sub_zone.payload.is_some()));
}
