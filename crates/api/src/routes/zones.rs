//! Zone CRUD and query endpoint handlers.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use domain::models::geo::{
    meters_to_lat_degrees, meters_to_lon_degrees, BoundingBox, GeoPoint,
};
use domain::models::zone::{
    AutoGroupPayload, AutoGroupRequest, CreateZoneRequest, EditZoneRequest, ListZonesResponse,
    LocalSituationRequest, NearZonesRequest, Threshold, Zone, ZonePayload, ZoneType,
};
use domain::services::filters::{expand_auto_groups, filter_by_radius, filter_by_restrictions};
use domain::services::partition::partition;

use crate::app::AppState;
use crate::error::ApiError;
use crate::jobs::refresh::refresh_auto_group;

/// Creates a single zone. Weather types get an initial snapshot; a provider
/// failure is logged and the zone starts without a payload.
pub async fn create_zone(
    State(state): State<AppState>,
    Json(request): Json<CreateZoneRequest>,
) -> Result<(StatusCode, Json<Zone>), ApiError> {
    request.validate()?;
    if request.zone_type == ZoneType::AutoGroup {
        return Err(ApiError::Validation(
            "auto-group zones are created via /zones/auto-group".into(),
        ));
    }

    let bbox = BoundingBox::from_rect(&request.rect)?;
    let mut zone = Zone::new(request.name, request.zone_type, bbox);

    if zone.zone_type.is_weather_type() {
        match state.weather.fetch(&zone.bbox).await {
            Ok(snapshot) => zone.apply_snapshot(Some(&snapshot)),
            Err(e) => warn!(zone = %zone.name, error = %e, "initial weather fetch failed"),
        }
    }

    let zone = state.zones.insert(zone).await?;
    Ok((StatusCode::CREATED, Json(zone)))
}

/// Creates an auto-group zone: partitions the rectangle into sub-zones and
/// triggers the scheduler so the first refresh does not wait for the timer.
pub async fn create_auto_group(
    State(state): State<AppState>,
    Json(request): Json<AutoGroupRequest>,
) -> Result<(StatusCode, Json<Zone>), ApiError> {
    request.validate()?;
    check_sampling_params(&state, request.sampling_size, request.refresh_rate)?;
    check_sub_zone_type(request.sub_zone_type)?;

    let bbox = BoundingBox::from_rect(&request.rect)?;
    let zone = build_auto_group(
        request.name,
        bbox,
        request.sampling_size,
        request.refresh_rate,
        request.sub_zone_type,
        request.threshold,
    );

    let zone = state.zones.insert(zone).await?;
    state.refresh.trigger();
    Ok((StatusCode::CREATED, Json(zone)))
}

/// Creates one auto-group zone per requested weather type, all covering the
/// same rectangle centered on the given point.
pub async fn create_local_situation(
    State(state): State<AppState>,
    Json(request): Json<LocalSituationRequest>,
) -> Result<(StatusCode, Json<ListZonesResponse>), ApiError> {
    request.validate()?;
    check_sampling_params(&state, request.sampling_size, request.refresh_rate)?;
    if request.weather_types.is_empty() {
        return Err(ApiError::Validation("weatherTypes must not be empty".into()));
    }
    for zone_type in &request.weather_types {
        check_sub_zone_type(*zone_type)?;
    }

    let half_height = meters_to_lat_degrees(request.height / 2.0);
    let half_width = meters_to_lon_degrees(request.width / 2.0, request.lat);
    let bbox = BoundingBox::new(
        GeoPoint::new(request.lat - half_height, request.lon - half_width),
        GeoPoint::new(request.lat + half_height, request.lon + half_width),
    )?;

    let mut zones = Vec::with_capacity(request.weather_types.len());
    for zone_type in &request.weather_types {
        let zone = build_auto_group(
            format!("local-situation-{zone_type}"),
            bbox,
            request.sampling_size,
            request.refresh_rate,
            *zone_type,
            BTreeMap::new(),
        );
        zones.push(state.zones.insert(zone).await?);
    }

    state.refresh.trigger();
    let total = zones.len();
    Ok((StatusCode::CREATED, Json(ListZonesResponse { zones, total })))
}

/// Lists all stored zones.
pub async fn list_zones(State(state): State<AppState>) -> Result<Json<ListZonesResponse>, ApiError> {
    let zones = state.zones.list_all().await?;
    let total = zones.len();
    Ok(Json(ListZonesResponse { zones, total }))
}

/// Proximity query: auto-groups are expanded to their sub-zones, then the
/// radius filter and (when supplied) the restriction filter are applied.
pub async fn near_zones(
    State(state): State<AppState>,
    Json(request): Json<NearZonesRequest>,
) -> Result<Json<ListZonesResponse>, ApiError> {
    request.validate()?;

    let zones = state.zones.list_all().await?;
    let candidates = expand_auto_groups(zones);
    let point = GeoPoint::new(request.lat, request.lon);
    let nearby = filter_by_radius(candidates, point, request.radius);
    let zones = filter_by_restrictions(nearby, &request.restrictions);

    let total = zones.len();
    Ok(Json(ListZonesResponse { zones, total }))
}

/// Partial edit of a zone's name and type. Switching to a different weather
/// type drops the old payload and refetches.
pub async fn edit_zone(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EditZoneRequest>,
) -> Result<Json<Zone>, ApiError> {
    request.validate()?;

    let mut zone = state
        .zones
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("zone {id} not found")))?;

    if let Some(name) = request.name {
        zone.name = name;
    }

    if let Some(zone_type) = request.zone_type {
        if zone_type == ZoneType::AutoGroup || zone.zone_type == ZoneType::AutoGroup {
            return Err(ApiError::Validation(
                "a zone cannot change into or out of auto-group".into(),
            ));
        }
        if zone_type != zone.zone_type {
            zone.zone_type = zone_type;
            zone.payload = None;
            if zone_type.is_weather_type() {
                match state.weather.fetch(&zone.bbox).await {
                    Ok(snapshot) => zone.apply_snapshot(Some(&snapshot)),
                    Err(e) => warn!(zone = %zone.name, error = %e, "weather refetch failed"),
                }
            }
        }
    }

    if !state.zones.replace(&zone).await? {
        return Err(ApiError::NotFound(format!("zone {id} not found")));
    }
    Ok(Json(zone))
}

/// Manual refresh of a single zone.
///
/// For an auto-group zone this runs the same per-group refresh as the
/// scheduler, including rescheduling; a concurrent scheduler pass follows
/// last-write-wins.
pub async fn refresh_zone(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Zone>, ApiError> {
    let mut zone = state
        .zones
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("zone {id} not found")))?;

    match zone.zone_type {
        ZoneType::AutoGroup => {
            let persisted = refresh_auto_group(
                state.zones.as_ref(),
                state.weather.as_ref(),
                state.config.scheduler.evaluate_thresholds,
                &mut zone,
            )
            .await;
            // The scheduler tolerates an unpersisted pass and retries; a
            // manual refresh must not report state the store never saw.
            if !persisted {
                return Err(ApiError::Internal(format!(
                    "refreshed zone {id} could not be persisted"
                )));
            }
        }
        zone_type if zone_type.is_weather_type() => {
            let snapshot = state.weather.fetch(&zone.bbox).await?;
            zone.apply_snapshot(Some(&snapshot));
            if !state.zones.replace(&zone).await? {
                return Err(ApiError::NotFound(format!("zone {id} not found")));
            }
        }
        _ => {
            return Err(ApiError::Validation(
                "empty zones carry no weather to refresh".into(),
            ));
        }
    }

    Ok(Json(zone))
}

/// Deletes a zone. 404 when no zone with that id exists.
pub async fn delete_zone(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.zones.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("zone {id} not found")))
    }
}

fn check_sampling_params(
    state: &AppState,
    sampling_size: u32,
    refresh_rate: u32,
) -> Result<(), ApiError> {
    let config = &state.config.scheduler;
    if sampling_size < config.min_sampling_size {
        return Err(ApiError::Validation(format!(
            "samplingSize must be at least {} meters",
            config.min_sampling_size
        )));
    }
    if refresh_rate < config.min_refresh_rate {
        return Err(ApiError::Validation(format!(
            "refreshRate must be at least {} seconds",
            config.min_refresh_rate
        )));
    }
    Ok(())
}

fn check_sub_zone_type(zone_type: ZoneType) -> Result<(), ApiError> {
    if zone_type.is_weather_type() {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "{zone_type} is not a valid sub-zone weather type"
        )))
    }
}

/// Assembles an auto-group zone: the partitioned grid plus its refresh
/// policy, due immediately so the first triggered pass picks it up.
fn build_auto_group(
    name: String,
    bbox: BoundingBox,
    sampling_size: u32,
    refresh_rate: u32,
    sub_zone_type: ZoneType,
    threshold: BTreeMap<String, Threshold>,
) -> Zone {
    let zones = partition(&name, sub_zone_type, &bbox, f64::from(sampling_size));
    let mut zone = Zone::new(name, ZoneType::AutoGroup, bbox);
    zone.payload = Some(ZonePayload::AutoGroup(AutoGroupPayload {
        sampling_size,
        refresh_rate,
        next_refresh: Utc::now(),
        threshold,
        sub_zone_type,
        zones,
    }));
    zone
}
