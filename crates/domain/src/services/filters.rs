//! Geospatial and payload filters backing proximity queries.

use crate::models::geo::{geodesic_distance, GeoPoint};
use crate::models::zone::{Restriction, Zone, ZonePayload, ZoneType};

/// Expands auto-group zones into their sub-zones.
///
/// A group's own bbox is never a query candidate; only its children are.
/// Other zones pass through unchanged, in input order.
pub fn expand_auto_groups(zones: Vec<Zone>) -> Vec<Zone> {
    let mut expanded = Vec::with_capacity(zones.len());
    for mut zone in zones {
        if zone.zone_type == ZoneType::AutoGroup {
            // A group without a payload has no sub-zones to offer.
            if let Some(ZonePayload::AutoGroup(payload)) = zone.payload.take() {
                expanded.extend(payload.zones);
            }
        } else {
            expanded.push(zone);
        }
    }
    expanded
}

/// Whether the zone's bounding circle touches the query circle.
///
/// The zone counts as within radius when
/// `distance(point, center) <= radius + zone_radius`, with `center` the
/// arithmetic corner midpoint and `zone_radius` half the geodesic diagonal.
/// A generous over-approximation of rectangle-circle intersection, and the
/// boundary is inclusive.
pub fn zone_within_radius(zone: &Zone, point: GeoPoint, radius_m: f64) -> bool {
    let zone_radius = zone.bbox.diagonal_meters() / 2.0;
    geodesic_distance(point, zone.bbox.center()) <= radius_m + zone_radius
}

/// Keeps the zones within `radius_m` meters of `point`, in input order.
pub fn filter_by_radius(zones: Vec<Zone>, point: GeoPoint, radius_m: f64) -> Vec<Zone> {
    zones
        .into_iter()
        .filter(|zone| zone_within_radius(zone, point, radius_m))
        .collect()
}

/// Keeps the zones satisfying at least one restriction.
///
/// Restrictions are OR-combined: a zone matches as soon as one restriction
/// whose field its payload exposes holds. A zone with no payload, or whose
/// payload lacks every restricted field, never matches. An empty restriction
/// list filters nothing.
pub fn filter_by_restrictions(zones: Vec<Zone>, restrictions: &[Restriction]) -> Vec<Zone> {
    if restrictions.is_empty() {
        return zones;
    }

    zones
        .into_iter()
        .filter(|zone| {
            let Some(payload) = zone.payload.as_ref() else {
                return false;
            };
            restrictions.iter().any(|restriction| {
                payload
                    .field(&restriction.name)
                    .is_some_and(|value| restriction.condition.holds(value, restriction.limit))
            })
        })
        .collect()
}
