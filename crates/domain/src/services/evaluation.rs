//! Threshold evaluation: turning sub-zone payloads into activation state.

use std::collections::BTreeMap;

use crate::models::zone::{Threshold, Zone};

/// Re-evaluates the `active` flag of every zone against the threshold map.
///
/// Each zone is first deactivated, then thresholds are checked in map order:
/// a rule whose field the payload does not expose is skipped, and the first
/// rule that holds activates the zone and stops further evaluation. The
/// rules are OR-combined, so ordering only decides which rule is credited,
/// never the outcome.
pub fn evaluate_thresholds(zones: &mut [Zone], thresholds: &BTreeMap<String, Threshold>) {
    for zone in zones.iter_mut() {
        zone.active = false;

        let Some(payload) = zone.payload.as_ref() else {
            continue;
        };

        for (field, threshold) in thresholds {
            let Some(value) = payload.field(field) else {
                continue;
            };

            if threshold.condition.holds(value, threshold.limit) {
                tracing::debug!(
                    zone = %zone.name,
                    field = %field,
                    value,
                    limit = threshold.limit,
                    condition = %threshold.condition,
                    "zone activated by threshold"
                );
                zone.active = true;
                break;
            }
        }
    }
}
