//! Postgres-backed zone repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::zone::{Zone, ZoneType};
use domain::services::repository::{RepositoryError, ZoneRepository};

use crate::entities::zone::{payload_to_value, ZoneEntity};

/// Repository for zone documents stored in the `zones` table.
#[derive(Clone)]
pub struct PgZoneRepository {
    pool: PgPool,
}

impl PgZoneRepository {
    /// Creates a new PgZoneRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Backend(err.into())
}

#[async_trait]
impl ZoneRepository for PgZoneRepository {
    async fn insert(&self, zone: Zone) -> Result<Zone, RepositoryError> {
        let payload = payload_to_value(&zone.payload)?;
        let entity = sqlx::query_as::<_, ZoneEntity>(
            r#"
            INSERT INTO zones (name, zone_type, sw_lat, sw_lon, ne_lat, ne_lon, active, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&zone.name)
        .bind(zone.zone_type.as_str())
        .bind(zone.bbox.south_west.lat)
        .bind(zone.bbox.south_west.lon)
        .bind(zone.bbox.north_east.lat)
        .bind(zone.bbox.north_east.lon)
        .bind(zone.active)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        entity.into_domain()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Zone>, RepositoryError> {
        let entity = sqlx::query_as::<_, ZoneEntity>(
            r#"
            SELECT * FROM zones WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        entity.map(ZoneEntity::into_domain).transpose()
    }

    async fn replace(&self, zone: &Zone) -> Result<bool, RepositoryError> {
        let id = zone.id.ok_or(RepositoryError::MissingId)?;
        let payload = payload_to_value(&zone.payload)?;
        let result = sqlx::query(
            r#"
            UPDATE zones
            SET name = $2, zone_type = $3, sw_lat = $4, sw_lon = $5,
                ne_lat = $6, ne_lon = $7, active = $8, payload = $9,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&zone.name)
        .bind(zone.zone_type.as_str())
        .bind(zone.bbox.south_west.lat)
        .bind(zone.bbox.south_west.lon)
        .bind(zone.bbox.north_east.lat)
        .bind(zone.bbox.north_east.lon)
        .bind(zone.active)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM zones WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<Zone>, RepositoryError> {
        let entities = sqlx::query_as::<_, ZoneEntity>(
            r#"
            SELECT * FROM zones ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        entities
            .into_iter()
            .map(ZoneEntity::into_domain)
            .collect()
    }

    async fn find_due_auto_groups(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Zone>, RepositoryError> {
        // nextRefresh lives inside the JSONB payload; the zone_type index
        // narrows the scan to auto groups before the cast runs.
        let entities = sqlx::query_as::<_, ZoneEntity>(
            r#"
            SELECT * FROM zones
            WHERE zone_type = $1
              AND (payload->>'nextRefresh')::timestamptz < $2
            ORDER BY (payload->>'nextRefresh')::timestamptz
            "#,
        )
        .bind(ZoneType::AutoGroup.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        tracing::debug!(count = entities.len(), "due auto-group zones queried");

        entities
            .into_iter()
            .map(ZoneEntity::into_domain)
            .collect()
    }
}
