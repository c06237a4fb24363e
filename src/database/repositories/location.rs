use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Location, LocationInput};

#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Plain create. A `(unit, name)` duplicate bubbles up as a unique
    /// violation, which the error layer maps to a conflict.
    pub async fn create(&self, input: LocationInput) -> Result<Location> {
        let now = Utc::now().naive_utc();
        let location = sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (id, unit, name, address, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, unit, name, address, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.unit)
        .bind(&input.name)
        .bind(&input.address)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(location)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, unit, name, address, created_at, updated_at FROM locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    pub async fn find_by_unit_and_name(&self, unit: &str, name: &str) -> Result<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            SELECT id, unit, name, address, created_at, updated_at
            FROM locations
            WHERE unit = $1 AND name = $2
            "#,
        )
        .bind(unit)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// Find-or-create by the `(unit, name)` dedup key. Safe to call from
    /// concurrent recurrence workers: the insert ignores a conflicting row
    /// and the follow-up select picks up whichever write won.
    pub async fn resolve(&self, input: &LocationInput) -> Result<Location> {
        if let Some(existing) = self.find_by_unit_and_name(&input.unit, &input.name).await? {
            return Ok(existing);
        }

        let now = Utc::now().naive_utc();
        let inserted = sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (id, unit, name, address, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (unit, name) DO NOTHING
            RETURNING id, unit, name, address, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.unit)
        .bind(&input.name)
        .bind(&input.address)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(location) => Ok(location),
            None => self
                .find_by_unit_and_name(&input.unit, &input.name)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Location vanished during resolve")),
        }
    }

    pub async fn find_all(&self) -> Result<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, unit, name, address, created_at, updated_at FROM locations ORDER BY unit, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    pub async fn update(&self, id: Uuid, input: LocationInput) -> Result<Option<Location>> {
        let now = Utc::now().naive_utc();
        let location = sqlx::query_as::<_, Location>(
            r#"
            UPDATE locations
            SET unit = $1, name = $2, address = $3, updated_at = $4
            WHERE id = $5
            RETURNING id, unit, name, address, created_at, updated_at
            "#,
        )
        .bind(&input.unit)
        .bind(&input.name)
        .bind(&input.address)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn existing_ids(&self, ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM locations WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(found.into_iter().collect())
    }
}
