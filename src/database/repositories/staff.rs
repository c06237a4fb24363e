use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Staff, StaffInput};

#[derive(Clone)]
pub struct StaffRepository {
    pool: PgPool,
}

impl StaffRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: StaffInput) -> Result<Staff> {
        let now = Utc::now().naive_utc();
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            INSERT INTO staff (id, name, email, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, phone, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(staff)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Staff>> {
        let staff = sqlx::query_as::<_, Staff>(
            "SELECT id, name, email, phone, created_at, updated_at FROM staff WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(staff)
    }

    /// Name lookup used for the "Cover" sentinel record. If several rows
    /// share the name, the oldest wins.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Staff>> {
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            SELECT id, name, email, phone, created_at, updated_at
            FROM staff
            WHERE name = $1
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(staff)
    }

    pub async fn find_all(&self) -> Result<Vec<Staff>> {
        let staff = sqlx::query_as::<_, Staff>(
            "SELECT id, name, email, phone, created_at, updated_at FROM staff ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(staff)
    }

    pub async fn update(&self, id: Uuid, input: StaffInput) -> Result<Option<Staff>> {
        let now = Utc::now().naive_utc();
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            UPDATE staff
            SET name = $1, email = $2, phone = $3, updated_at = $4
            WHERE id = $5
            RETURNING id, name, email, phone, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(staff)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM staff WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Existence check for referential-integrity validation.
    pub async fn existing_ids(&self, ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM staff WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(found.into_iter().collect())
    }
}
