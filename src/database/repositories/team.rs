use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Team, TeamInput};

#[derive(Clone)]
pub struct TeamRepository {
    pool: PgPool,
}

impl TeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: TeamInput) -> Result<Team> {
        let now = Utc::now().naive_utc();
        let team = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.description)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(team)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Team>> {
        let team = sqlx::query_as::<_, Team>(
            "SELECT id, name, description, created_at, updated_at FROM teams WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    pub async fn find_all(&self) -> Result<Vec<Team>> {
        let teams = sqlx::query_as::<_, Team>(
            "SELECT id, name, description, created_at, updated_at FROM teams ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(teams)
    }

    pub async fn update(&self, id: Uuid, input: TeamInput) -> Result<Option<Team>> {
        let now = Utc::now().naive_utc();
        let team = sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams
            SET name = $1, description = $2, updated_at = $3
            WHERE id = $4
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn existing_ids(&self, ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM teams WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(found.into_iter().collect())
    }
}
