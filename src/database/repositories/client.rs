use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Client, ClientInput};

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: ClientInput) -> Result<Client> {
        let now = Utc::now().naive_utc();
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (id, name, contact_email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, contact_email, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.contact_email)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(client)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT id, name, contact_email, created_at, updated_at FROM clients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    pub async fn find_all(&self) -> Result<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            "SELECT id, name, contact_email, created_at, updated_at FROM clients ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    pub async fn update(&self, id: Uuid, input: ClientInput) -> Result<Option<Client>> {
        let now = Utc::now().naive_utc();
        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET name = $1, contact_email = $2, updated_at = $3
            WHERE id = $4
            RETURNING id, name, contact_email, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.contact_email)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn existing_ids(&self, ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM clients WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(found.into_iter().collect())
    }
}
