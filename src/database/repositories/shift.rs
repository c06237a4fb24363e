use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::models::{
    AssignmentRole, JobStatus, PauseLog, Shift, ShiftDetail, ShiftInput, ShiftTheme,
    ShiftUpdateInput, StaffLink,
};

const SHIFT_COLUMNS: &str = "id, title, start_time, end_time, theme, assignment_type, \
     is_published, include_location, shift_instructions, job_status, job_started_at, \
     job_ended_at, scheduled_in_time, scheduled_out_time, logged_in_time, logged_out_time, \
     pause_log, travel_distance_km, travel_duration_min, travel_from_location, \
     created_at, updated_at";

#[derive(Clone)]
pub struct ShiftRepository {
    pool: PgPool,
}

impl ShiftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the shift row and all of its relation rows in one
    /// transaction. Validation runs before this is called, so a failure
    /// here leaves no partial relation rows behind.
    pub async fn create(&self, input: &ShiftInput) -> Result<ShiftDetail> {
        let now = Utc::now().naive_utc();
        let id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;

        let shift = sqlx::query_as::<_, Shift>(&format!(
            r#"
            INSERT INTO shifts (id, title, start_time, end_time, theme, assignment_type,
                                is_published, include_location, shift_instructions,
                                job_status, pause_log, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {SHIFT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.title)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.theme.unwrap_or_default())
        .bind(input.assignment_type)
        .bind(input.is_published)
        .bind(input.include_location)
        .bind(&input.shift_instructions)
        .bind(JobStatus::NotStarted)
        .bind(Json(PauseLog::default()))
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_staff_links(&mut tx, id, &input.staff_ids, AssignmentRole::Assigned, now)
            .await?;
        Self::insert_staff_links(
            &mut tx,
            id,
            &input.supervisor_ids,
            AssignmentRole::Supervisor,
            now,
        )
        .await?;
        Self::insert_staff_links(
            &mut tx,
            id,
            &input.team_member_ids,
            AssignmentRole::TeamMember,
            now,
        )
        .await?;

        for team_id in &input.team_ids {
            sqlx::query(
                "INSERT INTO shift_teams (shift_id, team_id, created_at) VALUES ($1, $2, $3) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(team_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        for client_id in &input.client_ids {
            sqlx::query(
                "INSERT INTO shift_clients (shift_id, client_id, created_at) VALUES ($1, $2, $3) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(client_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        for location_id in &input.location_ids {
            sqlx::query(
                "INSERT INTO shift_locations (shift_id, location_id, created_at) VALUES ($1, $2, $3) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(location_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.load_detail(shift).await
    }

    async fn insert_staff_links(
        tx: &mut Transaction<'_, Postgres>,
        shift_id: Uuid,
        staff_ids: &[Uuid],
        role: AssignmentRole,
        now: NaiveDateTime,
    ) -> Result<()> {
        for staff_id in staff_ids {
            sqlx::query(
                "INSERT INTO shift_staff (shift_id, staff_id, role, created_at) \
                 VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
            )
            .bind(shift_id)
            .bind(staff_id)
            .bind(role)
            .bind(now)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    pub async fn find_detail(&self, id: Uuid) -> Result<Option<ShiftDetail>> {
        match self.find_by_id(id).await? {
            Some(shift) => Ok(Some(self.load_detail(shift).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_range(
        &self,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> Result<Vec<Shift>> {
        let shifts = sqlx::query_as::<_, Shift>(&format!(
            r#"
            SELECT {SHIFT_COLUMNS} FROM shifts
            WHERE ($1::timestamp IS NULL OR start_time >= $1)
              AND ($2::timestamp IS NULL OR end_time <= $2)
            ORDER BY start_time
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    /// Candidate pool for travel linking: every other shift that starts or
    /// ends on the given calendar date.
    pub async fn find_same_day(&self, date: NaiveDate, exclude: Uuid) -> Result<Vec<ShiftDetail>> {
        let day_start = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        let day_end = day_start + chrono::Duration::days(1);

        let shifts = sqlx::query_as::<_, Shift>(&format!(
            r#"
            SELECT {SHIFT_COLUMNS} FROM shifts
            WHERE id <> $1
              AND ((start_time >= $2 AND start_time < $3)
                OR (end_time >= $2 AND end_time < $3))
            ORDER BY start_time
            "#
        ))
        .bind(exclude)
        .bind(day_start)
        .bind(day_end)
        .fetch_all(&self.pool)
        .await?;

        let mut details = Vec::with_capacity(shifts.len());
        for shift in shifts {
            details.push(self.load_detail(shift).await?);
        }
        Ok(details)
    }

    pub async fn update(&self, id: Uuid, input: &ShiftUpdateInput) -> Result<Option<Shift>> {
        let now = Utc::now().naive_utc();
        let shift = sqlx::query_as::<_, Shift>(&format!(
            r#"
            UPDATE shifts
            SET title = $1, start_time = $2, end_time = $3, theme = $4,
                assignment_type = $5, is_published = $6, include_location = $7,
                shift_instructions = $8, updated_at = $9
            WHERE id = $10
            RETURNING {SHIFT_COLUMNS}
            "#
        ))
        .bind(&input.title)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.theme.unwrap_or_default())
        .bind(input.assignment_type)
        .bind(input.is_published)
        .bind(input.include_location)
        .bind(&input.shift_instructions)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM shifts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Persist a job-lifecycle snapshot computed by the time tracker.
    pub async fn apply_job_fields(&self, shift: &Shift) -> Result<Shift> {
        let now = Utc::now().naive_utc();
        let updated = sqlx::query_as::<_, Shift>(&format!(
            r#"
            UPDATE shifts
            SET job_status = $1, job_started_at = $2, job_ended_at = $3,
                scheduled_in_time = $4, scheduled_out_time = $5,
                logged_in_time = $6, logged_out_time = $7,
                pause_log = $8, theme = $9, updated_at = $10
            WHERE id = $11
            RETURNING {SHIFT_COLUMNS}
            "#
        ))
        .bind(shift.job_status)
        .bind(shift.job_started_at)
        .bind(shift.job_ended_at)
        .bind(shift.scheduled_in_time)
        .bind(shift.scheduled_out_time)
        .bind(shift.logged_in_time)
        .bind(shift.logged_out_time)
        .bind(&shift.pause_log)
        .bind(shift.theme)
        .bind(now)
        .bind(shift.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    pub async fn set_travel(
        &self,
        id: Uuid,
        distance_km: Option<f64>,
        duration_min: Option<i32>,
        from_location: Option<&str>,
    ) -> Result<Option<Shift>> {
        let now = Utc::now().naive_utc();
        let shift = sqlx::query_as::<_, Shift>(&format!(
            r#"
            UPDATE shifts
            SET travel_distance_km = $1, travel_duration_min = $2,
                travel_from_location = $3, updated_at = $4
            WHERE id = $5
            RETURNING {SHIFT_COLUMNS}
            "#
        ))
        .bind(distance_km)
        .bind(duration_min)
        .bind(from_location)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    pub async fn has_assignments(&self, id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM shift_staff WHERE shift_id = $1)
                OR EXISTS (SELECT 1 FROM shift_teams WHERE shift_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Cancellation: drop every staff and team assignment row, link the
    /// cover staff as the single assignee and flag the shift Danger. One
    /// transaction, so a failure leaves the original assignments intact.
    pub async fn replace_assignments_with(
        &self,
        shift_id: Uuid,
        cover_staff_id: Uuid,
    ) -> Result<Shift> {
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM shift_staff WHERE shift_id = $1")
            .bind(shift_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM shift_teams WHERE shift_id = $1")
            .bind(shift_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO shift_staff (shift_id, staff_id, role, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(shift_id)
        .bind(cover_staff_id)
        .bind(AssignmentRole::Assigned)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let shift = sqlx::query_as::<_, Shift>(&format!(
            "UPDATE shifts SET theme = $1, updated_at = $2 WHERE id = $3 RETURNING {SHIFT_COLUMNS}"
        ))
        .bind(ShiftTheme::Danger)
        .bind(now)
        .bind(shift_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(shift)
    }

    async fn load_detail(&self, shift: Shift) -> Result<ShiftDetail> {
        let staff_links = sqlx::query_as::<_, StaffLink>(
            "SELECT staff_id, role FROM shift_staff WHERE shift_id = $1 ORDER BY created_at",
        )
        .bind(shift.id)
        .fetch_all(&self.pool)
        .await?;

        let team_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT team_id FROM shift_teams WHERE shift_id = $1")
                .bind(shift.id)
                .fetch_all(&self.pool)
                .await?;

        let client_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT client_id FROM shift_clients WHERE shift_id = $1")
                .bind(shift.id)
                .fetch_all(&self.pool)
                .await?;

        let location_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT location_id FROM shift_locations WHERE shift_id = $1")
                .bind(shift.id)
                .fetch_all(&self.pool)
                .await?;

        Ok(ShiftDetail::new(
            shift,
            staff_links,
            team_ids,
            client_ids,
            location_ids,
        ))
    }
}
