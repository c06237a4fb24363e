use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    /// Visual status tag driven by job-lifecycle transitions and cancellation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ShiftTheme {
        Primary => "primary",
        Warning => "warning",
        Success => "success",
        Danger => "danger",
    }
}

impl Default for ShiftTheme {
    fn default() -> Self {
        ShiftTheme::Primary
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AssignmentType {
        Individual => "individual",
        Team => "team",
    }
}

string_enum! {
    /// Explicit job-lifecycle state. Transitions are guarded in the time
    /// tracker service; the store never holds an inconsistent combination
    /// of started/paused/ended flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum JobStatus {
        NotStarted => "not_started",
        Running => "running",
        Paused => "paused",
        Ended => "ended",
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::NotStarted
    }
}

string_enum! {
    /// The capacity in which a staff member is linked to a shift.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AssignmentRole {
        Assigned => "assigned",
        Supervisor => "supervisor",
        TeamMember => "team_member",
    }
}

pub const PAUSE_LOG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseEntry {
    pub paused_at: NaiveDateTime,
    pub resumed_at: Option<NaiveDateTime>,
}

/// Structured, versioned pause log. At most the last entry may be open
/// (resumed_at unset), and only while the job status is Paused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseLog {
    pub version: u32,
    pub entries: Vec<PauseEntry>,
}

impl Default for PauseLog {
    fn default() -> Self {
        PauseLog {
            version: PAUSE_LOG_VERSION,
            entries: Vec::new(),
        }
    }
}

impl PauseLog {
    pub fn open_entry(&self) -> Option<&PauseEntry> {
        self.entries.last().filter(|e| e.resumed_at.is_none())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: Uuid,
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub theme: ShiftTheme,
    pub assignment_type: AssignmentType,
    pub is_published: bool,
    pub include_location: bool,
    pub shift_instructions: Option<String>,
    pub job_status: JobStatus,
    pub job_started_at: Option<NaiveDateTime>,
    pub job_ended_at: Option<NaiveDateTime>,
    pub scheduled_in_time: Option<NaiveDateTime>,
    pub scheduled_out_time: Option<NaiveDateTime>,
    pub logged_in_time: Option<NaiveDateTime>,
    pub logged_out_time: Option<NaiveDateTime>,
    pub pause_log: Json<PauseLog>,
    pub travel_distance_km: Option<f64>,
    pub travel_duration_min: Option<i32>,
    pub travel_from_location: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Shift {
    pub fn job_started(&self) -> bool {
        matches!(self.job_status, JobStatus::Running | JobStatus::Paused)
    }

    pub fn job_paused(&self) -> bool {
        self.job_status == JobStatus::Paused
    }

    /// Travel results are persisted only once the clock has run at least once.
    pub fn has_clocked_in(&self) -> bool {
        self.job_started_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftInput {
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub theme: Option<ShiftTheme>,
    pub assignment_type: AssignmentType,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub include_location: bool,
    pub shift_instructions: Option<String>,
    #[serde(default)]
    pub staff_ids: Vec<Uuid>,
    #[serde(default)]
    pub supervisor_ids: Vec<Uuid>,
    #[serde(default)]
    pub team_member_ids: Vec<Uuid>,
    #[serde(default)]
    pub team_ids: Vec<Uuid>,
    #[serde(default)]
    pub client_ids: Vec<Uuid>,
    #[serde(default)]
    pub location_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftUpdateInput {
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub theme: Option<ShiftTheme>,
    pub assignment_type: AssignmentType,
    pub is_published: bool,
    pub include_location: bool,
    pub shift_instructions: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StaffLink {
    pub staff_id: Uuid,
    pub role: AssignmentRole,
}

/// A shift together with its relation rows, as exposed on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftDetail {
    #[serde(flatten)]
    pub shift: Shift,
    pub job_started: bool,
    pub job_paused: bool,
    pub staff_ids: Vec<Uuid>,
    pub supervisor_ids: Vec<Uuid>,
    pub team_member_ids: Vec<Uuid>,
    pub team_ids: Vec<Uuid>,
    pub client_ids: Vec<Uuid>,
    pub location_ids: Vec<Uuid>,
}

impl ShiftDetail {
    pub fn new(
        shift: Shift,
        staff_links: Vec<StaffLink>,
        team_ids: Vec<Uuid>,
        client_ids: Vec<Uuid>,
        location_ids: Vec<Uuid>,
    ) -> Self {
        let mut staff_ids = Vec::new();
        let mut supervisor_ids = Vec::new();
        let mut team_member_ids = Vec::new();
        for link in staff_links {
            match link.role {
                AssignmentRole::Assigned => staff_ids.push(link.staff_id),
                AssignmentRole::Supervisor => supervisor_ids.push(link.staff_id),
                AssignmentRole::TeamMember => team_member_ids.push(link.staff_id),
            }
        }

        let job_started = shift.job_started();
        let job_paused = shift.job_paused();

        ShiftDetail {
            shift,
            job_started,
            job_paused,
            staff_ids,
            supervisor_ids,
            team_member_ids,
            team_ids,
            client_ids,
            location_ids,
        }
    }

    /// Every staff id linked to the shift, regardless of role.
    pub fn all_staff_ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(
            self.staff_ids.len() + self.supervisor_ids.len() + self.team_member_ids.len(),
        );
        ids.extend_from_slice(&self.staff_ids);
        ids.extend_from_slice(&self.supervisor_ids);
        ids.extend_from_slice(&self.team_member_ids);
        ids
    }
}
