use chrono::{Duration, NaiveDateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{JobStatus, PauseEntry, Shift, ShiftTheme};
use crate::database::repositories::ShiftRepository;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTransition {
    Start,
    Pause,
    Resume,
    End,
    Reset,
}

impl JobTransition {
    fn verb(&self) -> &'static str {
        match self {
            JobTransition::Start => "start",
            JobTransition::Pause => "pause",
            JobTransition::Resume => "resume",
            JobTransition::End => "end",
            JobTransition::Reset => "reset",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Illegal job transition: cannot {action} while {status}")]
pub struct TransitionError {
    action: &'static str,
    status: JobStatus,
}

/// Apply a job-lifecycle transition to an in-memory shift snapshot.
/// Illegal transitions are rejected; the shift is left untouched on error.
pub fn apply_transition(
    shift: &mut Shift,
    transition: JobTransition,
    now: NaiveDateTime,
) -> Result<(), TransitionError> {
    let illegal = || TransitionError {
        action: transition.verb(),
        status: shift.job_status,
    };

    match transition {
        JobTransition::Start => {
            if shift.job_status != JobStatus::NotStarted {
                return Err(illegal());
            }
            shift.job_status = JobStatus::Running;
            shift.job_started_at = Some(now);
            shift.logged_in_time = Some(now);
            if shift.scheduled_in_time.is_none() {
                shift.scheduled_in_time = Some(shift.start_time);
            }
            if shift.scheduled_out_time.is_none() {
                shift.scheduled_out_time = Some(shift.end_time);
            }
            shift.theme = ShiftTheme::Warning;
        }
        JobTransition::Pause => {
            if shift.job_status != JobStatus::Running {
                return Err(illegal());
            }
            shift.job_status = JobStatus::Paused;
            shift.pause_log.entries.push(PauseEntry {
                paused_at: now,
                resumed_at: None,
            });
        }
        JobTransition::Resume => {
            if shift.job_status != JobStatus::Paused {
                return Err(illegal());
            }
            shift.job_status = JobStatus::Running;
            close_open_pause(shift, now);
        }
        JobTransition::End => {
            if !matches!(shift.job_status, JobStatus::Running | JobStatus::Paused) {
                return Err(illegal());
            }
            // An entry left open past the end would break the pause-log
            // invariant, so ending while paused closes it at the end instant.
            close_open_pause(shift, now);
            shift.job_status = JobStatus::Ended;
            shift.job_ended_at = Some(now);
            shift.logged_out_time = Some(now);
            shift.theme = ShiftTheme::Success;
        }
        JobTransition::Reset => {
            shift.job_status = JobStatus::NotStarted;
            shift.job_started_at = None;
            shift.job_ended_at = None;
            shift.scheduled_in_time = None;
            shift.scheduled_out_time = None;
            shift.logged_in_time = None;
            shift.logged_out_time = None;
            shift.pause_log.entries.clear();
            shift.theme = ShiftTheme::Primary;
        }
    }

    Ok(())
}

fn close_open_pause(shift: &mut Shift, now: NaiveDateTime) {
    if let Some(entry) = shift.pause_log.entries.last_mut() {
        if entry.resumed_at.is_none() {
            entry.resumed_at = Some(now);
        }
    }
}

/// Derived duration metrics. Computed on read, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timesheet {
    pub scheduled_minutes: Option<i64>,
    pub logged_minutes: Option<i64>,
    pub pause_minutes: i64,
    pub pay_minutes: Option<i64>,
    pub scheduled_length: Option<String>,
    pub logged_length: Option<String>,
    pub pause_time: String,
    pub pay_length: Option<String>,
}

impl Timesheet {
    pub fn of(shift: &Shift) -> Self {
        let scheduled_minutes = match (shift.scheduled_in_time, shift.scheduled_out_time) {
            (Some(time_in), Some(time_out)) => Some((time_out - time_in).num_minutes()),
            _ => None,
        };
        let logged_minutes = match (shift.logged_in_time, shift.logged_out_time) {
            (Some(time_in), Some(time_out)) => Some((time_out - time_in).num_minutes()),
            _ => None,
        };

        // Only closed pause entries count; an open one is still ticking.
        let pause_minutes = shift
            .pause_log
            .entries
            .iter()
            .filter_map(|e| e.resumed_at.map(|resumed| resumed - e.paused_at))
            .fold(Duration::zero(), |total, pause| total + pause)
            .num_minutes();

        // Pay length never nets out pause time; it is reported separately
        // for payroll to apply.
        let pay_minutes = match (scheduled_minutes, logged_minutes) {
            (Some(s), Some(l)) => Some(s.min(l)),
            (Some(s), None) => Some(s),
            (None, Some(l)) => Some(l),
            (None, None) => None,
        };

        Timesheet {
            scheduled_minutes,
            logged_minutes,
            pause_minutes,
            pay_minutes,
            scheduled_length: scheduled_minutes.map(format_hmm),
            logged_length: logged_minutes.map(format_hmm),
            pause_time: format_hmm(pause_minutes),
            pay_length: pay_minutes.map(format_hmm),
        }
    }
}

pub fn format_hmm(minutes: i64) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Per-shift job-lifecycle state machine. Each transition is a single
/// read-modify-write round-trip; last write wins, no version check.
#[derive(Clone)]
pub struct TimeTracker {
    shifts: ShiftRepository,
}

impl TimeTracker {
    pub fn new(shifts: ShiftRepository) -> Self {
        Self { shifts }
    }

    pub async fn transition(
        &self,
        shift_id: Uuid,
        transition: JobTransition,
    ) -> Result<Shift, AppError> {
        let mut shift = self
            .shifts
            .find_by_id(shift_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

        let now = Utc::now().naive_utc();
        apply_transition(&mut shift, transition, now)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let updated = self.shifts.apply_job_fields(&shift).await?;
        Ok(updated)
    }

    pub async fn timesheet(&self, shift_id: Uuid) -> Result<Timesheet, AppError> {
        let shift = self
            .shifts
            .find_by_id(shift_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

        Ok(Timesheet::of(&shift))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{AssignmentType, PauseLog};
    use chrono::NaiveDate;
    use fake::Fake;
    use fake::faker::lorem::en::Word;
    use pretty_assertions::assert_eq;
    use sqlx::types::Json;

    fn at(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn sample_shift() -> Shift {
        let now = at(8, 0);
        Shift {
            id: Uuid::new_v4(),
            title: Word().fake(),
            start_time: at(9, 0),
            end_time: at(13, 0),
            theme: ShiftTheme::Primary,
            assignment_type: AssignmentType::Individual,
            is_published: true,
            include_location: false,
            shift_instructions: None,
            job_status: JobStatus::NotStarted,
            job_started_at: None,
            job_ended_at: None,
            scheduled_in_time: None,
            scheduled_out_time: None,
            logged_in_time: None,
            logged_out_time: None,
            pause_log: Json(PauseLog::default()),
            travel_distance_km: None,
            travel_duration_min: None,
            travel_from_location: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn start_seeds_schedule_and_sets_theme() {
        let mut shift = sample_shift();
        apply_transition(&mut shift, JobTransition::Start, at(9, 5)).unwrap();

        assert_eq!(shift.job_status, JobStatus::Running);
        assert_eq!(shift.job_started_at, Some(at(9, 5)));
        assert_eq!(shift.logged_in_time, Some(at(9, 5)));
        assert_eq!(shift.scheduled_in_time, Some(at(9, 0)));
        assert_eq!(shift.scheduled_out_time, Some(at(13, 0)));
        assert_eq!(shift.theme, ShiftTheme::Warning);
    }

    #[test]
    fn start_keeps_existing_schedule() {
        let mut shift = sample_shift();
        shift.scheduled_in_time = Some(at(8, 30));
        shift.scheduled_out_time = Some(at(12, 30));
        apply_transition(&mut shift, JobTransition::Start, at(9, 5)).unwrap();

        assert_eq!(shift.scheduled_in_time, Some(at(8, 30)));
        assert_eq!(shift.scheduled_out_time, Some(at(12, 30)));
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut shift = sample_shift();
        apply_transition(&mut shift, JobTransition::Start, at(9, 0)).unwrap();

        let err = apply_transition(&mut shift, JobTransition::Start, at(9, 10)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Illegal job transition: cannot start while running"
        );
    }

    #[test]
    fn pause_requires_running() {
        let mut shift = sample_shift();
        assert!(apply_transition(&mut shift, JobTransition::Pause, at(9, 0)).is_err());
        assert!(apply_transition(&mut shift, JobTransition::Resume, at(9, 0)).is_err());
        assert!(apply_transition(&mut shift, JobTransition::End, at(9, 0)).is_err());
        assert_eq!(shift.job_status, JobStatus::NotStarted);
    }

    #[test]
    fn pause_and_resume_bookkeep_the_log() {
        let mut shift = sample_shift();
        apply_transition(&mut shift, JobTransition::Start, at(9, 0)).unwrap();
        apply_transition(&mut shift, JobTransition::Pause, at(10, 0)).unwrap();

        assert_eq!(shift.job_status, JobStatus::Paused);
        assert!(shift.job_paused());
        assert_eq!(shift.pause_log.entries.len(), 1);
        assert!(shift.pause_log.open_entry().is_some());

        apply_transition(&mut shift, JobTransition::Resume, at(10, 20)).unwrap();
        assert_eq!(shift.job_status, JobStatus::Running);
        assert!(shift.pause_log.open_entry().is_none());
        assert_eq!(shift.pause_log.entries[0].resumed_at, Some(at(10, 20)));
    }

    #[test]
    fn end_while_paused_closes_the_open_entry() {
        let mut shift = sample_shift();
        apply_transition(&mut shift, JobTransition::Start, at(9, 0)).unwrap();
        apply_transition(&mut shift, JobTransition::Pause, at(11, 0)).unwrap();
        apply_transition(&mut shift, JobTransition::End, at(12, 0)).unwrap();

        assert_eq!(shift.job_status, JobStatus::Ended);
        assert_eq!(shift.job_ended_at, Some(at(12, 0)));
        assert_eq!(shift.logged_out_time, Some(at(12, 0)));
        assert_eq!(shift.theme, ShiftTheme::Success);
        assert_eq!(shift.pause_log.entries[0].resumed_at, Some(at(12, 0)));
        assert!(!shift.job_started());
    }

    #[test]
    fn reset_clears_everything_from_any_state() {
        let mut shift = sample_shift();
        apply_transition(&mut shift, JobTransition::Start, at(9, 0)).unwrap();
        apply_transition(&mut shift, JobTransition::Pause, at(10, 0)).unwrap();
        apply_transition(&mut shift, JobTransition::End, at(12, 0)).unwrap();
        apply_transition(&mut shift, JobTransition::Reset, at(12, 30)).unwrap();

        assert_eq!(shift.job_status, JobStatus::NotStarted);
        assert_eq!(shift.job_started_at, None);
        assert_eq!(shift.job_ended_at, None);
        assert_eq!(shift.scheduled_in_time, None);
        assert_eq!(shift.scheduled_out_time, None);
        assert_eq!(shift.logged_in_time, None);
        assert_eq!(shift.logged_out_time, None);
        assert!(shift.pause_log.entries.is_empty());
        assert_eq!(shift.theme, ShiftTheme::Primary);
    }

    #[test]
    fn timesheet_pay_length_is_min_of_scheduled_and_logged() {
        let mut shift = sample_shift();
        shift.scheduled_in_time = Some(at(9, 0));
        shift.scheduled_out_time = Some(at(13, 0));
        shift.logged_in_time = Some(at(9, 10));
        shift.logged_out_time = Some(at(12, 40));

        let sheet = Timesheet::of(&shift);
        assert_eq!(sheet.scheduled_minutes, Some(240));
        assert_eq!(sheet.logged_minutes, Some(210));
        assert_eq!(sheet.pay_minutes, Some(210));
        assert_eq!(sheet.pay_length.as_deref(), Some("3:30"));

        // Recomputing from the same inputs is idempotent
        assert_eq!(Timesheet::of(&shift), sheet);
    }

    #[test]
    fn timesheet_falls_back_to_whichever_length_exists() {
        let mut shift = sample_shift();
        shift.logged_in_time = Some(at(9, 0));
        shift.logged_out_time = Some(at(11, 15));

        let sheet = Timesheet::of(&shift);
        assert_eq!(sheet.scheduled_minutes, None);
        assert_eq!(sheet.pay_minutes, Some(135));

        let blank = Timesheet::of(&sample_shift());
        assert_eq!(blank.pay_minutes, None);
        assert_eq!(blank.pause_minutes, 0);
    }

    #[test]
    fn timesheet_counts_only_closed_pauses() {
        let mut shift = sample_shift();
        shift.pause_log.entries.push(PauseEntry {
            paused_at: at(10, 0),
            resumed_at: Some(at(10, 25)),
        });
        shift.pause_log.entries.push(PauseEntry {
            paused_at: at(11, 0),
            resumed_at: None,
        });

        let sheet = Timesheet::of(&shift);
        assert_eq!(sheet.pause_minutes, 25);
        assert_eq!(sheet.pause_time, "0:25");
    }

    #[test]
    fn durations_render_as_hours_and_minutes() {
        assert_eq!(format_hmm(0), "0:00");
        assert_eq!(format_hmm(9), "0:09");
        assert_eq!(format_hmm(75), "1:15");
        assert_eq!(format_hmm(600), "10:00");
    }
}
