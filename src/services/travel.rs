use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{AssignmentType, ShiftDetail};
use crate::database::repositories::{LocationRepository, ShiftRepository};
use crate::error::AppError;

/// Sentinel recorded when no prior shift exists on the day.
pub const NO_PREVIOUS_SHIFT: &str = "No previous shift";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_min: i32,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no route data for {origin} -> {destination}")]
    NoRoute { origin: String, destination: String },

    #[error("route lookup timed out")]
    Timeout,
}

/// Driving-route collaborator. The only third-party call in the system;
/// callers wrap it in a timeout and absorb failures locally.
pub trait DistanceProvider: Send + Sync + 'static {
    fn route(
        &self,
        origin: &str,
        destination: &str,
    ) -> impl Future<Output = Result<RouteEstimate, ProviderError>>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteEntry {
    origin: String,
    destination: String,
    distance_km: f64,
    duration_min: i32,
}

/// File-backed route provider: a JSON list of
/// `{origin, destination, distanceKm, durationMin}` entries. Lookups fall
/// back to the reversed pair; a miss is a provider failure.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<(String, String), RouteEstimate>,
}

impl RouteTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let entries: Vec<RouteEntry> = serde_json::from_str(&raw)?;

        let mut table = Self::empty();
        for entry in entries {
            table.insert(
                &entry.origin,
                &entry.destination,
                RouteEstimate {
                    distance_km: entry.distance_km,
                    duration_min: entry.duration_min,
                },
            );
        }
        Ok(table)
    }

    /// Absent path means routing is not configured; every lookup will then
    /// surface as estimate-unavailable.
    pub fn from_config(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let table = Self::load(path)?;
                log::info!("Loaded {} routes from {}", table.len(), path);
                Ok(table)
            }
            None => {
                log::info!("No route table configured; travel estimates will be unavailable");
                Ok(Self::empty())
            }
        }
    }

    pub fn insert(&mut self, origin: &str, destination: &str, estimate: RouteEstimate) {
        self.routes.insert(
            (normalize_location(origin), normalize_location(destination)),
            estimate,
        );
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl DistanceProvider for RouteTable {
    async fn route(&self, origin: &str, destination: &str) -> Result<RouteEstimate, ProviderError> {
        let key = (normalize_location(origin), normalize_location(destination));
        if let Some(estimate) = self.routes.get(&key) {
            return Ok(estimate.clone());
        }
        // Driving distance is close enough to symmetric for a table lookup
        let reversed = (key.1, key.0);
        if let Some(estimate) = self.routes.get(&reversed) {
            return Ok(estimate.clone());
        }
        Err(ProviderError::NoRoute {
            origin: origin.to_string(),
            destination: destination.to_string(),
        })
    }
}

pub fn normalize_location(location: &str) -> String {
    location.trim().to_lowercase()
}

pub fn same_location(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

pub fn round_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

fn set_eq(a: &[Uuid], b: &[Uuid]) -> bool {
    let a: HashSet<&Uuid> = a.iter().collect();
    let b: HashSet<&Uuid> = b.iter().collect();
    a == b
}

/// Whether a same-day candidate belongs to the same assignee(s).
/// Individual shifts match on any shared staff id; team shifts only on
/// exactly equal team, supervisor and team-member sets.
pub fn matches_assignees(current: &ShiftDetail, candidate: &ShiftDetail) -> bool {
    match current.shift.assignment_type {
        AssignmentType::Individual => {
            let current_staff: HashSet<Uuid> = current.all_staff_ids().into_iter().collect();
            candidate
                .all_staff_ids()
                .iter()
                .any(|id| current_staff.contains(id))
        }
        AssignmentType::Team => {
            set_eq(&current.team_ids, &candidate.team_ids)
                && set_eq(&current.supervisor_ids, &candidate.supervisor_ids)
                && set_eq(&current.team_member_ids, &candidate.team_member_ids)
        }
    }
}

/// The closest preceding shift: matching assignees, ended no later than the
/// current shift starts, latest end time wins.
pub fn select_previous_shift<'a>(
    current: &ShiftDetail,
    pool: &'a [ShiftDetail],
) -> Option<&'a ShiftDetail> {
    pool.iter()
        .filter(|candidate| matches_assignees(current, candidate))
        .filter(|candidate| candidate.shift.end_time <= current.shift.start_time)
        .max_by_key(|candidate| candidate.shift.end_time)
}

/// Where the assignees travelled from, and what the trip cost. The
/// estimate-unavailable state replaces the source system's hardcoded
/// fallback distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TravelOutcome {
    NoPreviousShift,
    #[serde(rename_all = "camelCase")]
    Computed {
        from_location: String,
        distance_km: f64,
        duration_min: i32,
    },
    #[serde(rename_all = "camelCase")]
    EstimateUnavailable { from_location: Option<String> },
}

#[derive(Clone)]
pub struct TravelLinker<P: DistanceProvider> {
    shifts: ShiftRepository,
    locations: LocationRepository,
    provider: P,
    cache: Cache<(String, String), RouteEstimate>,
    timeout: Duration,
}

impl<P: DistanceProvider> TravelLinker<P> {
    pub fn new(
        shifts: ShiftRepository,
        locations: LocationRepository,
        provider: P,
        timeout: Duration,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            shifts,
            locations,
            provider,
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(cache_ttl)
                .build(),
            timeout,
        }
    }

    /// Locate the closest preceding shift for the same assignees on the
    /// same calendar day and compute the travel leg from its location.
    /// Results are persisted only once the shift's job has been started.
    pub async fn link(&self, shift_id: Uuid) -> Result<TravelOutcome, AppError> {
        let current = self
            .shifts
            .find_detail(shift_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

        let pool = self
            .shifts
            .find_same_day(current.shift.start_time.date(), shift_id)
            .await?;

        let outcome = match select_previous_shift(&current, &pool) {
            None => TravelOutcome::NoPreviousShift,
            Some(previous) => {
                let from = self.location_label(previous).await?;
                let to = self.location_label(&current).await?;
                self.estimate_leg(shift_id, from, to).await
            }
        };

        if current.shift.has_clocked_in() {
            match &outcome {
                TravelOutcome::NoPreviousShift => {
                    self.shifts
                        .set_travel(shift_id, None, None, Some(NO_PREVIOUS_SHIFT))
                        .await?;
                }
                TravelOutcome::Computed {
                    from_location,
                    distance_km,
                    duration_min,
                } => {
                    self.shifts
                        .set_travel(
                            shift_id,
                            Some(*distance_km),
                            Some(*duration_min),
                            Some(from_location),
                        )
                        .await?;
                }
                TravelOutcome::EstimateUnavailable { from_location } => {
                    self.shifts
                        .set_travel(shift_id, None, None, from_location.as_deref())
                        .await?;
                }
            }
        }

        Ok(outcome)
    }

    async fn estimate_leg(
        &self,
        shift_id: Uuid,
        from: Option<String>,
        to: Option<String>,
    ) -> TravelOutcome {
        let (Some(from), Some(to)) = (from, to) else {
            return TravelOutcome::EstimateUnavailable {
                from_location: None,
            };
        };

        if same_location(&from, &to) {
            return TravelOutcome::Computed {
                from_location: from,
                distance_km: 0.0,
                duration_min: 0,
            };
        }

        match self.route_cached(&from, &to).await {
            Ok(estimate) => TravelOutcome::Computed {
                from_location: from,
                distance_km: round_km(estimate.distance_km),
                duration_min: estimate.duration_min,
            },
            Err(err) => {
                log::warn!("Travel estimate unavailable for shift {}: {}", shift_id, err);
                TravelOutcome::EstimateUnavailable {
                    from_location: Some(from),
                }
            }
        }
    }

    async fn route_cached(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<RouteEstimate, ProviderError> {
        let key = (normalize_location(origin), normalize_location(destination));
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let estimate =
            match tokio::time::timeout(self.timeout, self.provider.route(origin, destination))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(ProviderError::Timeout),
            };

        self.cache.insert(key, estimate.clone()).await;
        Ok(estimate)
    }

    async fn location_label(&self, detail: &ShiftDetail) -> Result<Option<String>, AppError> {
        let Some(&location_id) = detail.location_ids.first() else {
            return Ok(None);
        };
        let location = self.locations.find_by_id(location_id).await?;
        Ok(location.map(|l| l.label().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{
        AssignmentRole, JobStatus, PauseLog, Shift, ShiftTheme, StaffLink,
    };
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;
    use sqlx::types::Json;
    use std::io::Write;

    fn at(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn shift_between(start: NaiveDateTime, end: NaiveDateTime) -> Shift {
        Shift {
            id: Uuid::new_v4(),
            title: "Site clean".to_string(),
            start_time: start,
            end_time: end,
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
            created_at: at(0, 0),
            updated_at: at(0, 0),
        }
    }

    fn individual_detail(staff: &[Uuid], start: NaiveDateTime, end: NaiveDateTime) -> ShiftDetail {
        let links = staff
            .iter()
            .map(|&staff_id| StaffLink {
                staff_id,
                role: AssignmentRole::Assigned,
            })
            .collect();
        ShiftDetail::new(shift_between(start, end), links, vec![], vec![], vec![])
    }

    fn team_detail(
        teams: &[Uuid],
        supervisors: &[Uuid],
        members: &[Uuid],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> ShiftDetail {
        let mut shift = shift_between(start, end);
        shift.assignment_type = AssignmentType::Team;
        let mut links: Vec<StaffLink> = supervisors
            .iter()
            .map(|&staff_id| StaffLink {
                staff_id,
                role: AssignmentRole::Supervisor,
            })
            .collect();
        links.extend(members.iter().map(|&staff_id| StaffLink {
            staff_id,
            role: AssignmentRole::TeamMember,
        }));
        ShiftDetail::new(shift, links, teams.to_vec(), vec![], vec![])
    }

    #[test]
    fn individual_match_picks_the_closest_preceding_shift() {
        let worker = Uuid::new_v4();
        let other = Uuid::new_v4();

        let current = individual_detail(&[worker], at(13, 0), at(16, 0));
        let morning = individual_detail(&[worker], at(9, 0), at(12, 0));
        let earlier = individual_detail(&[worker], at(6, 0), at(8, 0));
        let someone_else = individual_detail(&[other], at(10, 0), at(12, 30));

        let pool = vec![earlier.clone(), someone_else, morning.clone()];
        let picked = select_previous_shift(&current, &pool).unwrap();
        assert_eq!(picked.shift.id, morning.shift.id);
    }

    #[test]
    fn candidates_that_end_after_the_start_are_ignored() {
        let worker = Uuid::new_v4();
        let current = individual_detail(&[worker], at(13, 0), at(16, 0));
        let overlapping = individual_detail(&[worker], at(11, 0), at(14, 0));

        assert!(select_previous_shift(&current, &[overlapping]).is_none());
    }

    #[test]
    fn a_shift_ending_exactly_at_the_start_still_counts() {
        let worker = Uuid::new_v4();
        let current = individual_detail(&[worker], at(13, 0), at(16, 0));
        let back_to_back = individual_detail(&[worker], at(10, 0), at(13, 0));

        assert!(select_previous_shift(&current, &[back_to_back]).is_some());
    }

    #[test]
    fn team_match_requires_exactly_equal_sets() {
        let team = Uuid::new_v4();
        let supervisor = Uuid::new_v4();
        let member_a = Uuid::new_v4();
        let member_b = Uuid::new_v4();

        let current = team_detail(
            &[team],
            &[supervisor],
            &[member_a, member_b],
            at(13, 0),
            at(16, 0),
        );

        // Same sets in a different order match
        let same_crew = team_detail(
            &[team],
            &[supervisor],
            &[member_b, member_a],
            at(9, 0),
            at(12, 0),
        );
        assert!(matches_assignees(&current, &same_crew));

        // A missing member breaks the match even with overlap
        let short_crew = team_detail(&[team], &[supervisor], &[member_a], at(9, 0), at(12, 0));
        assert!(!matches_assignees(&current, &short_crew));

        // Supervisors and team members are not interchangeable
        let swapped_roles = team_detail(
            &[team],
            &[member_a],
            &[supervisor, member_b],
            at(9, 0),
            at(12, 0),
        );
        assert!(!matches_assignees(&current, &swapped_roles));
    }

    #[test]
    fn location_comparison_ignores_case_and_padding() {
        assert!(same_location("12 Harbour St", "  12 harbour st "));
        assert!(!same_location("12 Harbour St", "14 Harbour St"));
    }

    #[test]
    fn distances_round_to_one_decimal() {
        assert_eq!(round_km(4.26), 4.3);
        assert_eq!(round_km(4.24), 4.2);
        assert_eq!(round_km(0.0), 0.0);
    }

    #[tokio::test]
    async fn route_table_looks_up_both_directions() {
        let mut table = RouteTable::empty();
        table.insert(
            "Depot",
            "Harbour Tower",
            RouteEstimate {
                distance_km: 7.4,
                duration_min: 14,
            },
        );

        let forward = table.route("depot", "HARBOUR TOWER").await.unwrap();
        assert_eq!(forward.distance_km, 7.4);

        let reverse = table.route("Harbour Tower", "Depot").await.unwrap();
        assert_eq!(reverse.duration_min, 14);

        let miss = table.route("Depot", "Nowhere").await;
        assert!(miss.is_err());
    }

    #[tokio::test]
    async fn route_table_loads_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"origin": "Depot", "destination": "Mill Lane", "distanceKm": 3.2, "durationMin": 9}}]"#
        )
        .unwrap();

        let table = RouteTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 1);

        let estimate = table.route("depot", "mill lane").await.unwrap();
        assert_eq!(estimate.duration_min, 9);
    }

    #[test]
    fn missing_route_table_config_yields_an_empty_table() {
        let table = RouteTable::from_config(None).unwrap();
        assert!(table.is_empty());
    }

    fn linker_with(table: RouteTable) -> TravelLinker<RouteTable> {
        // connect_lazy performs no I/O; these tests never touch the store
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost:5432/cleancrew_test").unwrap();
        TravelLinker::new(
            ShiftRepository::new(pool.clone()),
            LocationRepository::new(pool),
            table,
            Duration::from_secs(1),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn identical_locations_cost_nothing() {
        let linker = linker_with(RouteTable::empty());

        let outcome = linker
            .estimate_leg(
                Uuid::new_v4(),
                Some("12 Harbour St".to_string()),
                Some("  12 HARBOUR ST ".to_string()),
            )
            .await;

        assert_eq!(
            outcome,
            TravelOutcome::Computed {
                from_location: "12 Harbour St".to_string(),
                distance_km: 0.0,
                duration_min: 0,
            }
        );
    }

    #[tokio::test]
    async fn provider_success_rounds_the_distance() {
        let mut table = RouteTable::empty();
        table.insert(
            "Depot",
            "Mill Lane",
            RouteEstimate {
                distance_km: 4.26,
                duration_min: 13,
            },
        );
        let linker = linker_with(table);

        let outcome = linker
            .estimate_leg(
                Uuid::new_v4(),
                Some("Depot".to_string()),
                Some("Mill Lane".to_string()),
            )
            .await;

        assert_eq!(
            outcome,
            TravelOutcome::Computed {
                from_location: "Depot".to_string(),
                distance_km: 4.3,
                duration_min: 13,
            }
        );
    }

    #[tokio::test]
    async fn provider_miss_is_an_unavailable_estimate() {
        let linker = linker_with(RouteTable::empty());

        let outcome = linker
            .estimate_leg(
                Uuid::new_v4(),
                Some("Depot".to_string()),
                Some("Mill Lane".to_string()),
            )
            .await;

        assert_eq!(
            outcome,
            TravelOutcome::EstimateUnavailable {
                from_location: Some("Depot".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn unresolved_locations_are_unavailable_without_a_provider_call() {
        let linker = linker_with(RouteTable::empty());

        let outcome = linker
            .estimate_leg(Uuid::new_v4(), None, Some("Depot".to_string()))
            .await;

        assert_eq!(
            outcome,
            TravelOutcome::EstimateUnavailable {
                from_location: None,
            }
        );
    }
}
