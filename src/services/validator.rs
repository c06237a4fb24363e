use std::collections::HashSet;

use uuid::Uuid;

use crate::database::models::ShiftInput;
use crate::database::repositories::{
    ClientRepository, LocationRepository, StaffRepository, TeamRepository,
};
use crate::error::AppError;

/// The id sets a shift-creation request references, borrowed from the input.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentRefs<'a> {
    pub staff_ids: &'a [Uuid],
    pub supervisor_ids: &'a [Uuid],
    pub team_member_ids: &'a [Uuid],
    pub client_ids: &'a [Uuid],
    pub team_ids: &'a [Uuid],
    pub location_ids: &'a [Uuid],
}

impl<'a> From<&'a ShiftInput> for AssignmentRefs<'a> {
    fn from(input: &'a ShiftInput) -> Self {
        AssignmentRefs {
            staff_ids: &input.staff_ids,
            supervisor_ids: &input.supervisor_ids,
            team_member_ids: &input.team_member_ids,
            client_ids: &input.client_ids,
            team_ids: &input.team_ids,
            location_ids: &input.location_ids,
        }
    }
}

/// Accumulates unknown ids per category for one aggregated error message.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MissingIds {
    categories: Vec<(&'static str, Vec<Uuid>)>,
}

impl MissingIds {
    pub fn record(&mut self, label: &'static str, ids: Vec<Uuid>) {
        if !ids.is_empty() {
            self.categories.push((label, ids));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn message(&self) -> String {
        self.categories
            .iter()
            .map(|(label, ids)| {
                let list = ids
                    .iter()
                    .map(Uuid::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Invalid {} IDs: {}", label, list)
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Requested ids that the store does not know, deduplicated, in request order.
pub fn missing_from(requested: &[Uuid], existing: &HashSet<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    requested
        .iter()
        .filter(|&&id| !existing.contains(&id) && seen.insert(id))
        .copied()
        .collect()
}

/// Referential-integrity gate for shift creation: one existence lookup per
/// non-empty id set, no side effects. The caller writes only after this
/// passes, so a failed category never leaves partial relation rows.
#[derive(Clone)]
pub struct AssignmentValidator {
    staff: StaffRepository,
    clients: ClientRepository,
    teams: TeamRepository,
    locations: LocationRepository,
}

impl AssignmentValidator {
    pub fn new(
        staff: StaffRepository,
        clients: ClientRepository,
        teams: TeamRepository,
        locations: LocationRepository,
    ) -> Self {
        Self {
            staff,
            clients,
            teams,
            locations,
        }
    }

    pub async fn validate(&self, refs: AssignmentRefs<'_>) -> Result<(), AppError> {
        let mut missing = MissingIds::default();

        if !refs.staff_ids.is_empty() {
            let existing = self.staff.existing_ids(refs.staff_ids).await?;
            missing.record("staff", missing_from(refs.staff_ids, &existing));
        }
        if !refs.supervisor_ids.is_empty() {
            let existing = self.staff.existing_ids(refs.supervisor_ids).await?;
            missing.record("supervisor", missing_from(refs.supervisor_ids, &existing));
        }
        if !refs.team_member_ids.is_empty() {
            let existing = self.staff.existing_ids(refs.team_member_ids).await?;
            missing.record("team member", missing_from(refs.team_member_ids, &existing));
        }
        if !refs.client_ids.is_empty() {
            let existing = self.clients.existing_ids(refs.client_ids).await?;
            missing.record("client", missing_from(refs.client_ids, &existing));
        }
        if !refs.team_ids.is_empty() {
            let existing = self.teams.existing_ids(refs.team_ids).await?;
            missing.record("team", missing_from(refs.team_ids, &existing));
        }
        if !refs.location_ids.is_empty() {
            let existing = self.locations.existing_ids(refs.location_ids).await?;
            missing.record("location", missing_from(refs.location_ids, &existing));
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(missing.message()))
        }
    }
}
