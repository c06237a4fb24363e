use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{LocationInput, ShiftDetail, ShiftInput};
use crate::database::repositories::{LocationRepository, ShiftRepository};
use crate::error::AppError;
use crate::services::validator::{AssignmentRefs, AssignmentValidator};

/// User action projecting a template shift into future occurrences.
/// Transient; consumed whole, never stored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRequest {
    pub selected_weekdays: Vec<String>,
    /// End-of-day inclusive bound for generated occurrences.
    pub close_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceFailure {
    pub date: NaiveDate,
    pub error: String,
}

/// Partial-failure report for one generation batch. Individual failures
/// never abort the batch and there is no automatic retry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceReport {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub created: Vec<Uuid>,
    pub failures: Vec<RecurrenceFailure>,
}

impl RecurrenceReport {
    pub fn all_failed(&self) -> bool {
        self.requested > 0 && self.succeeded == 0
    }
}

/// Parse weekday names ("Monday", "mon", any casing), deduplicating while
/// keeping selection order.
pub fn parse_weekdays(names: &[String]) -> Result<Vec<Weekday>, String> {
    let mut weekdays = Vec::new();
    let mut invalid = Vec::new();
    for name in names {
        match name.trim().parse::<Weekday>() {
            Ok(day) => {
                if !weekdays.contains(&day) {
                    weekdays.push(day);
                }
            }
            Err(_) => invalid.push(name.as_str()),
        }
    }

    if invalid.is_empty() {
        Ok(weekdays)
    } else {
        Err(format!("Invalid weekdays: {}", invalid.join(", ")))
    }
}

/// All occurrence dates for the selected weekdays: per weekday, the first
/// date strictly after the template's date with that weekday, then every
/// 7 days while still on or before the close date. Union, ascending.
pub fn occurrence_dates(
    template_date: NaiveDate,
    weekdays: &[Weekday],
    close_date: NaiveDate,
) -> Vec<NaiveDate> {
    let mut dates = BTreeSet::new();

    for &weekday in weekdays {
        let mut current = template_date;
        loop {
            current = match current.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => return dates.into_iter().collect(),
            };
            if current.weekday() == weekday {
                break;
            }
        }

        while current <= close_date {
            dates.insert(current);
            current = match current.checked_add_days(Days::new(7)) {
                Some(next) => next,
                None => break,
            };
        }
    }

    dates.into_iter().collect()
}

/// Projects one template shift into N independent creation requests, each
/// passing through assignment validation and location resolution. The
/// fan-out runs through a bounded worker pool rather than an unbounded
/// burst of concurrent writes.
#[derive(Clone)]
pub struct RecurrenceGenerator {
    shifts: ShiftRepository,
    locations: LocationRepository,
    validator: AssignmentValidator,
    concurrency: usize,
}

impl RecurrenceGenerator {
    pub fn new(
        shifts: ShiftRepository,
        locations: LocationRepository,
        validator: AssignmentValidator,
        concurrency: usize,
    ) -> Self {
        Self {
            shifts,
            locations,
            validator,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn generate(
        &self,
        template_id: Uuid,
        request: &RecurrenceRequest,
    ) -> Result<RecurrenceReport, AppError> {
        let template = self
            .shifts
            .find_detail(template_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Template shift not found".to_string()))?;

        if request.selected_weekdays.is_empty() {
            return Err(AppError::Validation(
                "At least one weekday must be selected".to_string(),
            ));
        }
        let weekdays = parse_weekdays(&request.selected_weekdays).map_err(AppError::Validation)?;

        let dates = occurrence_dates(
            template.shift.start_time.date(),
            &weekdays,
            request.close_date,
        );
        if dates.is_empty() {
            return Err(AppError::Validation(
                "No valid dates fall before the close date".to_string(),
            ));
        }

        // The dedup key of the template's location, cloned into each
        // occurrence after its own find-or-create resolution.
        let template_location = self.template_location(&template).await?;

        let requested = dates.len();
        log::info!(
            "Generating {} recurring shifts from template {}",
            requested,
            template_id
        );

        let results: Vec<Result<Uuid, RecurrenceFailure>> = stream::iter(dates)
            .map(|date| self.create_occurrence(&template, template_location.as_ref(), date))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut created = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(id) => created.push(id),
                Err(failure) => failures.push(failure),
            }
        }
        failures.sort_by_key(|f| f.date);

        let report = RecurrenceReport {
            requested,
            succeeded: created.len(),
            failed: failures.len(),
            created,
            failures,
        };

        if report.failed > 0 {
            log::warn!(
                "Recurrence batch for template {}: {} of {} instances failed",
                template_id,
                report.failed,
                report.requested
            );
        }

        Ok(report)
    }

    async fn template_location(
        &self,
        template: &ShiftDetail,
    ) -> Result<Option<LocationInput>, AppError> {
        if !template.shift.include_location {
            return Ok(None);
        }
        let Some(&location_id) = template.location_ids.first() else {
            return Ok(None);
        };
        let location = self.locations.find_by_id(location_id).await?;
        Ok(location.map(|l| LocationInput {
            unit: l.unit,
            name: l.name,
            address: l.address,
        }))
    }

    async fn create_occurrence(
        &self,
        template: &ShiftDetail,
        location: Option<&LocationInput>,
        date: NaiveDate,
    ) -> Result<Uuid, RecurrenceFailure> {
        self.try_create(template, location, date)
            .await
            .map_err(|e| RecurrenceFailure {
                date,
                error: e.to_string(),
            })
    }

    async fn try_create(
        &self,
        template: &ShiftDetail,
        location: Option<&LocationInput>,
        date: NaiveDate,
    ) -> Result<Uuid, AppError> {
        let start_time = date.and_time(template.shift.start_time.time());
        let end_time = start_time + (template.shift.end_time - template.shift.start_time);

        // At most one location per generated instance, resolved by the
        // (unit, name) dedup key.
        let location_ids = match location {
            Some(input) => vec![self.locations.resolve(input).await?.id],
            None => Vec::new(),
        };

        let input = ShiftInput {
            title: template.shift.title.clone(),
            start_time,
            end_time,
            theme: Some(template.shift.theme),
            assignment_type: template.shift.assignment_type,
            is_published: template.shift.is_published,
            include_location: template.shift.include_location,
            shift_instructions: template.shift.shift_instructions.clone(),
            staff_ids: template.staff_ids.clone(),
            supervisor_ids: template.supervisor_ids.clone(),
            team_member_ids: template.team_member_ids.clone(),
            team_ids: template.team_ids.clone(),
            client_ids: template.client_ids.clone(),
            location_ids,
        };

        self.validator.validate(AssignmentRefs::from(&input)).await?;
        let created = self.shifts.create(&input).await?;
        Ok(created.shift.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn projects_selected_weekdays_until_the_close_date() {
        // Template on Wednesday 2024-01-03, Mondays + Wednesdays,
        // closing 2024-01-17 inclusive.
        let dates = occurrence_dates(
            date(2024, 1, 3),
            &[Weekday::Mon, Weekday::Wed],
            date(2024, 1, 17),
        );

        assert_eq!(
            dates,
            vec![
                date(2024, 1, 8),
                date(2024, 1, 10),
                date(2024, 1, 15),
                date(2024, 1, 17),
            ]
        );
    }

    #[test]
    fn first_occurrence_is_strictly_after_the_template_date() {
        // Template itself is a Wednesday; the same day never reappears.
        let dates = occurrence_dates(date(2024, 1, 3), &[Weekday::Wed], date(2024, 1, 10));
        assert_eq!(dates, vec![date(2024, 1, 10)]);
    }

    #[test]
    fn close_date_is_inclusive() {
        let dates = occurrence_dates(date(2024, 1, 3), &[Weekday::Thu], date(2024, 1, 4));
        assert_eq!(dates, vec![date(2024, 1, 4)]);
    }

    #[test]
    fn close_date_before_every_occurrence_yields_nothing() {
        let dates = occurrence_dates(date(2024, 1, 3), &[Weekday::Mon], date(2024, 1, 5));
        assert!(dates.is_empty());
    }

    #[test]
    fn overlapping_weekday_selections_union_without_duplicates() {
        let dates = occurrence_dates(
            date(2024, 1, 3),
            &[Weekday::Mon, Weekday::Mon, Weekday::Fri],
            date(2024, 1, 12),
        );
        assert_eq!(
            dates,
            vec![date(2024, 1, 5), date(2024, 1, 8), date(2024, 1, 12)]
        );
    }

    #[test]
    fn weekday_names_parse_loosely() {
        let parsed = parse_weekdays(&[
            "Monday".to_string(),
            "wednesday".to_string(),
            " FRI ".to_string(),
            "monday".to_string(),
        ])
        .unwrap();
        assert_eq!(parsed, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
    }

    #[test]
    fn unknown_weekday_names_are_reported() {
        let err = parse_weekdays(&["Monday".to_string(), "Funday".to_string()]).unwrap_err();
        assert_eq!(err, "Invalid weekdays: Funday");
    }
}
