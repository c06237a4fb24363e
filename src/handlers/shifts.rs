use actix_web::{HttpResponse, web};
use chrono::NaiveDateTime;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{ShiftInput, ShiftUpdateInput};
use crate::database::repositories::ShiftRepository;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::recurrence::{RecurrenceGenerator, RecurrenceRequest};
use crate::services::time_tracker::{JobTransition, TimeTracker};
use crate::services::travel::{DistanceProvider, TravelLinker};
use crate::services::validator::{AssignmentRefs, AssignmentValidator};
use crate::services::CancellationHandler;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRangeQuery {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

pub async fn create_shift(
    input: web::Json<ShiftInput>,
    shifts: web::Data<ShiftRepository>,
    validator: web::Data<AssignmentValidator>,
) -> Result<HttpResponse, AppError> {
    let input = input.into_inner();

    if input.start_time >= input.end_time {
        return Err(AppError::Validation(
            "startTime must be before endTime".to_string(),
        ));
    }

    // Referential integrity first; the transactional create runs only
    // after every referenced id checks out
    validator.validate(AssignmentRefs::from(&input)).await?;

    let shift = shifts.create(&input).await?;

    log::info!(
        "Shift {} created ({} - {})",
        shift.shift.id,
        shift.shift.start_time,
        shift.shift.end_time
    );

    Ok(ApiResponse::created(shift))
}

pub async fn get_shifts(
    query: web::Query<ShiftRangeQuery>,
    shifts: web::Data<ShiftRepository>,
) -> Result<HttpResponse, AppError> {
    let found = shifts.find_by_range(query.from, query.to).await?;
    Ok(ApiResponse::success(found))
}

pub async fn get_shift(
    path: web::Path<Uuid>,
    shifts: web::Data<ShiftRepository>,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();

    let shift = shifts
        .find_detail(shift_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

    Ok(ApiResponse::success(shift))
}

pub async fn update_shift(
    path: web::Path<Uuid>,
    input: web::Json<ShiftUpdateInput>,
    shifts: web::Data<ShiftRepository>,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();
    let input = input.into_inner();

    if input.start_time >= input.end_time {
        return Err(AppError::Validation(
            "startTime must be before endTime".to_string(),
        ));
    }

    let existing = shifts
        .find_by_id(shift_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

    // The assignment type is frozen once any assignment row exists
    if input.assignment_type != existing.assignment_type && shifts.has_assignments(shift_id).await?
    {
        return Err(AppError::Validation(
            "Assignment type cannot change once the shift has assignments".to_string(),
        ));
    }

    let updated = shifts
        .update(shift_id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))?;

    Ok(ApiResponse::success(updated))
}

pub async fn delete_shift(
    path: web::Path<Uuid>,
    shifts: web::Data<ShiftRepository>,
) -> Result<HttpResponse, AppError> {
    let shift_id = path.into_inner();

    if !shifts.delete(shift_id).await? {
        return Err(AppError::NotFound("Shift not found".to_string()));
    }

    Ok(ApiResponse::success_message("Shift deleted successfully"))
}

// Job-lifecycle transitions

pub async fn start_job(
    path: web::Path<Uuid>,
    tracker: web::Data<TimeTracker>,
) -> Result<HttpResponse, AppError> {
    let shift = tracker
        .transition(path.into_inner(), JobTransition::Start)
        .await?;
    Ok(ApiResponse::success(shift))
}

pub async fn pause_job(
    path: web::Path<Uuid>,
    tracker: web::Data<TimeTracker>,
) -> Result<HttpResponse, AppError> {
    let shift = tracker
        .transition(path.into_inner(), JobTransition::Pause)
        .await?;
    Ok(ApiResponse::success(shift))
}

pub async fn resume_job(
    path: web::Path<Uuid>,
    tracker: web::Data<TimeTracker>,
) -> Result<HttpResponse, AppError> {
    let shift = tracker
        .transition(path.into_inner(), JobTransition::Resume)
        .await?;
    Ok(ApiResponse::success(shift))
}

pub async fn end_job(
    path: web::Path<Uuid>,
    tracker: web::Data<TimeTracker>,
) -> Result<HttpResponse, AppError> {
    let shift = tracker
        .transition(path.into_inner(), JobTransition::End)
        .await?;
    Ok(ApiResponse::success(shift))
}

pub async fn reset_job(
    path: web::Path<Uuid>,
    tracker: web::Data<TimeTracker>,
) -> Result<HttpResponse, AppError> {
    let shift = tracker
        .transition(path.into_inner(), JobTransition::Reset)
        .await?;
    Ok(ApiResponse::success(shift))
}

pub async fn get_timesheet(
    path: web::Path<Uuid>,
    tracker: web::Data<TimeTracker>,
) -> Result<HttpResponse, AppError> {
    let timesheet = tracker.timesheet(path.into_inner()).await?;
    Ok(ApiResponse::success(timesheet))
}

pub async fn compute_travel<P: DistanceProvider>(
    path: web::Path<Uuid>,
    linker: web::Data<TravelLinker<P>>,
) -> Result<HttpResponse, AppError> {
    let outcome = linker.link(path.into_inner()).await?;
    Ok(ApiResponse::success(outcome))
}

pub async fn recur_shift(
    path: web::Path<Uuid>,
    input: web::Json<RecurrenceRequest>,
    generator: web::Data<RecurrenceGenerator>,
) -> Result<HttpResponse, AppError> {
    let template_id = path.into_inner();

    let report = generator.generate(template_id, &input).await?;

    if report.all_failed() {
        log::error!(
            "Recurrence batch for template {} failed for all {} instances",
            template_id,
            report.requested
        );
        return Ok(HttpResponse::InternalServerError().json(ApiResponse::error_with_data(
            report,
            "Failed to generate recurring shifts",
        )));
    }

    Ok(ApiResponse::created(report))
}

pub async fn cancel_shift(
    path: web::Path<Uuid>,
    cancellation: web::Data<CancellationHandler>,
) -> Result<HttpResponse, AppError> {
    let shift = cancellation.cancel(path.into_inner()).await?;
    Ok(ApiResponse::success_with_message(
        shift,
        "Shift cancelled and reassigned to cover",
    ))
}
