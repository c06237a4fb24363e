use uuid::Uuid;

use crate::database::models::Shift;
use crate::database::repositories::{ShiftRepository, StaffRepository};
use crate::error::AppError;

/// Name of the sentinel staff record that cancelled shifts fall back to.
pub const COVER_STAFF_NAME: &str = "Cover";

/// Cancelling a shift strips its staff and team assignments and hands it
/// to the cover sentinel. Destructive: the prior rows are deleted.
#[derive(Clone)]
pub struct CancellationHandler {
    shifts: ShiftRepository,
    staff: StaffRepository,
}

impl CancellationHandler {
    pub fn new(shifts: ShiftRepository, staff: StaffRepository) -> Self {
        Self { shifts, staff }
    }

    pub async fn cancel(&self, shift_id: Uuid) -> Result<Shift, AppError> {
        if self.shifts.find_by_id(shift_id).await?.is_none() {
            return Err(AppError::NotFound("Shift not found".to_string()));
        }

        // The sentinel must exist before anything is deleted
        let cover = self
            .staff
            .find_by_name(COVER_STAFF_NAME)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Cover staff record \"{}\" not found",
                    COVER_STAFF_NAME
                ))
            })?;

        let cancelled = self
            .shifts
            .replace_assignments_with(shift_id, cover.id)
            .await?;

        log::info!(
            "Shift {} cancelled; assignments replaced with cover staff {}",
            shift_id,
            cover.id
        );

        Ok(cancelled)
    }
}
