use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::database::models::{ClientInput, LocationInput, StaffInput, TeamInput};
use crate::database::repositories::{
    ClientRepository, LocationRepository, StaffRepository, TeamRepository,
};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;

// Staff handlers

pub async fn create_staff(
    input: web::Json<StaffInput>,
    staff: web::Data<StaffRepository>,
) -> Result<HttpResponse, AppError> {
    let created = staff.create(input.into_inner()).await?;
    Ok(ApiResponse::created(created))
}

pub async fn get_all_staff(staff: web::Data<StaffRepository>) -> Result<HttpResponse, AppError> {
    let found = staff.find_all().await?;
    Ok(ApiResponse::success(found))
}

pub async fn get_staff(
    path: web::Path<Uuid>,
    staff: web::Data<StaffRepository>,
) -> Result<HttpResponse, AppError> {
    let found = staff
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Staff member not found".to_string()))?;
    Ok(ApiResponse::success(found))
}

pub async fn update_staff(
    path: web::Path<Uuid>,
    input: web::Json<StaffInput>,
    staff: web::Data<StaffRepository>,
) -> Result<HttpResponse, AppError> {
    let updated = staff
        .update(path.into_inner(), input.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Staff member not found".to_string()))?;
    Ok(ApiResponse::success(updated))
}

pub async fn delete_staff(
    path: web::Path<Uuid>,
    staff: web::Data<StaffRepository>,
) -> Result<HttpResponse, AppError> {
    if !staff.delete(path.into_inner()).await? {
        return Err(AppError::NotFound("Staff member not found".to_string()));
    }
    Ok(ApiResponse::success_message(
        "Staff member deleted successfully",
    ))
}

// Client handlers

pub async fn create_client(
    input: web::Json<ClientInput>,
    clients: web::Data<ClientRepository>,
) -> Result<HttpResponse, AppError> {
    let created = clients.create(input.into_inner()).await?;
    Ok(ApiResponse::created(created))
}

pub async fn get_clients(clients: web::Data<ClientRepository>) -> Result<HttpResponse, AppError> {
    let found = clients.find_all().await?;
    Ok(ApiResponse::success(found))
}

pub async fn get_client(
    path: web::Path<Uuid>,
    clients: web::Data<ClientRepository>,
) -> Result<HttpResponse, AppError> {
    let found = clients
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    Ok(ApiResponse::success(found))
}

pub async fn update_client(
    path: web::Path<Uuid>,
    input: web::Json<ClientInput>,
    clients: web::Data<ClientRepository>,
) -> Result<HttpResponse, AppError> {
    let updated = clients
        .update(path.into_inner(), input.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    Ok(ApiResponse::success(updated))
}

pub async fn delete_client(
    path: web::Path<Uuid>,
    clients: web::Data<ClientRepository>,
) -> Result<HttpResponse, AppError> {
    if !clients.delete(path.into_inner()).await? {
        return Err(AppError::NotFound("Client not found".to_string()));
    }
    Ok(ApiResponse::success_message("Client deleted successfully"))
}

// Team handlers

pub async fn create_team(
    input: web::Json<TeamInput>,
    teams: web::Data<TeamRepository>,
) -> Result<HttpResponse, AppError> {
    let created = teams.create(input.into_inner()).await?;
    Ok(ApiResponse::created(created))
}

pub async fn get_teams(teams: web::Data<TeamRepository>) -> Result<HttpResponse, AppError> {
    let found = teams.find_all().await?;
    Ok(ApiResponse::success(found))
}

pub async fn get_team(
    path: web::Path<Uuid>,
    teams: web::Data<TeamRepository>,
) -> Result<HttpResponse, AppError> {
    let found = teams
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;
    Ok(ApiResponse::success(found))
}

pub async fn update_team(
    path: web::Path<Uuid>,
    input: web::Json<TeamInput>,
    teams: web::Data<TeamRepository>,
) -> Result<HttpResponse, AppError> {
    let updated = teams
        .update(path.into_inner(), input.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;
    Ok(ApiResponse::success(updated))
}

pub async fn delete_team(
    path: web::Path<Uuid>,
    teams: web::Data<TeamRepository>,
) -> Result<HttpResponse, AppError> {
    if !teams.delete(path.into_inner()).await? {
        return Err(AppError::NotFound("Team not found".to_string()));
    }
    Ok(ApiResponse::success_message("Team deleted successfully"))
}

// Location handlers

pub async fn create_location(
    input: web::Json<LocationInput>,
    locations: web::Data<LocationRepository>,
) -> Result<HttpResponse, AppError> {
    // A (unit, name) duplicate surfaces as a conflict via the error layer
    let created = locations.create(input.into_inner()).await?;
    Ok(ApiResponse::created(created))
}

pub async fn get_locations(
    locations: web::Data<LocationRepository>,
) -> Result<HttpResponse, AppError> {
    let found = locations.find_all().await?;
    Ok(ApiResponse::success(found))
}

pub async fn get_location(
    path: web::Path<Uuid>,
    locations: web::Data<LocationRepository>,
) -> Result<HttpResponse, AppError> {
    let found = locations
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Location not found".to_string()))?;
    Ok(ApiResponse::success(found))
}

pub async fn update_location(
    path: web::Path<Uuid>,
    input: web::Json<LocationInput>,
    locations: web::Data<LocationRepository>,
) -> Result<HttpResponse, AppError> {
    let updated = locations
        .update(path.into_inner(), input.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Location not found".to_string()))?;
    Ok(ApiResponse::success(updated))
}

pub async fn delete_location(
    path: web::Path<Uuid>,
    locations: web::Data<LocationRepository>,
) -> Result<HttpResponse, AppError> {
    if !locations.delete(path.into_inner()).await? {
        return Err(AppError::NotFound("Location not found".to_string()));
    }
    Ok(ApiResponse::success_message("Location deleted successfully"))
}
