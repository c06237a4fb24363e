use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger, web};
use anyhow::Result;

use cleancrew_be::Config;
use cleancrew_be::database::{
    init_database,
    repositories::{
        ClientRepository, LocationRepository, ShiftRepository, StaffRepository, TeamRepository,
    },
};
use cleancrew_be::handlers::{admin, shifts};
use cleancrew_be::middleware::RequestId;
use cleancrew_be::services::{
    AssignmentValidator, CancellationHandler, RecurrenceGenerator, RouteTable, TimeTracker,
    TravelLinker,
};

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("CleanCrew Scheduling API v1.0")
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init();

    log::info!("Starting CleanCrew scheduling API...");

    // Load configuration
    let config = Config::from_env()?;
    log::info!(
        "Configuration loaded (environment: {})",
        config.environment
    );

    // Initialize database
    let pool = init_database(&config.database_url).await?;
    log::info!("Database initialized");

    // Initialize repositories
    let staff_repository = StaffRepository::new(pool.clone());
    let client_repository = ClientRepository::new(pool.clone());
    let team_repository = TeamRepository::new(pool.clone());
    let location_repository = LocationRepository::new(pool.clone());
    let shift_repository = ShiftRepository::new(pool.clone());

    // Initialize services
    let validator = AssignmentValidator::new(
        staff_repository.clone(),
        client_repository.clone(),
        team_repository.clone(),
        location_repository.clone(),
    );
    let time_tracker = TimeTracker::new(shift_repository.clone());
    let route_table = RouteTable::from_config(config.route_table_path.as_deref())?;
    let travel_linker = TravelLinker::new(
        shift_repository.clone(),
        location_repository.clone(),
        route_table,
        Duration::from_secs(config.travel_timeout_secs),
        Duration::from_secs(config.travel_cache_ttl_secs),
    );
    let recurrence_generator = RecurrenceGenerator::new(
        shift_repository.clone(),
        location_repository.clone(),
        validator.clone(),
        config.recurrence_concurrency,
    );
    let cancellation_handler =
        CancellationHandler::new(shift_repository.clone(), staff_repository.clone());

    let staff_repo_data = web::Data::new(staff_repository);
    let client_repo_data = web::Data::new(client_repository);
    let team_repo_data = web::Data::new(team_repository);
    let location_repo_data = web::Data::new(location_repository);
    let shift_repo_data = web::Data::new(shift_repository);
    let validator_data = web::Data::new(validator);
    let time_tracker_data = web::Data::new(time_tracker);
    let travel_linker_data = web::Data::new(travel_linker);
    let recurrence_data = web::Data::new(recurrence_generator);
    let cancellation_data = web::Data::new(cancellation_handler);
    let config_data = web::Data::new(config.clone());

    let server_address = config.server_address();
    log::info!("Server starting on http://{}", server_address);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(staff_repo_data.clone())
            .app_data(client_repo_data.clone())
            .app_data(team_repo_data.clone())
            .app_data(location_repo_data.clone())
            .app_data(shift_repo_data.clone())
            .app_data(validator_data.clone())
            .app_data(time_tracker_data.clone())
            .app_data(travel_linker_data.clone())
            .app_data(recurrence_data.clone())
            .app_data(cancellation_data.clone())
            .app_data(config_data.clone())
            .wrap(
                Cors::default()
                    .allowed_origin(&config.client_base_url)
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        "Authorization",
                        "Content-Type",
                        "Accept",
                        "X-Requested-With",
                        "X-Request-ID",
                    ])
                    .max_age(3600),
            )
            .wrap(RequestId)
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T request_id=%{x-request-id}o"#,
            ))
            .service(hello)
            .service(health)
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/shifts")
                            .route("", web::post().to(shifts::create_shift))
                            .route("", web::get().to(shifts::get_shifts))
                            .route("/{id}", web::get().to(shifts::get_shift))
                            .route("/{id}", web::put().to(shifts::update_shift))
                            .route("/{id}", web::delete().to(shifts::delete_shift))
                            .route("/{id}/job/start", web::post().to(shifts::start_job))
                            .route("/{id}/job/pause", web::post().to(shifts::pause_job))
                            .route("/{id}/job/resume", web::post().to(shifts::resume_job))
                            .route("/{id}/job/end", web::post().to(shifts::end_job))
                            .route("/{id}/job/reset", web::post().to(shifts::reset_job))
                            .route("/{id}/timesheet", web::get().to(shifts::get_timesheet))
                            .route(
                                "/{id}/travel",
                                web::post().to(shifts::compute_travel::<RouteTable>),
                            )
                            .route("/{id}/recur", web::post().to(shifts::recur_shift))
                            .route("/{id}/cancel", web::post().to(shifts::cancel_shift)),
                    )
                    .service(
                        web::scope("/admin")
                            .route("/staff", web::post().to(admin::create_staff))
                            .route("/staff", web::get().to(admin::get_all_staff))
                            .route("/staff/{id}", web::get().to(admin::get_staff))
                            .route("/staff/{id}", web::put().to(admin::update_staff))
                            .route("/staff/{id}", web::delete().to(admin::delete_staff))
                            .route("/clients", web::post().to(admin::create_client))
                            .route("/clients", web::get().to(admin::get_clients))
                            .route("/clients/{id}", web::get().to(admin::get_client))
                            .route("/clients/{id}", web::put().to(admin::update_client))
                            .route("/clients/{id}", web::delete().to(admin::delete_client))
                            .route("/teams", web::post().to(admin::create_team))
                            .route("/teams", web::get().to(admin::get_teams))
                            .route("/teams/{id}", web::get().to(admin::get_team))
                            .route("/teams/{id}", web::put().to(admin::update_team))
                            .route("/teams/{id}", web::delete().to(admin::delete_team))
                            .route("/locations", web::post().to(admin::create_location))
                            .route("/locations", web::get().to(admin::get_locations))
                            .route("/locations/{id}", web::get().to(admin::get_location))
                            .route("/locations/{id}", web::put().to(admin::update_location))
                            .route("/locations/{id}", web::delete().to(admin::delete_location)),
                    ),
            )
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
