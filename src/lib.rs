use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::Logger,
    web, App,
};

pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;

use backend::BackendClient;
use config::AppConfig;
use error::{AppError, ValidationError};
use services::in_flight::InFlightRegistry;
use session::SessionRegistry;

/// Shared handles registered as app data on every worker.
#[derive(Clone)]
pub struct AppState {
    pub config: web::Data<AppConfig>,
    pub backend: web::Data<BackendClient>,
    pub sessions: web::Data<SessionRegistry>,
    pub in_flight: web::Data<InFlightRegistry>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let backend = BackendClient::new(&config)?;
        Ok(Self {
            config: web::Data::new(config),
            backend: web::Data::new(backend),
            sessions: web::Data::new(SessionRegistry::new()),
            in_flight: web::Data::new(InFlightRegistry::new()),
        })
    }
}

pub fn create_app(
    state: &AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        AppError::from(ValidationError::MalformedBody(err.to_string())).into()
    });
    let query_config = web::QueryConfig::default().error_handler(|err, _req| {
        AppError::from(ValidationError::MalformedBody(err.to_string())).into()
    });

    App::new()
        .app_data(state.config.clone())
        .app_data(state.backend.clone())
        .app_data(state.sessions.clone())
        .app_data(state.in_flight.clone())
        .app_data(json_config)
        .app_data(query_config)
        .wrap(
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600),
        )
        .wrap(Logger::default())
        .route("/health", web::get().to(routes::health::health_check))
        .configure(routes::config)
}
