use actix_web::HttpServer;
use env_logger::Env;

use localguide_web::{config::AppConfig, create_app, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let state = AppState::new(config.clone())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    log::info!("Forwarding to booking service at {}", config.backend_url);
    log::info!("Attempting to bind to {}:{}", config.host, config.port);

    let app_state = state.clone();
    HttpServer::new(move || create_app(&app_state))
        .bind((config.host.as_str(), config.port))?
        .run()
        .await?;

    // stop every notification poller before the runtime goes away
    state.sessions.clear();
    log::info!("Server stopped");
    Ok(())
}
