use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::env;

use crate::{backend::BackendClient, session::SessionRegistry};

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
    active_sessions: usize,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

pub async fn health_check(
    backend: web::Data<BackendClient>,
    sessions: web::Data<SessionRegistry>,
) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: sessions.len(),
    };

    let backend_result = check_backend(&backend).await;
    if backend_result.status != "ok" {
        health.status = "degraded".to_string();
    }
    health
        .services
        .insert("marketplace_api".to_string(), backend_result);

    HttpResponse::Ok().json(health)
}

async fn check_backend(backend: &BackendClient) -> ServiceStatus {
    match backend.ping().await {
        Ok(status) => ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!(
                "{} answered with {}",
                backend.base_url(),
                status
            )),
        },
        Err(e) => {
            log::warn!("Marketplace API health check failed: {}", e);
            ServiceStatus {
                status: "error".to_string(),
                details: Some(e.to_string()),
            }
        }
    }
}
