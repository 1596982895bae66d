use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    backend::BackendClient,
    config::AppConfig,
    error::AppError,
    middleware::{auth::Role, auth_context::AuthenticatedUser},
    models::notification::NotificationState,
    routes::respond,
    session::{Session, SessionRegistry},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

pub async fn start_session(
    user: AuthenticatedUser,
    backend: web::Data<BackendClient>,
    sessions: web::Data<SessionRegistry>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    let session = Session::start(
        user.token.clone(),
        user.user_id.clone(),
        backend.into_inner(),
        config.notification_poll_interval,
        user.remaining_lifetime(),
    );
    sessions.insert(session);

    respond(
        "Session started",
        SessionInfo {
            user_id: user.user_id,
            email: user.email,
            role: user.role,
        },
    )
}

pub async fn end_session(
    user: AuthenticatedUser,
    sessions: web::Data<SessionRegistry>,
) -> HttpResponse {
    let ended = sessions.remove(&user.token);
    respond(
        if ended {
            "Session ended"
        } else {
            "No active session"
        },
        serde_json::json!({ "ended": ended }),
    )
}

pub async fn list_notifications(
    user: AuthenticatedUser,
    backend: web::Data<BackendClient>,
    query: web::Query<NotificationQuery>,
) -> Result<HttpResponse, AppError> {
    let notifications = backend
        .notifications(&user.token, query.unread_only)
        .await?;
    Ok(respond("Notifications retrieved", notifications))
}

/// Served from the session cache once the poller has filled it.
pub async fn unread_count(
    user: AuthenticatedUser,
    backend: web::Data<BackendClient>,
    sessions: web::Data<SessionRegistry>,
) -> Result<HttpResponse, AppError> {
    let state = match sessions.get(&user.token) {
        Some(session) => {
            let cached = session.notification_state().await;
            if cached.last_refreshed.is_some() {
                cached
            } else {
                session.refresh(backend.get_ref()).await?;
                session.notification_state().await
            }
        }
        None => NotificationState {
            unread_count: backend.unread_notification_count(&user.token).await?,
            last_refreshed: Some(Utc::now()),
        },
    };
    Ok(respond("Unread count retrieved", state))
}

pub async fn mark_read(
    user: AuthenticatedUser,
    backend: web::Data<BackendClient>,
    sessions: web::Data<SessionRegistry>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let notification = backend
        .mark_notification_read(&user.token, &path.into_inner())
        .await?;

    if let Some(session) = sessions.get(&user.token) {
        if let Err(e) = session.refresh(backend.get_ref()).await {
            log::warn!("Unread count refresh after mark-read failed: {}", e);
        }
    }

    Ok(respond("Notification marked as read", notification))
}
