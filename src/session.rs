use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use chrono::Utc;
use tokio::{
    sync::RwLock,
    task::JoinHandle,
    time::{interval, sleep_until, Instant, MissedTickBehavior},
};

use crate::{backend::BackendClient, error::AppError, models::notification::NotificationState};

/// Anything that can tell how many notifications are unread for a token.
pub trait NotificationSource: Send + Sync + 'static {
    fn unread_count(&self, token: &str) -> impl Future<Output = Result<u64, AppError>> + Send;
}

impl NotificationSource for BackendClient {
    async fn unread_count(&self, token: &str) -> Result<u64, AppError> {
        self.unread_notification_count(token).await
    }
}

/// One signed-in user: the bearer token, the cached notification state and
/// the background task keeping that state fresh.
#[derive(Debug)]
pub struct Session {
    token: String,
    user_id: String,
    state: Arc<RwLock<NotificationState>>,
    poller: JoinHandle<()>,
    stopped: AtomicBool,
    expires_at: Option<Instant>,
}

impl Session {
    /// Starts polling right away, then once per `every`. Polling stops on its
    /// own once `lifetime` has passed or the backend refuses the token.
    pub fn start<S: NotificationSource>(
        token: String,
        user_id: String,
        source: Arc<S>,
        every: Duration,
        lifetime: Option<Duration>,
    ) -> Self {
        let state = Arc::new(RwLock::new(NotificationState::default()));
        let expires_at = lifetime.map(|lifetime| Instant::now() + lifetime);

        let poller = {
            let token = token.clone();
            let user_id = user_id.clone();
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let mut ticker = interval(every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                let expiry = async move {
                    match expires_at {
                        Some(at) => sleep_until(at).await,
                        None => std::future::pending::<()>().await,
                    }
                };
                tokio::pin!(expiry);

                loop {
                    tokio::select! {
                        biased;
                        _ = &mut expiry => {
                            log::info!("Session for user {} expired, polling stopped", user_id);
                            return;
                        }
                        _ = ticker.tick() => {}
                    }

                    match refresh_into(source.as_ref(), &token, &state).await {
                        Ok(_) => {}
                        Err(AppError::Application { status: 401, .. }) => {
                            log::info!(
                                "Backend no longer accepts the token of user {}, polling stopped",
                                user_id
                            );
                            return;
                        }
                        Err(e) => {
                            // background refresh is cosmetic, keep the last known count
                            log::warn!("Notification refresh failed for user {}: {}", user_id, e);
                        }
                    }
                }
            })
        };

        log::info!("Session started for user {}", user_id);

        Self {
            token,
            user_id,
            state,
            poller,
            stopped: AtomicBool::new(false),
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn notification_state(&self) -> NotificationState {
        self.state.read().await.clone()
    }

    /// Refreshes the cached count outside the regular schedule.
    pub async fn refresh<S: NotificationSource>(&self, source: &S) -> Result<u64, AppError> {
        refresh_into(source, &self.token, &self.state).await
    }

    pub fn is_polling(&self) -> bool {
        !self.stopped.load(Ordering::Acquire) && !self.poller.is_finished()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| Instant::now() >= at)
            .unwrap_or(false)
    }

    pub fn teardown(&self) {
        self.stopped.store(true, Ordering::Release);
        self.poller.abort();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

async fn refresh_into<S: NotificationSource>(
    source: &S,
    token: &str,
    state: &RwLock<NotificationState>,
) -> Result<u64, AppError> {
    let count = source.unread_count(token).await?;
    let mut state = state.write().await;
    state.unread_count = count;
    state.last_refreshed = Some(Utc::now());
    Ok(count)
}

/// Sessions by bearer token. Injected through `web::Data`.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Session>>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drops sessions whose token expired or whose poller has stopped.
    fn prune(sessions: &mut HashMap<String, Arc<Session>>) {
        sessions.retain(|_, session| {
            let live = session.is_polling() && !session.is_expired();
            if !live {
                session.teardown();
                log::info!("Session expired for user {}", session.user_id());
            }
            live
        });
    }

    /// Registers `session`, tearing down any previous session for the same token.
    pub fn insert(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        let mut sessions = self.sessions();
        Self::prune(&mut sessions);
        if let Some(previous) =
            sessions.insert(session.token().to_string(), Arc::clone(&session))
        {
            previous.teardown();
        }
        session
    }

    pub fn get(&self, token: &str) -> Option<Arc<Session>> {
        let mut sessions = self.sessions();
        Self::prune(&mut sessions);
        sessions.get(token).cloned()
    }

    pub fn remove(&self, token: &str) -> bool {
        match self.sessions().remove(token) {
            Some(session) => {
                session.teardown();
                log::info!("Session ended for user {}", session.user_id());
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        let drained: Vec<Arc<Session>> = self.sessions().drain().map(|(_, s)| s).collect();
        for session in &drained {
            session.teardown();
        }
        if !drained.is_empty() {
            log::info!("Ended {} session(s)", drained.len());
        }
    }

    pub fn len(&self) -> usize {
        let mut sessions = self.sessions();
        Self::prune(&mut sessions);
        sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
