use std::future::{ready, Ready};

use actix_web::{dev::Payload, Error, FromRequest, HttpMessage, HttpRequest};
use chrono::{DateTime, Utc};

use crate::{error::AppError, middleware::auth::Role, services::lifecycle::Actor};

/// The verified caller. `token` is forwarded to the backend as-is.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub token: String,
    /// `exp` of the token, when it is representable.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        match self.role {
            Role::Traveler => Actor::Traveler,
            Role::Guider => Actor::Guider,
        }
    }

    /// Time left before the token expires, zero once it has.
    pub fn remaining_lifetime(&self) -> Option<std::time::Duration> {
        self.expires_at.map(|at| {
            (at - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO)
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(
                AppError::Unauthorized("User not authenticated".to_string()).into()
            )),
        }
    }
}
