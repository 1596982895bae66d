use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::{
    error::AppError,
    middleware::{auth::Role, auth_context::AuthenticatedUser},
};

/// Lets the request through only for callers with `required_role`.
/// Must be wrapped inside `AuthMiddleware`.
pub struct RequireRole {
    required_role: Role,
}

impl RequireRole {
    pub fn new(role: Role) -> Self {
        RequireRole {
            required_role: role,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequireRoleService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleService {
            service,
            required_role: self.required_role,
        }))
    }
}

pub struct RequireRoleService<S> {
    service: S,
    required_role: Role,
}

impl<S, B> Service<ServiceRequest> for RequireRoleService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let role = req
            .extensions()
            .get::<AuthenticatedUser>()
            .map(|user| user.role);

        match role {
            Some(role) if role == self.required_role => Box::pin(self.service.call(req)),
            Some(role) => {
                log::warn!(
                    "Access denied on {} - {:?} required, caller is {:?}",
                    req.path(),
                    self.required_role,
                    role
                );
                Box::pin(ready(Err(AppError::Forbidden.into())))
            }
            None => Box::pin(ready(Err(
                AppError::Unauthorized("No authorization".to_string()).into()
            ))),
        }
    }
}
