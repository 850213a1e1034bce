//! Role-based access control middleware.
//!
//! Place it on any route or scope that sits behind [`super::BearerAuthFactory`]. It reads the verified
//! [`JwtClaims`] from the request extensions and lets the request through only if the caller holds one of the
//! accepted roles. Fine-grained permissions (e.g. `orders.refund`) are checked by the handlers themselves.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use keyshop_engine::db_types::Role;
use log::*;

use crate::{
    auth::JwtClaims,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    accepted_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(accepted_roles: &[Role]) -> Self {
        AclMiddlewareFactory { accepted_roles: accepted_roles.to_vec() }
    }

    /// Admins and super admins.
    pub fn admins() -> Self {
        Self::new(&[Role::Admin, Role::Super])
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { accepted_roles: self.accepted_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    accepted_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let accepted_roles = self.accepted_roles.clone();
        Box::pin(async move {
            let claims = req.extensions().get::<JwtClaims>().cloned().ok_or_else(|| {
                warn!("🔐️ No JWT claims found in request extensions");
                ServerError::from(AuthError::MissingToken)
            })?;
            if accepted_roles.contains(&claims.role) {
                service.call(req).await
            } else {
                debug!("🔐️ {} ({}) was denied access to {}", claims.user_id, claims.role, req.path());
                let roles = accepted_roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(" or ");
                Err(ServerError::from(AuthError::InsufficientRole(roles)).into())
            }
        })
    }
}
