//! Bearer authentication middleware.
//!
//! Verifies the `Authorization: Bearer <token>` header of every request in the wrapped scope. On success the
//! [`JwtClaims`] are stored in the request extensions, where handlers and the ACL middleware pick them up. Otherwise
//! the request is answered with 401 and never reaches a handler.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{auth::TokenVerifier, errors::ServerError};

pub struct BearerAuthFactory {
    verifier: TokenVerifier,
}

impl BearerAuthFactory {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuthFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = BearerAuthService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthService { verifier: self.verifier.clone(), service: Rc::new(service) }))
    }
}

pub struct BearerAuthService<S> {
    verifier: TokenVerifier,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for BearerAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        let verified = self.verifier.verify_header(header);
        Box::pin(async move {
            match verified {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                },
                Err(e) => {
                    debug!("🔐️ Bearer authentication failed for {}. {e}", req.path());
                    Err(ServerError::from(e).into())
                },
            }
        })
    }
}
