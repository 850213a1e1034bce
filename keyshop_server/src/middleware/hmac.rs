//! Webhook authentication middleware for Actix Web.
//!
//! Payment providers sign the raw request body with HMAC-SHA256 and send the hex digest in the `x-sepay-signature`
//! (or `x-signature`) header. The check is skipped when no secret is configured, so local setups can post
//! notifications by hand.
//!
//! Providers may additionally send `Authorization: Apikey <key>`. When an API key is configured, calls without the
//! matching key are rejected with 401.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorBadRequest,
    http::header::AUTHORIZATION,
    Error,
};
use bytes::Bytes;
use futures::future::LocalBoxFuture;
use ksp_common::Secret;
use log::{trace, warn};

use crate::{
    errors::{AuthError, ServerError},
    helpers::verify_hmac,
};

pub const SIGNATURE_HEADERS: [&str; 2] = ["x-sepay-signature", "x-signature"];

pub struct HmacMiddlewareFactory {
    key: Secret<String>,
    api_key: Option<Secret<String>>,
}

impl HmacMiddlewareFactory {
    pub fn new(key: Secret<String>, api_key: Option<Secret<String>>) -> Self {
        HmacMiddlewareFactory { key, api_key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacMiddlewareService {
            key: self.key.clone(),
            api_key: self.api_key.clone(),
            service: Rc::new(service),
        }))
    }
}

pub struct HmacMiddlewareService<S> {
    key: Secret<String>,
    api_key: Option<Secret<String>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let key = self.key.clone();
        let api_key = self.api_key.clone();
        Box::pin(async move {
            if let Some(expected) = api_key {
                let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
                check_api_key(header, expected.reveal())?;
                trace!("🔐️ Webhook API key accepted");
            }
            if key.is_empty() {
                trace!("🔐️ No webhook secret is configured. Skipping the signature check.");
                return service.call(req).await;
            }
            let data = req.extract::<Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract webhook body: {e:?}");
                ErrorBadRequest("Failed to extract request data.")
            })?;
            let signature = SIGNATURE_HEADERS
                .iter()
                .find_map(|h| req.headers().get(*h))
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    warn!("🔐️ No signature found in webhook call. Denying access.");
                    ServerError::from(AuthError::WebhookRejected("Missing signature".into()))
                })?;
            if verify_hmac(key.reveal(), data.as_ref(), signature) {
                trace!("🔐️ Webhook signature check ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid webhook signature. Denying access.");
                Err(ServerError::from(AuthError::WebhookRejected("Invalid signature".into())).into())
            }
        })
    }
}

fn check_api_key(header: Option<&str>, expected: &str) -> Result<(), ServerError> {
    let header = header.ok_or_else(|| AuthError::WebhookRejected("Missing Authorization header".into()))?;
    match header.split_once(' ') {
        Some(("Apikey", key)) if key.trim() == expected => Ok(()),
        Some(("Apikey", _)) => {
            warn!("🔐️ Webhook called with an invalid API key");
            Err(AuthError::WebhookRejected("Invalid API key".into()).into())
        },
        _ => Err(AuthError::WebhookRejected("Invalid Authorization header format".into()).into()),
    }
}

fn bytes_to_payload(buf: Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
