use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use keyshop_engine::db_types::Role;
use log::debug;
use serde_json::{json, Value};
use sha2::Sha256;

use crate::{
    auth::{JwtClaims, TokenVerifier},
    config::AuthConfig,
    middleware::BearerAuthFactory,
    server::configure_extractors,
};

// DO NOT re-use this secret anywhere.
pub const TEST_SECRET: &str = "keyshop-endpoint-test-secret";

fn encode(bytes: &[u8]) -> String {
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

/// Signs an arbitrary claims object with HS256.
pub fn sign_token(claims: &Value, secret: &str) -> String {
    let header = encode(json!({ "alg": "HS256", "typ": "JWT" }).to_string().as_bytes());
    let payload = encode(claims.to_string().as_bytes());
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(format!("{header}.{payload}").as_bytes());
    let signature = encode(&mac.finalize().into_bytes());
    format!("{header}.{payload}.{signature}")
}

pub fn issue_token(claims: JwtClaims, expiry: DateTime<Utc>) -> String {
    let claims = json!({ "sub": claims.user_id.as_str(), "role": claims.role, "exp": expiry.timestamp() });
    sign_token(&claims, TEST_SECRET)
}

/// An `Authorization` header value for `user_id`, valid for a day.
pub fn bearer(user_id: &str, role: Role) -> String {
    let token = issue_token(JwtClaims::new(user_id, role), Utc::now() + Duration::days(1));
    format!("Bearer {token}")
}

/// Sends `req` to an app with the services from `configure` mounted under an authenticated `/api` scope, and returns
/// the status and body. Errors raised by middleware are rendered the same way the server renders them.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let verifier = TokenVerifier::new(&AuthConfig::new(TEST_SECRET));
    let app = App::new()
        .configure(configure_extractors)
        .service(web::scope("/api").wrap(BearerAuthFactory::new(verifier)).configure(configure));
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub async fn get_request<F>(auth_header: &str, path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let mut req = TestRequest::get().uri(path);
    if !auth_header.is_empty() {
        req = req.insert_header(("Authorization", auth_header));
    }
    send_request(req, configure).await
}

pub async fn post_request<F>(auth_header: &str, path: &str, body: Value, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let mut req = TestRequest::post().uri(path).set_json(body);
    if !auth_header.is_empty() {
        req = req.insert_header(("Authorization", auth_header));
    }
    send_request(req, configure).await
}

/// The `reason` field of an error body.
pub fn reason(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("reason").and_then(Value::as_str).map(String::from))
        .unwrap_or_default()
}
