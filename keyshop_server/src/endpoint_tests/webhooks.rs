use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App, HttpResponse};
use ksp_common::Secret;
use serde_json::json;

use super::helpers::reason;
use crate::{helpers::calculate_hmac, middleware::HmacMiddlewareFactory};

const WEBHOOK_SECRET: &str = "whsec-endpoint-tests";

async fn echo(body: web::Bytes) -> HttpResponse {
    HttpResponse::Ok().body(body)
}

async fn call(secret: &str, api_key: Option<&str>, req: TestRequest) -> (StatusCode, String) {
    let hmac = HmacMiddlewareFactory::new(Secret::new(secret.to_string()), api_key.map(|k| Secret::new(k.to_string())));
    let app = App::new().service(web::scope("/webhooks").wrap(hmac).route("/sepay", web::post().to(echo)));
    let service = test::init_service(app).await;
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res.into_parts().1.map_into_boxed_body(),
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = res.into_body().try_into_bytes().unwrap_or_default();
    (status, String::from_utf8_lossy(&body).into_owned())
}

fn payload() -> String {
    json!({"content": "ORD-ABCDE12345 thanh toan", "transferAmount": 90_000, "referenceCode": "FT123"}).to_string()
}

#[actix_web::test]
async fn signed_payloads_reach_the_handler_intact() {
    let _ = env_logger::try_init().ok();
    let body = payload();
    let signature = calculate_hmac(WEBHOOK_SECRET, body.as_bytes());
    let req = TestRequest::post()
        .uri("/webhooks/sepay")
        .insert_header(("x-sepay-signature", format!("sha256={signature}")))
        .set_payload(body.clone());
    let (status, echoed) = call(WEBHOOK_SECRET, None, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(echoed, body);
}

#[actix_web::test]
async fn bad_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let body = payload();
    let signature = calculate_hmac("some-other-secret", body.as_bytes());
    let req = TestRequest::post().uri("/webhooks/sepay").insert_header(("x-signature", signature)).set_payload(body);
    let (status, response) = call(WEBHOOK_SECRET, None, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(reason(&response), "UNAUTHORIZED");

    let req = TestRequest::post().uri("/webhooks/sepay").set_payload(payload());
    let (status, _) = call(WEBHOOK_SECRET, None, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn unsigned_calls_pass_without_a_secret() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/webhooks/sepay").set_payload(payload());
    let (status, _) = call("", None, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn api_key_is_required_once_configured() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/webhooks/sepay").set_payload(payload());
    let (status, _) = call("", Some("key-123"), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::post()
        .uri("/webhooks/sepay")
        .insert_header(("Authorization", "Apikey key-123"))
        .set_payload(payload());
    let (status, _) = call("", Some("key-123"), req).await;
    assert_eq!(status, StatusCode::OK);
}
