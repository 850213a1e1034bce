pub mod helpers;
mod mocks;

mod admin;
mod cart_and_orders;
mod wallet;
mod webhooks;

mod misc {
    use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, App};

    use super::{
        helpers::{get_request, reason},
        mocks::MockWalletManager,
    };
    use crate::routes::{health, MyWalletRoute};

    #[actix_web::test]
    async fn health_endpoint() {
        let app = test::init_service(App::new().service(health)).await;
        let req = TestRequest::get().uri("/health").to_request();
        let (_req, res) = test::call_service(&app, req).await.into_parts();
        let status = res.status();
        let body = res.into_body().try_into_bytes().unwrap();
        assert!(status.is_success());
        assert_eq!(body, "👍️\n");
    }

    #[actix_web::test]
    async fn api_requires_a_bearer_token() {
        let _ = env_logger::try_init().ok();
        let (status, body) =
            get_request("", "/api/wallet", |cfg| { cfg.service(MyWalletRoute::<MockWalletManager>::new()); }).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(reason(&body), "UNAUTHORIZED");

        let (status, _) = get_request("Bearer not.a.token", "/api/wallet", |cfg| {
            cfg.service(MyWalletRoute::<MockWalletManager>::new());
        })
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
