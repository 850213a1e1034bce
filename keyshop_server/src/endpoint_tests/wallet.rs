use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Duration, Utc};
use keyshop_engine::{
    db_types::{DepositRequest, DepositRequestId, DepositStatus, Role, UserId, Vnd, Wallet, WalletId},
    traits::{WalletError, WalletStats},
    PaymentProviderConfig,
    WalletApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{bearer, get_request, post_request, reason},
    mocks::MockWalletManager,
};
use crate::routes::{CreateDepositRoute, DepositStatusRoute, MyWalletRoute};

fn configure(db: MockWalletManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = WalletApi::new(db, PaymentProviderConfig::default());
        cfg.app_data(web::Data::new(api))
            .service(MyWalletRoute::<MockWalletManager>::new())
            .service(CreateDepositRoute::<MockWalletManager>::new())
            .service(DepositStatusRoute::<MockWalletManager>::new());
    }
}

fn wallet(user_id: &UserId, balance: i64) -> Wallet {
    let now = Utc::now();
    Wallet {
        id: WalletId::from("wallet-1"),
        user_id: user_id.clone(),
        balance: Vnd::from(balance),
        total_deposited: Vnd::from(balance),
        total_spent: Vnd::default(),
        created_at: now,
        updated_at: now,
    }
}

#[actix_web::test]
async fn fetch_my_wallet() {
    let _ = env_logger::try_init().ok();
    let mut db = MockWalletManager::new();
    db.expect_fetch_or_create_wallet()
        .withf(|id| id.as_str() == "alice")
        .times(1)
        .returning(|id| Ok(wallet(id, 150_000)));
    db.expect_wallet_stats().times(1).returning(|_| {
        Ok(WalletStats { total_deposits: Vnd::from(150_000), deposit_count: 1, ..Default::default() })
    });
    let (status, body) = get_request(&bearer("alice", Role::User), "/api/wallet", configure(db)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let info: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(info["wallet"]["balance"], json!(150_000));
    assert_eq!(info["wallet"]["user_id"], json!("alice"));
    assert_eq!(info["stats"]["deposit_count"], json!(1));
}

#[actix_web::test]
async fn deposits_below_the_minimum_are_rejected() {
    let _ = env_logger::try_init().ok();
    // Any call on the backend would panic: validation happens first
    let db = MockWalletManager::new();
    let (status, body) =
        post_request(&bearer("alice", Role::User), "/api/wallet/deposits", json!({"amount": 5_000}), configure(db))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reason(&body), "VALIDATION_ERROR");
}

#[actix_web::test]
async fn create_deposit() {
    let _ = env_logger::try_init().ok();
    let mut db = MockWalletManager::new();
    db.expect_insert_deposit_request()
        .withf(|r| r.user_id.as_str() == "alice" && r.amount == Vnd::from(200_000) && r.payment_method == "sepay")
        .times(1)
        .returning(|r| {
            let now = Utc::now();
            Ok(DepositRequest {
                id: DepositRequestId::from("dep-1"),
                user_id: r.user_id,
                wallet_id: WalletId::from("wallet-1"),
                amount: r.amount,
                payment_method: r.payment_method,
                payment_code: r.payment_code,
                status: DepositStatus::Pending,
                provider_tx_id: None,
                expires_at: r.expires_at,
                completed_at: None,
                created_at: now,
                updated_at: now,
            })
        });
    let (status, body) = post_request(
        &bearer("alice", Role::User),
        "/api/wallet/deposits",
        json!({"amount": 200_000, "paymentMethod": "SePay"}),
        configure(db),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ticket: Value = serde_json::from_str(&body).unwrap();
    let code = ticket["deposit"]["payment_code"].as_str().unwrap();
    assert!(code.starts_with("DEP"), "{code}");
    assert_eq!(ticket["instructions"]["code"].as_str(), Some(code));
    assert_eq!(ticket["deposit"]["status"], json!("pending"));
    let expires_at = ticket["deposit"]["expires_at"].as_str().unwrap().parse::<chrono::DateTime<Utc>>().unwrap();
    assert!(expires_at > Utc::now() + Duration::minutes(29));
}

#[actix_web::test]
async fn deposits_of_other_users_are_not_found() {
    let _ = env_logger::try_init().ok();
    let mut db = MockWalletManager::new();
    db.expect_fetch_deposit_request()
        .withf(|user, id| user.as_str() == "mallory" && id.as_str() == "dep-1")
        .times(1)
        .returning(|_, _| Ok(None));
    let (status, body) =
        get_request(&bearer("mallory", Role::User), "/api/wallet/deposits/dep-1", configure(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(reason(&body), "NOT_FOUND");
}

#[actix_web::test]
async fn backend_failures_are_internal_errors() {
    let _ = env_logger::try_init().ok();
    let mut db = MockWalletManager::new();
    db.expect_fetch_or_create_wallet().returning(|_| Err(WalletError::DatabaseError("disk on fire".into())));
    let (status, body) = get_request(&bearer("alice", Role::User), "/api/wallet", configure(db)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reason(&body), "DATABASE_ERROR");
}
