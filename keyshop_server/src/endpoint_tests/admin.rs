use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use keyshop_engine::{
    db_types::{InventoryItem, InventoryItemId, NewInventoryItem, Role},
    traits::InventoryError,
    InventoryApi,
    PermissionApi,
    PermissionCache,
};
use serde_json::{json, Value};

use super::{
    helpers::{bearer, post_request, reason, send_request},
    mocks::MockInventoryManager,
};
use crate::routes::{AddInventoryRoute, BulkInventoryRoute, DeleteInventoryItemRoute, InventoryStatsRoute};

fn configure(db: MockInventoryManager, permissions: MockInventoryManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = InventoryApi::new(db);
        let permissions = PermissionApi::new(permissions, PermissionCache::default());
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(permissions))
            .service(
                web::scope("/admin")
                    .service(AddInventoryRoute::<MockInventoryManager>::new())
                    .service(BulkInventoryRoute::<MockInventoryManager>::new())
                    .service(InventoryStatsRoute::<MockInventoryManager>::new())
                    .service(DeleteInventoryItemRoute::<MockInventoryManager>::new()),
            );
    }
}

fn stored(item: NewInventoryItem, n: usize) -> InventoryItem {
    let now = Utc::now();
    InventoryItem {
        id: InventoryItemId::from(format!("item-{n}")),
        product_id: item.product_id,
        secret_data: item.secret_data,
        batch_id: item.batch_id,
        cost_price: item.cost_price,
        source: item.source,
        notes: item.notes,
        is_sold: false,
        sold_at: None,
        order_item_id: None,
        account_expires_at: item.account_expires_at,
        created_at: now,
        updated_at: now,
    }
}

fn granting(permissions: &'static [&'static str]) -> MockInventoryManager {
    let mut db = MockInventoryManager::new();
    db.expect_fetch_permissions().returning(move |_| Ok(permissions.iter().map(|p| p.to_string()).collect()));
    db
}

fn new_item() -> Value {
    json!({"product_id": "netflix", "secret_data": "user@example.com:hunter2hunter2"})
}

#[actix_web::test]
async fn buyers_cannot_reach_admin_routes() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(
        &bearer("alice", Role::User),
        "/api/admin/inventory",
        new_item(),
        configure(MockInventoryManager::new(), MockInventoryManager::new()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(reason(&body), "FORBIDDEN");
}

#[actix_web::test]
async fn admins_need_the_specific_permission() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(
        &bearer("support", Role::Admin),
        "/api/admin/inventory",
        new_item(),
        configure(MockInventoryManager::new(), granting(&["orders.refund"])),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(reason(&body), "FORBIDDEN");
}

#[actix_web::test]
async fn admins_with_permission_add_inventory() {
    let _ = env_logger::try_init().ok();
    let mut db = MockInventoryManager::new();
    db.expect_insert_inventory_items()
        .withf(|items| items.len() == 1 && items[0].product_id.as_str() == "netflix")
        .times(1)
        .returning(|items| Ok(items.into_iter().enumerate().map(|(n, i)| stored(i, n)).collect()));
    let (status, body) = post_request(
        &bearer("stocker", Role::Admin),
        "/api/admin/inventory",
        new_item(),
        configure(db, granting(&["inventory.manage"])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let item: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(item["is_sold"], json!(false));
    assert_eq!(item["source"], json!("manual"));
}

#[actix_web::test]
async fn super_admins_hold_every_permission() {
    let _ = env_logger::try_init().ok();
    let mut db = MockInventoryManager::new();
    db.expect_inventory_stats().times(1).returning(|_| Ok(vec![]));
    // No permission lookup happens for super admins
    let (status, body) = send_request(
        actix_web::test::TestRequest::get()
            .uri("/api/admin/inventory/stats")
            .insert_header(("Authorization", bearer("root", Role::Super))),
        configure(db, MockInventoryManager::new()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, "[]");
}

#[actix_web::test]
async fn bulk_import_is_all_or_nothing() {
    let _ = env_logger::try_init().ok();
    // One entry is too short, so nothing reaches the backend
    let body = json!({"productId": "netflix", "items": ["user1:longenoughpassword", "short"]});
    let (status, body) = post_request(
        &bearer("stocker", Role::Admin),
        "/api/admin/inventory/bulk",
        body,
        configure(MockInventoryManager::new(), granting(&["inventory.manage"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reason(&body), "VALIDATION_ERROR");
}

#[actix_web::test]
async fn sold_items_cannot_be_deleted() {
    let _ = env_logger::try_init().ok();
    let mut db = MockInventoryManager::new();
    db.expect_delete_inventory_item()
        .withf(|id| id.as_str() == "item-7")
        .times(1)
        .returning(|id| Err(InventoryError::ItemAlreadySold(id.clone())));
    let (status, body) = send_request(
        actix_web::test::TestRequest::delete()
            .uri("/api/admin/inventory/items/item-7")
            .insert_header(("Authorization", bearer("stocker", Role::Admin))),
        configure(db, granting(&["inventory.manage"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reason(&body), "INVALID_STATE");
}

#[actix_web::test]
async fn malformed_bodies_are_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(
        &bearer("stocker", Role::Admin),
        "/api/admin/inventory",
        json!({"secret_data": "missing the product"}),
        configure(MockInventoryManager::new(), granting(&["inventory.manage"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reason(&body), "VALIDATION_ERROR");
}
