use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use keyshop_engine::{
    db_types::{
        CartItem,
        Order,
        OrderId,
        OrderStatusType,
        PaymentId,
        PaymentStatus,
        PaymentTransaction,
        ProductId,
        Role,
        UserId,
        VoucherDiscount,
        Vnd,
    },
    events::EventProducers,
    traits::{CheckoutOutcome, OrderFlowError, OrderStats},
    CheckoutApi,
    PaymentProviderConfig,
};
use serde_json::{json, Value};

use super::{
    helpers::{bearer, get_request, post_request, reason},
    mocks::MockOrderManager,
};
use crate::routes::{AddToCartRoute, CheckoutRoute, MyCartRoute, MyOrderStatsRoute, MyOrdersRoute};

fn configure(db: MockOrderManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = CheckoutApi::new(db, EventProducers::default(), PaymentProviderConfig::default());
        cfg.app_data(web::Data::new(api))
            .service(MyCartRoute::<MockOrderManager>::new())
            .service(AddToCartRoute::<MockOrderManager>::new())
            .service(CheckoutRoute::<MockOrderManager>::new())
            .service(MyOrdersRoute::<MockOrderManager>::new())
            .service(MyOrderStatsRoute::<MockOrderManager>::new());
    }
}

fn cart_item(product: &str, price: i64, quantity: i64) -> CartItem {
    let now = Utc::now();
    CartItem {
        id: format!("line-{product}"),
        cart_id: "cart-1".into(),
        product_id: ProductId::from(product),
        product_name: format!("{product} (1 month)"),
        price: Vnd::from(price),
        quantity,
        created_at: now,
        updated_at: now,
    }
}

fn order(user_id: &UserId, total: i64, method: &str) -> Order {
    let now = Utc::now();
    Order {
        id: OrderId::from("ORD-ABCDE12345"),
        user_id: user_id.clone(),
        status: OrderStatusType::Pending,
        total_amount: Vnd::from(total),
        payment_method: method.into(),
        created_at: now,
        updated_at: now,
    }
}

#[actix_web::test]
async fn cart_includes_the_subtotal() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_cart()
        .withf(|id| id.as_str() == "alice")
        .times(1)
        .returning(|_| Ok(vec![cart_item("netflix", 70_000, 2), cart_item("spotify", 45_000, 1)]));
    let (status, body) = get_request(&bearer("alice", Role::User), "/api/cart", configure(db)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let cart: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(cart["subtotal"], json!(185_000));
}

#[actix_web::test]
async fn add_to_cart_defaults_to_one_unit() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_add_to_cart()
        .withf(|user, product, qty| user.as_str() == "alice" && product.as_str() == "netflix" && *qty == 1)
        .times(1)
        .returning(|_, product, qty| Ok(cart_item(product.as_str(), 70_000, qty)));
    let (status, body) =
        post_request(&bearer("alice", Role::User), "/api/cart/items", json!({"productId": "netflix"}), configure(db))
            .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let item: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(item["quantity"], json!(1));
}

#[actix_web::test]
async fn unavailable_products_cannot_be_added() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_add_to_cart().returning(|_, product, _| Err(OrderFlowError::ProductUnavailable(product.clone())));
    let (status, body) = post_request(
        &bearer("alice", Role::User),
        "/api/cart/items",
        json!({"product_id": "retired", "quantity": 3}),
        configure(db),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reason(&body), "PRODUCT_UNAVAILABLE");
}

#[actix_web::test]
async fn checkout_with_an_empty_cart() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_checkout().times(1).returning(|_, _| Err(OrderFlowError::EmptyCart));
    let (status, body) =
        post_request(&bearer("alice", Role::User), "/api/checkout", json!({"useWallet": true}), configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reason(&body), "EMPTY_CART");
}

#[actix_web::test]
async fn wallet_payments_require_use_wallet() {
    let _ = env_logger::try_init().ok();
    // The backend is never reached
    let db = MockOrderManager::new();
    let (status, body) = post_request(
        &bearer("alice", Role::User),
        "/api/checkout",
        json!({"paymentMethod": "wallet", "useWallet": false}),
        configure(db),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reason(&body), "VALIDATION_ERROR");
}

#[actix_web::test]
async fn external_checkout_returns_transfer_instructions() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_checkout()
        .withf(|user, req| user.as_str() == "alice" && !req.use_wallet && req.voucher_code.as_deref() == Some("SALE10"))
        .times(1)
        .returning(|user, _| {
            let order = order(user, 90_000, "sepay");
            let now = Utc::now();
            let payment = PaymentTransaction {
                id: PaymentId::from("pay-1"),
                order_id: order.id.clone(),
                provider: "sepay".into(),
                provider_tx_id: None,
                amount: order.total_amount,
                status: PaymentStatus::Pending,
                code: order.id.to_string(),
                created_at: now,
                updated_at: now,
            };
            let pricing =
                VoucherDiscount { subtotal: Vnd::from(100_000), discount: Vnd::from(10_000), total: Vnd::from(90_000) };
            Ok(CheckoutOutcome {
                order,
                items: vec![],
                pricing,
                voucher: None,
                payment: Some(payment),
                wallet_transaction: None,
                deliveries: vec![],
            })
        });
    let (status, body) = post_request(
        &bearer("alice", Role::User),
        "/api/checkout",
        json!({"payment_method": "sepay", "voucher_code": "SALE10"}),
        configure(db),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["order"]["status"], json!("pending"));
    assert_eq!(response["pricing"]["discount"], json!(10_000));
    assert_eq!(response["instructions"]["code"], json!("ORD-ABCDE12345"));
    assert_eq!(response["instructions"]["amount"], json!(90_000));
}

#[actix_web::test]
async fn order_history_is_paged() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders_for_user()
        .withf(|user, paging| user.as_str() == "alice" && paging.limit == 5 && paging.offset == 10)
        .times(1)
        .returning(|user, _| Ok(vec![order(user, 70_000, "wallet")]));
    let (status, body) =
        get_request(&bearer("alice", Role::User), "/api/orders?limit=5&offset=10", configure(db)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let orders: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn order_stats() {
    let _ = env_logger::try_init().ok();
    let mut db = MockOrderManager::new();
    db.expect_order_stats().times(1).returning(|_| {
        Ok(OrderStats { total_orders: 3, pending: 1, paid: 1, refunded: 1, total_spent: Vnd::from(70_000) })
    });
    let (status, body) = get_request(&bearer("alice", Role::User), "/api/orders/stats", configure(db)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let stats: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(stats["total_orders"], json!(3));
}
