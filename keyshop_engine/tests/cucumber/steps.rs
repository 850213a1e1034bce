use cucumber::{then, when};
use keyshop_engine::{
    db_types::{UserId, Vnd},
    traits::{CheckoutRequest, DeliveryManagement, OrderManagement, WalletManagement},
    TransferNotification,
};
use serde_json::json;

use crate::cucumber::ShopWorld;

#[when(expr = "'{word}' adds {int} '{word}' to their cart")]
async fn add_to_cart(world: &mut ShopWorld, user: String, quantity: i64, slug: String) {
    let system = world.system();
    let product_id = system.product(&slug).clone();
    system.checkout.add_to_cart(&UserId::from(user), &product_id, quantity).await.expect("Error adding to cart");
}

async fn checkout(world: &mut ShopWorld, user: String, request: CheckoutRequest) {
    let system = world.system_mut();
    match system.checkout.checkout(&UserId::from(user.as_str()), request).await {
        Ok(response) => {
            system.orders.insert(user, response.order_id().clone());
            system.last_error = None;
        },
        Err(e) => system.last_error = Some(e.to_string()),
    }
}

#[when(expr = "'{word}' checks out with their wallet")]
async fn wallet_checkout(world: &mut ShopWorld, user: String) {
    checkout(world, user, CheckoutRequest::wallet()).await;
}

#[when(expr = "'{word}' checks out with their wallet using voucher '{word}'")]
async fn wallet_checkout_with_voucher(world: &mut ShopWorld, user: String, code: String) {
    checkout(world, user, CheckoutRequest::wallet().with_voucher(code)).await;
}

#[when(expr = "'{word}' checks out via {word}")]
async fn external_checkout(world: &mut ShopWorld, user: String, method: String) {
    checkout(world, user, CheckoutRequest::external(method)).await;
}

#[when(expr = "'{word}' requests a deposit of {int} VND")]
async fn request_deposit(world: &mut ShopWorld, user: String, amount: i64) {
    let system = world.system_mut();
    let ticket = system
        .wallet
        .create_deposit(&UserId::from(user.as_str()), Vnd::from(amount), None)
        .await
        .expect("Error creating deposit request");
    system.deposits.insert(user, ticket.deposit.payment_code);
}

async fn bank_transfer(world: &mut ShopWorld, content: String, amount: i64) {
    let payload = json!({ "content": content, "transferAmount": amount, "referenceCode": "FT-CUCUMBER" });
    let notification = TransferNotification::from_json(&payload).expect("Invalid notification");
    let system = world.system_mut();
    let result = system.webhooks.process_notification(&notification).await;
    system.last_error = result.into_response().err().map(|e| e.to_string());
}

#[when(expr = "the bank reports a transfer of {int} VND for the last order of '{word}'")]
async fn order_transfer(world: &mut ShopWorld, amount: i64, user: String) {
    let system = world.system();
    let payment = system
        .db
        .fetch_payment_for_order(system.last_order(&user))
        .await
        .expect("Error fetching payment")
        .expect("Order has no payment");
    bank_transfer(world, format!("Thanh toan {}", payment.code), amount).await;
}

#[when(expr = "the bank reports a transfer of {int} VND for the last deposit of '{word}'")]
async fn deposit_transfer(world: &mut ShopWorld, amount: i64, user: String) {
    let code = world.system().deposits.get(&user).cloned().expect("No deposit requested");
    bank_transfer(world, format!("Nap tien {code}"), amount).await;
}

#[when(expr = "the last order of '{word}' is refunded because {string}")]
async fn refund(world: &mut ShopWorld, user: String, reason: String) {
    let system = world.system_mut();
    let order_id = system.last_order(&user).clone();
    system.last_error = system.checkout.refund_order(&order_id, &reason).await.err().map(|e| e.to_string());
}

#[then(expr = "the last operation fails with {string}")]
async fn check_failure(world: &mut ShopWorld, message: String) {
    let err = world.system().last_error.clone().expect("The last operation succeeded");
    assert!(err.contains(&message), "Expected '{message}' in '{err}'");
}

#[then("the last operation succeeds")]
async fn check_success(world: &mut ShopWorld) {
    assert_eq!(world.system().last_error, None);
}

#[then(expr = "'{word}' has a wallet balance of {int} VND")]
async fn check_balance(world: &mut ShopWorld, user: String, amount: i64) {
    let wallet = world.system().db.fetch_or_create_wallet(&UserId::from(user)).await.expect("Error fetching wallet");
    assert_eq!(wallet.balance, Vnd::from(amount));
}

#[then(expr = "the last order of '{word}' is {word}")]
async fn check_order_status(world: &mut ShopWorld, user: String, status: String) {
    let system = world.system();
    let order =
        system.db.fetch_order(system.last_order(&user)).await.expect("Error fetching order").expect("Order is missing");
    assert_eq!(order.status.to_string(), status);
}

#[then(expr = "the last order of '{word}' totals {int} VND")]
async fn check_order_total(world: &mut ShopWorld, user: String, amount: i64) {
    let system = world.system();
    let order =
        system.db.fetch_order(system.last_order(&user)).await.expect("Error fetching order").expect("Order is missing");
    assert_eq!(order.total_amount, Vnd::from(amount));
}

#[then(expr = "'{word}' can see {int} deliveries")]
async fn check_deliveries(world: &mut ShopWorld, user: String, count: usize) {
    let deliveries =
        world.system().db.fetch_user_deliveries(&UserId::from(user)).await.expect("Error fetching deliveries");
    assert_eq!(deliveries.len(), count);
}

#[then(expr = "there are {int} '{word}' items available")]
async fn check_available(world: &mut ShopWorld, count: i64, slug: String) {
    let system = world.system();
    let available =
        system.inventory.available_count(system.product(&slug)).await.expect("Error counting inventory");
    assert_eq!(available, count);
}

#[then(expr = "voucher '{word}' has been used {int} time(s)")]
async fn check_voucher_usage(world: &mut ShopWorld, code: String, count: i64) {
    let voucher = world
        .system()
        .db
        .fetch_voucher_by_code(&code)
        .await
        .expect("Error fetching voucher")
        .expect("Voucher is missing");
    assert_eq!(voucher.used_count, count);
}
