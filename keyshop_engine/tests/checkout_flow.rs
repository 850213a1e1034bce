use keyshop_engine::{
    db_types::{NewVoucher, OrderStatusType, PaymentStatus, UserId, VoucherRejection, Vnd, WalletTxType},
    events::EventProducers,
    helpers::order_payment_code,
    test_utils::{fund_wallet, new_test_database, product_with_stock},
    traits::{CheckoutRequest, OrderFlowError, WalletError, WalletManagement, WalletTransactionFilter},
    CatalogApi,
    CheckoutApi,
    PaymentProviderConfig,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

async fn setup() -> (CheckoutApi<SqliteDatabase>, CatalogApi<SqliteDatabase>) {
    let db = new_test_database(5).await;
    let checkout = CheckoutApi::new(db.clone(), EventProducers::default(), PaymentProviderConfig::default());
    (checkout, CatalogApi::new(db))
}

async fn tear_down(api: CheckoutApi<SqliteDatabase>) {
    let mut db = api.db().clone();
    let url = db.url().to_string();
    let _ = db.close().await;
    let _ = Sqlite::drop_database(&url).await;
}

async fn refunds_for(api: &CheckoutApi<SqliteDatabase>, user: &UserId) -> usize {
    let filter = WalletTransactionFilter::default().with_type(WalletTxType::Refund);
    api.db().fetch_wallet_transactions(user, filter).await.unwrap().len()
}

#[tokio::test]
async fn voucher_discount_is_applied_and_redeemed() {
    let (checkout, catalog) = setup().await;
    let product = product_with_stock(checkout.db(), "netflix", 100_000, 5).await;
    let voucher = catalog.create_voucher(NewVoucher::percent("SAVE10", 10)).await.unwrap();
    let user = UserId::from("alice");
    fund_wallet(checkout.db(), &user, 500_000).await;
    checkout.add_to_cart(&user, &product.id, 2).await.unwrap();

    let preview = checkout.check_voucher("SAVE10", Vnd::from(200_000)).await.unwrap();
    assert_eq!(preview.pricing.total, Vnd::from(180_000));
    // A preview is not a redemption
    assert_eq!(catalog.voucher(&voucher.id).await.unwrap().used_count, 0);

    let response = checkout.checkout(&user, CheckoutRequest::wallet().with_voucher("SAVE10")).await.unwrap();
    let outcome = &response.outcome;
    assert_eq!(outcome.pricing.subtotal, Vnd::from(200_000));
    assert_eq!(outcome.pricing.discount, Vnd::from(20_000));
    assert_eq!(outcome.order.total_amount, Vnd::from(180_000));
    assert_eq!(outcome.order.status, OrderStatusType::Paid);
    assert_eq!(outcome.order.payment_method, "wallet");
    assert_eq!(outcome.deliveries.len(), 2);
    assert!(response.instructions.is_none());
    let link = outcome.voucher.as_ref().expect("Voucher should be linked");
    assert_eq!(link.code, "SAVE10");
    assert_eq!(link.discount_amount, Vnd::from(20_000));
    let debit = outcome.wallet_transaction.as_ref().expect("Wallet should be debited");
    assert_eq!(debit.amount, Vnd::from(180_000));
    assert!(debit.description.as_deref().unwrap_or_default().ends_with("(Voucher: SAVE10)"));
    assert_eq!(debit.reference_id.as_deref(), Some(outcome.order.id.as_str()));

    assert_eq!(catalog.voucher(&voucher.id).await.unwrap().used_count, 1);
    assert_eq!(checkout.db().fetch_or_create_wallet(&user).await.unwrap().balance, Vnd::from(320_000));
    assert!(checkout.cart(&user).await.unwrap().items.is_empty());
    tear_down(checkout).await;
}

#[tokio::test]
async fn exhausted_vouchers_are_rejected_without_side_effects() {
    let (checkout, catalog) = setup().await;
    let product = product_with_stock(checkout.db(), "spotify", 50_000, 5).await;
    catalog.create_voucher(NewVoucher::flat("ONCE", Vnd::from(10_000)).with_max_uses(1)).await.unwrap();
    let user = UserId::from("bob");
    fund_wallet(checkout.db(), &user, 500_000).await;

    checkout.add_to_cart(&user, &product.id, 1).await.unwrap();
    checkout.checkout(&user, CheckoutRequest::wallet().with_voucher("ONCE")).await.unwrap();
    checkout.add_to_cart(&user, &product.id, 1).await.unwrap();
    let err = checkout.checkout(&user, CheckoutRequest::wallet().with_voucher("ONCE")).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Voucher(VoucherRejection::LimitReached)));
    let err = checkout.checkout(&user, CheckoutRequest::wallet().with_voucher("NOPE")).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Voucher(VoucherRejection::NotFound)));

    assert_eq!(checkout.order_stats(&user).await.unwrap().total_orders, 1);
    assert_eq!(checkout.db().fetch_or_create_wallet(&user).await.unwrap().balance, Vnd::from(460_000));
    assert_eq!(checkout.cart(&user).await.unwrap().items.len(), 1);
    tear_down(checkout).await;
}

#[tokio::test]
async fn wallet_checkout_needs_enough_balance() {
    let (checkout, _) = setup().await;
    let product = product_with_stock(checkout.db(), "chatgpt", 400_000, 2).await;
    let user = UserId::from("carol");
    let err = checkout.checkout(&user, CheckoutRequest::wallet()).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::EmptyCart));

    fund_wallet(checkout.db(), &user, 100_000).await;
    checkout.add_to_cart(&user, &product.id, 1).await.unwrap();
    let err = checkout.checkout(&user, CheckoutRequest::wallet()).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Wallet(WalletError::InsufficientBalance { .. })));
    assert_eq!(checkout.order_stats(&user).await.unwrap().total_orders, 0);
    assert_eq!(checkout.db().fetch_or_create_wallet(&user).await.unwrap().balance, Vnd::from(100_000));
    tear_down(checkout).await;
}

#[tokio::test]
async fn refunds_happen_exactly_once() {
    let (checkout, catalog) = setup().await;
    let product = product_with_stock(checkout.db(), "canva", 80_000, 3).await;
    let voucher = catalog.create_voucher(NewVoucher::percent("HALF", 50)).await.unwrap();
    let user = UserId::from("dave");
    fund_wallet(checkout.db(), &user, 100_000).await;
    checkout.add_to_cart(&user, &product.id, 1).await.unwrap();
    let response = checkout.checkout(&user, CheckoutRequest::wallet().with_voucher("HALF")).await.unwrap();
    let order_id = response.order_id().clone();
    assert_eq!(checkout.db().fetch_or_create_wallet(&user).await.unwrap().balance, Vnd::from(60_000));

    let err = checkout.refund_order(&order_id, "   ").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Validation(_)));

    let refund = checkout.refund_order(&order_id, "Customer request").await.unwrap();
    assert_eq!(refund.order.status, OrderStatusType::Refunded);
    let credit = refund.wallet_transaction.expect("A refund should be credited");
    assert_eq!(credit.amount, Vnd::from(40_000));
    assert_eq!(credit.provider, "system");
    assert_eq!(credit.reference_type.as_deref(), Some("order_refund"));
    assert_eq!(refund.voucher_released, Some(voucher.id.clone()));
    assert_eq!(catalog.voucher(&voucher.id).await.unwrap().used_count, 0);

    let err = checkout.refund_order(&order_id, "Customer request").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidState(_)));
    assert_eq!(refunds_for(&checkout, &user).await, 1);
    assert_eq!(checkout.db().fetch_or_create_wallet(&user).await.unwrap().balance, Vnd::from(100_000));
    let stats = checkout.order_stats(&user).await.unwrap();
    assert_eq!(stats.refunded, 1);
    tear_down(checkout).await;
}

#[tokio::test]
async fn free_orders_skip_the_wallet() {
    let (checkout, catalog) = setup().await;
    let product = product_with_stock(checkout.db(), "gift", 30_000, 1).await;
    catalog.create_voucher(NewVoucher::percent("FREE", 100)).await.unwrap();
    let user = UserId::from("erin");
    checkout.add_to_cart(&user, &product.id, 1).await.unwrap();
    let response = checkout.checkout(&user, CheckoutRequest::wallet().with_voucher("FREE")).await.unwrap();
    assert_eq!(response.outcome.order.total_amount, Vnd::from(0));
    assert_eq!(response.outcome.order.status, OrderStatusType::Paid);
    assert!(response.outcome.wallet_transaction.is_none());
    assert_eq!(response.outcome.deliveries.len(), 1);

    let refund = checkout.refund_order(response.order_id(), "Promo revoked").await.unwrap();
    assert!(refund.wallet_transaction.is_none());
    assert_eq!(refund.released_items.len(), 1);
    assert_eq!(refunds_for(&checkout, &user).await, 0);
    tear_down(checkout).await;
}

#[tokio::test]
async fn external_checkout_leaves_a_pending_payment() {
    let (checkout, _) = setup().await;
    let product = product_with_stock(checkout.db(), "office", 150_000, 2).await;
    let user = UserId::from("frank");
    checkout.add_to_cart(&user, &product.id, 1).await.unwrap();
    let response = checkout.checkout(&user, CheckoutRequest::external("SePay")).await.unwrap();
    let order_id = response.order_id().clone();
    assert_eq!(response.outcome.order.status, OrderStatusType::Pending);
    assert_eq!(response.outcome.order.payment_method, "sepay");
    assert!(response.outcome.deliveries.is_empty());
    let payment = response.outcome.payment.clone().expect("A payment should be created");
    assert_eq!(payment.code, order_payment_code(&order_id));
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, Vnd::from(150_000));
    let instructions = response.instructions.expect("Instructions should be returned");
    assert_eq!(instructions.code, payment.code);
    assert_eq!(instructions.amount, Vnd::from(150_000));

    let started = checkout.start_payment(&user, &order_id).await.unwrap();
    assert_eq!(started.payment.id, payment.id);
    let err = checkout.start_payment(&UserId::from("mallory"), &order_id).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::OrderNotFound(_)));

    let err = checkout.refund_order(&order_id, "Not paid yet").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidState(_)));

    let detail = checkout.order_detail(&user, &order_id).await.unwrap();
    assert_eq!(detail.items.len(), 1);
    assert!(detail.deliveries.is_empty());
    assert_eq!(detail.payment.map(|p| p.id), Some(payment.id));
    assert!(detail.wallet_transaction.is_none());
    tear_down(checkout).await;
}

#[tokio::test]
async fn wallet_orders_cannot_restart_payment() {
    let (checkout, _) = setup().await;
    let product = product_with_stock(checkout.db(), "youtube", 20_000, 1).await;
    let user = UserId::from("grace");
    fund_wallet(checkout.db(), &user, 20_000).await;
    checkout.add_to_cart(&user, &product.id, 1).await.unwrap();
    let response = checkout.checkout(&user, CheckoutRequest::wallet()).await.unwrap();
    let err = checkout.start_payment(&user, response.order_id()).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidState(_)));

    let detail = checkout.order_detail(&user, response.order_id()).await.unwrap();
    assert_eq!(detail.deliveries.len(), 1);
    let debit = detail.wallet_transaction.expect("The debit should be linked to the order");
    assert_eq!(debit.tx_type, WalletTxType::Purchase);
    assert!(detail.payment.is_none());
    tear_down(checkout).await;
}

#[tokio::test]
async fn cart_editing() {
    let (checkout, _) = setup().await;
    let a = product_with_stock(checkout.db(), "alpha", 10_000, 0).await;
    let b = product_with_stock(checkout.db(), "beta", 25_000, 0).await;
    let user = UserId::from("heidi");
    checkout.add_to_cart(&user, &a.id, 1).await.unwrap();
    checkout.add_to_cart(&user, &a.id, 2).await.unwrap();
    checkout.add_to_cart(&user, &b.id, 1).await.unwrap();
    let cart = checkout.cart(&user).await.unwrap();
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.subtotal, Vnd::from(55_000));

    let err = checkout.add_to_cart(&user, &a.id, 0).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidQuantity(0)));
    let line = checkout.update_cart_item(&user, &a.id, 5).await.unwrap().expect("Line should remain");
    assert_eq!(line.quantity, 5);
    assert!(checkout.update_cart_item(&user, &b.id, 0).await.unwrap().is_none());
    assert!(!checkout.remove_from_cart(&user, &b.id).await.unwrap());
    assert_eq!(checkout.cart(&user).await.unwrap().subtotal, Vnd::from(50_000));
    assert_eq!(checkout.clear_cart(&user).await.unwrap(), 1);
    assert!(checkout.cart(&user).await.unwrap().items.is_empty());
    tear_down(checkout).await;
}
