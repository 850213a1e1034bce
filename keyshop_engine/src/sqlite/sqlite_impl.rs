//! `SqliteDatabase` is the SQLite implementation of the shop engine backend.
//!
//! It implements every trait in [`crate::traits`]. Each trait method that writes runs as one transaction, composed
//! from the low-level functions in [`super::db`].
use std::{collections::BTreeSet, fmt::Debug};

use chrono::{Duration, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{
    carts,
    db_url,
    deliveries,
    deposits,
    inventory,
    new_pool,
    orders,
    payments,
    permissions,
    products,
    take_write_lock,
    vouchers,
    wallets,
};
use crate::{
    db_types::{
        CartItem,
        Delivery,
        DepositRequest,
        DepositRequestId,
        DepositStatus,
        InventoryItem,
        InventoryItemId,
        NewDepositRequest,
        NewInventoryItem,
        NewProduct,
        NewVoucher,
        NewWalletTransaction,
        Order,
        OrderId,
        OrderItem,
        OrderItemId,
        OrderStatusType,
        OrderVoucher,
        PaymentStatus,
        PaymentTransaction,
        Product,
        ProductId,
        ProductUpdate,
        UserDelivery,
        UserId,
        Vnd,
        Voucher,
        VoucherDiscount,
        VoucherId,
        VoucherRejection,
        VoucherUpdate,
        Wallet,
        WalletTransaction,
        WalletTxType,
    },
    helpers::order_payment_code,
    traits::{
        CatalogError,
        CatalogManagement,
        CheckoutOutcome,
        CheckoutRequest,
        DeliveryManagement,
        DepositOutcome,
        DepositQueryFilter,
        InventoryError,
        InventoryManagement,
        InventoryQueryFilter,
        InventoryStats,
        OrderFlowError,
        OrderManagement,
        OrderPaymentOutcome,
        OrderStats,
        Paging,
        PaymentError,
        PaymentReconciliation,
        PermissionError,
        PermissionManagement,
        RefundOutcome,
        StockSyncResult,
        WalletError,
        WalletManagement,
        WalletStats,
        WalletTransactionFilter,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `KSP_DATABASE_URL` (or the default) as the database URL.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}

//--------------------------------------      Inventory       --------------------------------------------------------
impl InventoryManagement for SqliteDatabase {
    async fn insert_inventory_items(&self, items: Vec<NewInventoryItem>) -> Result<Vec<InventoryItem>, InventoryError> {
        if items.is_empty() {
            return Err(InventoryError::EmptyImport);
        }
        let mut tx = self.pool.begin().await?;
        take_write_lock(&mut tx).await?;
        let mut touched = BTreeSet::new();
        let mut result = Vec::with_capacity(items.len());
        for item in items {
            if !touched.contains(&item.product_id) {
                products::fetch_product(&item.product_id, &mut tx)
                    .await?
                    .ok_or_else(|| InventoryError::ProductNotFound(item.product_id.clone()))?;
                touched.insert(item.product_id.clone());
            }
            result.push(inventory::insert_inventory_item(item, &mut tx).await?);
        }
        for product_id in &touched {
            inventory::sync_stock(Some(product_id), &mut tx).await?;
        }
        tx.commit().await?;
        debug!("📦️ {} inventory item(s) added across {} product(s)", result.len(), touched.len());
        Ok(result)
    }

    async fn fetch_inventory_item(&self, id: &InventoryItemId) -> Result<Option<InventoryItem>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let item = inventory::fetch_inventory_item(id, &mut conn).await?;
        Ok(item)
    }

    async fn fetch_inventory_for_product(
        &self,
        product_id: &ProductId,
        filter: InventoryQueryFilter,
    ) -> Result<Vec<InventoryItem>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let items = inventory::fetch_inventory_for_product(product_id, filter, Utc::now(), &mut conn).await?;
        Ok(items)
    }

    async fn available_inventory_count(&self, product_id: &ProductId) -> Result<i64, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let count = inventory::available_count(product_id, Utc::now(), &mut conn).await?;
        Ok(count)
    }

    async fn delete_inventory_item(&self, id: &InventoryItemId) -> Result<InventoryItem, InventoryError> {
        let mut tx = self.pool.begin().await?;
        match inventory::delete_unsold_item(id, &mut tx).await? {
            Some(item) => {
                inventory::sync_stock(Some(&item.product_id), &mut tx).await?;
                tx.commit().await?;
                debug!("📦️ Inventory item {id} deleted");
                Ok(item)
            },
            None => match inventory::fetch_inventory_item(id, &mut tx).await? {
                Some(_) => Err(InventoryError::ItemAlreadySold(id.clone())),
                None => Err(InventoryError::ItemNotFound(id.clone())),
            },
        }
    }

    async fn inventory_stats(&self, product_id: Option<&ProductId>) -> Result<Vec<InventoryStats>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let stats = inventory::inventory_stats(product_id, Utc::now(), &mut conn).await?;
        Ok(stats)
    }

    async fn expiring_inventory(&self, within: Duration) -> Result<Vec<InventoryItem>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let now = Utc::now();
        let items = inventory::expiring_inventory(now, now + within, &mut conn).await?;
        Ok(items)
    }

    async fn allocate_inventory_for_order(&self, order_id: &OrderId) -> Result<Vec<Delivery>, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let deliveries = inventory::allocate_for_order(order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(deliveries)
    }

    async fn refund_inventory(&self, order_item_id: &OrderItemId) -> Result<Vec<InventoryItem>, InventoryError> {
        let mut tx = self.pool.begin().await?;
        let items = inventory::release_items(order_item_id, &mut tx).await?;
        let touched: BTreeSet<&ProductId> = items.iter().map(|i| &i.product_id).collect();
        for product_id in touched {
            inventory::sync_stock(Some(product_id), &mut tx).await?;
        }
        tx.commit().await?;
        debug!("📦️ {} inventory item(s) released from order item {order_item_id}", items.len());
        Ok(items)
    }

    async fn sync_stock(&self, product_id: Option<&ProductId>) -> Result<Vec<StockSyncResult>, InventoryError> {
        let mut tx = self.pool.begin().await?;
        take_write_lock(&mut tx).await?;
        if let Some(id) = product_id {
            products::fetch_product(id, &mut tx).await?.ok_or_else(|| InventoryError::ProductNotFound(id.clone()))?;
        }
        let changed = inventory::sync_stock(product_id, &mut tx).await?;
        tx.commit().await?;
        Ok(changed)
    }
}

//--------------------------------------      Deliveries      --------------------------------------------------------
impl DeliveryManagement for SqliteDatabase {
    async fn fetch_user_deliveries(&self, user_id: &UserId) -> Result<Vec<UserDelivery>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let deliveries = deliveries::fetch_user_deliveries(user_id, Utc::now(), &mut conn).await?;
        Ok(deliveries)
    }

    async fn fetch_order_deliveries(&self, order_id: &OrderId) -> Result<Vec<Delivery>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let deliveries = deliveries::fetch_order_deliveries(order_id, &mut conn).await?;
        Ok(deliveries)
    }

    async fn fetch_expiring_deliveries(&self, within: Duration) -> Result<Vec<UserDelivery>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let now = Utc::now();
        let deliveries = deliveries::fetch_expiring_deliveries(now, now + within, &mut conn).await?;
        Ok(deliveries)
    }

    async fn delete_expired_deliveries(&self) -> Result<Vec<Delivery>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = deliveries::delete_expired_deliveries(Utc::now(), &mut conn).await?;
        Ok(deleted)
    }
}

//--------------------------------------        Wallet        --------------------------------------------------------
impl WalletManagement for SqliteDatabase {
    async fn fetch_or_create_wallet(&self, user_id: &UserId) -> Result<Wallet, WalletError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(wallet) = wallets::fetch_wallet(user_id, &mut conn).await? {
            return Ok(wallet);
        }
        let wallet = wallets::lock_wallet(user_id, Utc::now(), &mut conn).await?;
        debug!("💰️ Wallet {} created for user {user_id}", wallet.id);
        Ok(wallet)
    }

    async fn post_transaction(
        &self,
        user_id: &UserId,
        tx: NewWalletTransaction,
    ) -> Result<WalletTransaction, WalletError> {
        let mut db_tx = self.pool.begin().await?;
        let record = wallets::post_transaction(user_id, tx, &mut db_tx).await?;
        db_tx.commit().await?;
        Ok(record)
    }

    async fn wallet_stats(&self, user_id: &UserId) -> Result<WalletStats, WalletError> {
        let mut conn = self.pool.acquire().await?;
        let stats = wallets::wallet_stats(user_id, &mut conn).await?;
        Ok(stats)
    }

    async fn fetch_wallet_transactions(
        &self,
        user_id: &UserId,
        filter: WalletTransactionFilter,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let mut conn = self.pool.acquire().await?;
        let transactions = wallets::fetch_transactions(user_id, filter, &mut conn).await?;
        Ok(transactions)
    }

    async fn fetch_wallet_transactions_for_reference(
        &self,
        reference_type: &str,
        reference_id: &str,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let mut conn = self.pool.acquire().await?;
        let transactions = wallets::fetch_transactions_for_reference(reference_type, reference_id, &mut conn).await?;
        Ok(transactions)
    }

    async fn insert_deposit_request(&self, request: NewDepositRequest) -> Result<DepositRequest, WalletError> {
        let mut tx = self.pool.begin().await?;
        let wallet = wallets::lock_wallet(&request.user_id, Utc::now(), &mut tx).await?;
        let deposit = deposits::insert_deposit_request(request, &wallet.id, &mut tx).await?;
        tx.commit().await?;
        Ok(deposit)
    }

    async fn fetch_deposit_request(
        &self,
        user_id: &UserId,
        id: &DepositRequestId,
    ) -> Result<Option<DepositRequest>, WalletError> {
        let mut conn = self.pool.acquire().await?;
        let deposit = deposits::fetch_deposit_request(user_id, id, &mut conn).await?;
        Ok(deposit)
    }

    async fn fetch_deposit_requests(
        &self,
        user_id: &UserId,
        filter: DepositQueryFilter,
    ) -> Result<Vec<DepositRequest>, WalletError> {
        let mut conn = self.pool.acquire().await?;
        let deposits = deposits::fetch_deposit_requests(user_id, filter, &mut conn).await?;
        Ok(deposits)
    }

    async fn expire_deposit_requests(&self) -> Result<Vec<DepositRequest>, WalletError> {
        let mut conn = self.pool.acquire().await?;
        let expired = deposits::expire_deposit_requests(Utc::now(), &mut conn).await?;
        Ok(expired)
    }
}

//--------------------------------------   Orders/Checkout    --------------------------------------------------------
impl OrderManagement for SqliteDatabase {
    async fn fetch_cart(&self, user_id: &UserId) -> Result<Vec<CartItem>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let items = carts::fetch_cart_items(user_id, &mut conn).await?;
        Ok(items)
    }

    async fn add_to_cart(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartItem, OrderFlowError> {
        if quantity < 1 {
            return Err(OrderFlowError::InvalidQuantity(quantity));
        }
        let mut tx = self.pool.begin().await?;
        let cart_id = carts::lock_cart(user_id, Utc::now(), &mut tx).await?;
        let product = products::fetch_product(product_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::ProductNotFound(product_id.clone()))?;
        if !product.is_active {
            return Err(OrderFlowError::ProductUnavailable(product_id.clone()));
        }
        carts::upsert_cart_item(&cart_id, product_id, product.price, quantity, &mut tx).await?;
        let item = carts::fetch_cart_item(&cart_id, product_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::ProductNotFound(product_id.clone()))?;
        tx.commit().await?;
        Ok(item)
    }

    async fn update_cart_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Option<CartItem>, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let cart_id = carts::lock_cart(user_id, Utc::now(), &mut tx).await?;
        let item = if quantity <= 0 {
            carts::delete_cart_item(&cart_id, product_id, &mut tx).await?;
            None
        } else {
            if !carts::set_cart_item_quantity(&cart_id, product_id, quantity, &mut tx).await? {
                return Err(OrderFlowError::ProductNotFound(product_id.clone()));
            }
            carts::fetch_cart_item(&cart_id, product_id, &mut tx).await?
        };
        tx.commit().await?;
        Ok(item)
    }

    async fn remove_from_cart(&self, user_id: &UserId, product_id: &ProductId) -> Result<bool, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let cart_id = carts::lock_cart(user_id, Utc::now(), &mut tx).await?;
        let removed = carts::delete_cart_item(&cart_id, product_id, &mut tx).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn clear_cart(&self, user_id: &UserId) -> Result<u64, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let cart_id = carts::lock_cart(user_id, Utc::now(), &mut tx).await?;
        let removed = carts::clear_cart(&cart_id, &mut tx).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn fetch_voucher_by_code(&self, code: &str) -> Result<Option<Voucher>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let voucher = vouchers::fetch_voucher_by_code(code, &mut conn).await?;
        Ok(voucher)
    }

    async fn checkout(&self, user_id: &UserId, request: &CheckoutRequest) -> Result<CheckoutOutcome, OrderFlowError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let cart_id = carts::lock_cart(user_id, now, &mut tx).await?;
        let lines = carts::fetch_cart_items(user_id, &mut tx).await?;
        if lines.is_empty() {
            return Err(OrderFlowError::EmptyCart);
        }
        let subtotal: Vnd = lines.iter().map(CartItem::line_total).sum();
        let voucher = match request.voucher_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                let voucher = vouchers::fetch_voucher_by_code(code, &mut tx).await?.ok_or(VoucherRejection::NotFound)?;
                voucher.check(now)?;
                Some(voucher)
            },
            None => None,
        };
        let pricing = voucher
            .as_ref()
            .map(|v| v.apply_to(subtotal))
            .unwrap_or(VoucherDiscount { subtotal, discount: Vnd::default(), total: subtotal });
        if request.use_wallet {
            let wallet = wallets::lock_wallet(user_id, now, &mut tx).await?;
            if wallet.balance < pricing.total {
                debug!("🧾️ Checkout for {user_id} rejected. Wallet holds {}, needs {}", wallet.balance, pricing.total);
                return Err(WalletError::InsufficientBalance { balance: wallet.balance, required: pricing.total }.into());
            }
        }
        let method = request.resolved_payment_method()?;
        let order = orders::insert_order(user_id, pricing.total, &method, &mut tx).await?;
        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let item =
                orders::insert_order_item(&order.id, &line.product_id, &line.product_name, line.price, line.quantity, &mut tx)
                    .await?;
            products::adjust_stock(&line.product_id, -line.quantity, &mut tx).await?;
            items.push(item);
        }
        let voucher_link = match &voucher {
            Some(v) => {
                if !vouchers::redeem_voucher(&v.id, &mut tx).await? {
                    return Err(VoucherRejection::LimitReached.into());
                }
                Some(vouchers::insert_order_voucher(&order.id, v, pricing.discount, &mut tx).await?)
            },
            None => None,
        };
        let mut outcome = CheckoutOutcome {
            order,
            items,
            pricing,
            voucher: voucher_link,
            payment: None,
            wallet_transaction: None,
            deliveries: vec![],
        };
        if request.use_wallet {
            if pricing.total.is_positive() {
                let mut description = format!("Payment for order {}", outcome.order.id);
                if let Some(v) = &voucher {
                    description.push_str(&format!(" (Voucher: {})", v.code));
                }
                let debit = NewWalletTransaction::new(WalletTxType::Purchase, pricing.total, "wallet")
                    .with_description(description)
                    .with_reference("order", outcome.order.id.as_str());
                outcome.wallet_transaction = Some(wallets::post_transaction(user_id, debit, &mut tx).await?);
            }
            outcome.order =
                orders::transition_status(&outcome.order.id, OrderStatusType::Pending, OrderStatusType::Paid, &mut tx)
                    .await?
                    .ok_or_else(|| OrderFlowError::InvalidState("Order is no longer pending".to_string()))?;
            outcome.deliveries = inventory::allocate_for_order(&outcome.order.id, &mut tx).await?;
        } else {
            let code = order_payment_code(&outcome.order.id);
            let payment = payments::insert_payment(&outcome.order.id, &method, pricing.total, &code, &mut tx).await?;
            outcome.payment = Some(payment);
        }
        carts::clear_cart(&cart_id, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🧾️ Order {} created for {user_id} via {method}. Subtotal {}, discount {}, total {}",
            outcome.order.id, pricing.subtotal, pricing.discount, pricing.total
        );
        Ok(outcome)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_order_voucher(&self, order_id: &OrderId) -> Result<Option<OrderVoucher>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let link = vouchers::fetch_order_voucher(order_id, &mut conn).await?;
        Ok(link)
    }

    async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<PaymentTransaction>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_for_order(order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn start_payment_for_order(
        &self,
        order_id: &OrderId,
        provider: &str,
    ) -> Result<PaymentTransaction, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock_order(order_id, Utc::now(), &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if order.status != OrderStatusType::Pending {
            return Err(OrderFlowError::InvalidState(format!("Order is {}, not awaiting payment", order.status)));
        }
        let payment = match payments::fetch_payment_for_order(order_id, &mut tx).await? {
            Some(p) if p.status == PaymentStatus::Pending => p,
            _ => {
                let code = order_payment_code(order_id);
                payments::insert_payment(order_id, provider, order.total_amount, &code, &mut tx).await?
            },
        };
        tx.commit().await?;
        Ok(payment)
    }

    async fn fetch_orders_for_user(&self, user_id: &UserId, paging: Paging) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, paging, &mut conn).await?;
        Ok(orders)
    }

    async fn order_stats(&self, user_id: &UserId) -> Result<OrderStats, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let stats = orders::order_stats(user_id, &mut conn).await?;
        Ok(stats)
    }

    async fn refund_order(&self, order_id: &OrderId, reason: &str) -> Result<RefundOutcome, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock_order(order_id, Utc::now(), &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        match order.status {
            OrderStatusType::Refunded => return Err(OrderFlowError::InvalidState("Order already refunded".into())),
            OrderStatusType::Pending => return Err(OrderFlowError::InvalidState("Can only refund paid orders".into())),
            OrderStatusType::Paid => {},
        }
        let order = orders::transition_status(order_id, OrderStatusType::Paid, OrderStatusType::Refunded, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::InvalidState("Can only refund paid orders".into()))?;
        let wallet_transaction = if order.total_amount.is_positive() {
            let credit = NewWalletTransaction::new(WalletTxType::Refund, order.total_amount, "system")
                .with_description(format!("Refund for order {order_id}: {reason}"))
                .with_reference("order_refund", order_id.as_str());
            Some(wallets::post_transaction(&order.user_id, credit, &mut tx).await?)
        } else {
            None
        };
        let mut released_items = Vec::new();
        for item in orders::fetch_order_items(order_id, &mut tx).await? {
            products::adjust_stock(&item.product_id, item.quantity, &mut tx).await?;
            released_items.extend(inventory::release_items(&item.id, &mut tx).await?);
        }
        let voucher_released = match vouchers::fetch_order_voucher(order_id, &mut tx).await? {
            Some(link) => {
                vouchers::release_voucher(&link.voucher_id, &mut tx).await?;
                Some(link.voucher_id)
            },
            None => None,
        };
        tx.commit().await?;
        info!(
            "🧾️ Order {order_id} refunded. {} credited to {}, {} inventory item(s) returned to stock",
            order.total_amount,
            order.user_id,
            released_items.len()
        );
        Ok(RefundOutcome { order, wallet_transaction, released_items, voucher_released })
    }
}

//--------------------------------------       Webhooks       --------------------------------------------------------
impl PaymentReconciliation for SqliteDatabase {
    async fn confirm_order_payment(
        &self,
        code: &str,
        amount: Vnd,
        provider_tx_id: Option<String>,
    ) -> Result<OrderPaymentOutcome, PaymentError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::lock_payment_by_code(code, Utc::now(), &mut tx)
            .await?
            .ok_or_else(|| PaymentError::PaymentNotFound(code.to_string()))?;
        match payment.status {
            PaymentStatus::Success => return Ok(OrderPaymentOutcome::AlreadyProcessed(payment)),
            PaymentStatus::Failed => return Err(PaymentError::PaymentAlreadyFailed(code.to_string())),
            PaymentStatus::Pending => {},
        }
        if amount < payment.amount {
            return Err(PaymentError::AmountMismatch { expected: payment.amount, received: amount });
        }
        let payment = payments::settle_payment(&payment.id, PaymentStatus::Success, provider_tx_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentError::PaymentNotFound(code.to_string()))?;
        let order =
            orders::transition_status(&payment.order_id, OrderStatusType::Pending, OrderStatusType::Paid, &mut tx)
                .await?
                .ok_or_else(|| PaymentError::OrderNotPayable(payment.order_id.clone()))?;
        tx.commit().await?;
        info!("🔔️ Payment {code} confirmed. Order {} is paid", order.id);
        Ok(OrderPaymentOutcome::Confirmed { order, payment })
    }

    async fn fail_order_payment(
        &self,
        code: &str,
        provider_tx_id: Option<String>,
    ) -> Result<OrderPaymentOutcome, PaymentError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::lock_payment_by_code(code, Utc::now(), &mut tx)
            .await?
            .ok_or_else(|| PaymentError::PaymentNotFound(code.to_string()))?;
        let outcome = match payment.status {
            PaymentStatus::Success => OrderPaymentOutcome::AlreadyProcessed(payment),
            PaymentStatus::Failed => OrderPaymentOutcome::Failed(payment),
            PaymentStatus::Pending => {
                let payment = payments::settle_payment(&payment.id, PaymentStatus::Failed, provider_tx_id, &mut tx)
                    .await?
                    .ok_or_else(|| PaymentError::PaymentNotFound(code.to_string()))?;
                info!("🔔️ Payment {code} for order {} marked as failed", payment.order_id);
                OrderPaymentOutcome::Failed(payment)
            },
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn confirm_deposit(
        &self,
        code: &str,
        amount: Vnd,
        provider_tx_id: Option<String>,
    ) -> Result<DepositOutcome, PaymentError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let deposit = deposits::lock_deposit_by_code(code, now, &mut tx)
            .await?
            .ok_or_else(|| PaymentError::DepositNotFound(code.to_string()))?;
        if deposit.status != DepositStatus::Pending {
            if deposit.status == DepositStatus::Expired {
                warn!("🔔️ Transfer for expired deposit {code} received. It needs manual review.");
            }
            return Ok(DepositOutcome::AlreadyProcessed(deposit));
        }
        if amount < deposit.amount {
            return Err(PaymentError::AmountMismatch { expected: deposit.amount, received: amount });
        }
        let deposit = deposits::complete_deposit(&deposit.id, provider_tx_id, now, &mut tx)
            .await?
            .ok_or_else(|| PaymentError::DepositNotFound(code.to_string()))?;
        let credit = NewWalletTransaction::new(WalletTxType::Deposit, deposit.amount, deposit.payment_method.as_str())
            .with_description(format!("Deposit {code}"))
            .with_reference("deposit_request", deposit.id.as_str());
        let transaction = wallets::post_transaction(&deposit.user_id, credit, &mut tx).await?;
        tx.commit().await?;
        info!("🔔️ Deposit {code} completed. {} credited to {}", deposit.amount, deposit.user_id);
        Ok(DepositOutcome::Completed { deposit, transaction })
    }
}

//--------------------------------------       Catalog        --------------------------------------------------------
impl CatalogManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(id, &mut conn).await?;
        Ok(product)
    }

    async fn update_product(&self, id: &ProductId, update: ProductUpdate) -> Result<Product, CatalogError> {
        if update.is_empty() {
            return Err(CatalogError::EmptyUpdate);
        }
        let mut conn = self.pool.acquire().await?;
        products::update_product(id, update, &mut conn).await?.ok_or_else(|| CatalogError::ProductNotFound(id.clone()))
    }

    async fn insert_voucher(&self, voucher: NewVoucher) -> Result<Voucher, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let voucher = vouchers::insert_voucher(voucher, &mut conn).await?;
        Ok(voucher)
    }

    async fn fetch_voucher(&self, id: &VoucherId) -> Result<Option<Voucher>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let voucher = vouchers::fetch_voucher(id, &mut conn).await?;
        Ok(voucher)
    }

    async fn update_voucher(&self, id: &VoucherId, update: VoucherUpdate) -> Result<Voucher, CatalogError> {
        if update.is_empty() {
            return Err(CatalogError::EmptyUpdate);
        }
        let mut conn = self.pool.acquire().await?;
        vouchers::update_voucher(id, update, &mut conn).await?.ok_or_else(|| CatalogError::VoucherNotFound(id.clone()))
    }
}

//--------------------------------------     Permissions      --------------------------------------------------------
impl PermissionManagement for SqliteDatabase {
    async fn fetch_permissions(&self, user_id: &UserId) -> Result<Vec<String>, PermissionError> {
        let mut conn = self.pool.acquire().await?;
        let permissions = permissions::fetch_permissions(user_id, &mut conn).await?;
        Ok(permissions)
    }

    async fn assign_admin_role(&self, user_id: &UserId, role: Option<&str>) -> Result<(), PermissionError> {
        let mut tx = self.pool.begin().await?;
        take_write_lock(&mut tx).await?;
        let role_id = match role {
            Some(name) => Some(
                permissions::fetch_role_id(name, &mut tx)
                    .await?
                    .ok_or_else(|| PermissionError::RoleNotFound(name.to_string()))?,
            ),
            None => None,
        };
        permissions::set_admin_role(user_id, role_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🔐️ Admin role of {user_id} set to {}", role.unwrap_or("none"));
        Ok(())
    }
}
