use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        CartItem,
        Delivery,
        Order,
        OrderId,
        OrderItem,
        OrderVoucher,
        PaymentTransaction,
        ProductId,
        UserId,
        Vnd,
        VoucherDiscount,
        VoucherRejection,
        WalletTransaction,
    },
    events::{EventProducers, OrderFulfilledEvent, OrderPaidEvent, OrderRefundedEvent},
    publish,
    shop_api::payment_instructions::{PaymentInstructions, PaymentProviderConfig},
    traits::{
        CheckoutOutcome,
        CheckoutRequest,
        DeliveryManagement,
        OrderFlowError,
        OrderManagement,
        OrderStats,
        Paging,
        RefundOutcome,
        WalletManagement,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub subtotal: Vnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    #[serde(flatten)]
    pub outcome: CheckoutOutcome,
    /// Present on the external payment path.
    pub instructions: Option<PaymentInstructions>,
}

impl CheckoutResponse {
    pub fn order_id(&self) -> &OrderId {
        &self.outcome.order.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherPreview {
    pub code: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub pricing: VoucherDiscount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStart {
    pub payment: PaymentTransaction,
    pub instructions: PaymentInstructions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub deliveries: Vec<Delivery>,
    pub voucher: Option<OrderVoucher>,
    pub wallet_transaction: Option<WalletTransaction>,
    pub payment: Option<PaymentTransaction>,
}

/// `CheckoutApi` turns carts into orders and owns the order lifecycle that follows.
///
/// Wallet checkouts are paid and fulfilled inside the checkout itself. External checkouts leave a pending order and
/// a payment record; [`crate::PaymentWebhookApi`] completes them.
pub struct CheckoutApi<B> {
    db: B,
    producers: EventProducers,
    providers: PaymentProviderConfig,
}

impl<B: Debug> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({:?})", self.db)
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B, producers: EventProducers, providers: PaymentProviderConfig) -> Self {
        Self { db, producers, providers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> CheckoutApi<B>
where B: OrderManagement
{
    pub async fn cart(&self, user_id: &UserId) -> Result<CartView, OrderFlowError> {
        let items = self.db.fetch_cart(user_id).await?;
        let subtotal = items.iter().map(CartItem::line_total).sum();
        Ok(CartView { items, subtotal })
    }

    pub async fn add_to_cart(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartItem, OrderFlowError> {
        self.db.add_to_cart(user_id, product_id, quantity).await
    }

    /// Sets the quantity of a cart line. A quantity of zero or less removes the line, and `None` is returned.
    pub async fn update_cart_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Option<CartItem>, OrderFlowError> {
        self.db.update_cart_item(user_id, product_id, quantity).await
    }

    pub async fn remove_from_cart(&self, user_id: &UserId, product_id: &ProductId) -> Result<bool, OrderFlowError> {
        self.db.remove_from_cart(user_id, product_id).await
    }

    pub async fn clear_cart(&self, user_id: &UserId) -> Result<u64, OrderFlowError> {
        self.db.clear_cart(user_id).await
    }

    /// Previews the discount `code` would give on `subtotal`. Nothing is redeemed.
    pub async fn check_voucher(&self, code: &str, subtotal: Vnd) -> Result<VoucherPreview, OrderFlowError> {
        if subtotal.value() < 0 {
            return Err(OrderFlowError::Validation("Subtotal cannot be negative".into()));
        }
        let voucher = self.db.fetch_voucher_by_code(code).await?.ok_or(VoucherRejection::NotFound)?;
        voucher.check(Utc::now())?;
        let pricing = voucher.apply_to(subtotal);
        Ok(VoucherPreview { code: voucher.code, description: voucher.description, pricing })
    }

    pub async fn checkout(&self, user_id: &UserId, request: CheckoutRequest) -> Result<CheckoutResponse, OrderFlowError> {
        request.resolved_payment_method()?;
        let outcome = self.db.checkout(user_id, &request).await?;
        let instructions = match &outcome.payment {
            Some(payment) => Some(self.providers.instructions_for(&payment.provider, payment.amount, &payment.code)),
            None => {
                publish!(self.producers.order_paid_producer, OrderPaidEvent::new(outcome.order.clone()));
                publish!(
                    self.producers.order_fulfilled_producer,
                    OrderFulfilledEvent::new(outcome.order.id.clone(), outcome.deliveries.clone())
                );
                None
            },
        };
        Ok(CheckoutResponse { outcome, instructions })
    }

    /// Returns the pending payment for one of the user's orders, creating it if necessary.
    pub async fn start_payment(&self, user_id: &UserId, order_id: &OrderId) -> Result<PaymentStart, OrderFlowError> {
        let order = self.owned_order(user_id, order_id).await?;
        if order.payment_method == "wallet" {
            return Err(OrderFlowError::InvalidState("Wallet orders are paid at checkout".into()));
        }
        let payment = self.db.start_payment_for_order(order_id, &order.payment_method).await?;
        let instructions = self.providers.instructions_for(&payment.provider, payment.amount, &payment.code);
        Ok(PaymentStart { payment, instructions })
    }

    pub async fn user_orders(&self, user_id: &UserId, paging: Paging) -> Result<Vec<Order>, OrderFlowError> {
        self.db.fetch_orders_for_user(user_id, paging).await
    }

    pub async fn order_stats(&self, user_id: &UserId) -> Result<OrderStats, OrderFlowError> {
        self.db.order_stats(user_id).await
    }

    /// Refunds a paid order to the buyer's wallet and returns its secrets to the pool.
    pub async fn refund_order(&self, order_id: &OrderId, reason: &str) -> Result<RefundOutcome, OrderFlowError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(OrderFlowError::Validation("A refund reason is required".into()));
        }
        let outcome = self.db.refund_order(order_id, reason).await?;
        publish!(self.producers.order_refunded_producer, OrderRefundedEvent::new(outcome.order.clone(), reason.to_string()));
        Ok(outcome)
    }

    /// Other users' orders are reported as missing.
    async fn owned_order(&self, user_id: &UserId, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        match self.db.fetch_order(order_id).await? {
            Some(order) if order.user_id == *user_id => Ok(order),
            _ => Err(OrderFlowError::OrderNotFound(order_id.clone())),
        }
    }
}

impl<B> CheckoutApi<B>
where B: OrderManagement + DeliveryManagement + WalletManagement
{
    pub async fn order_detail(&self, user_id: &UserId, order_id: &OrderId) -> Result<OrderDetail, OrderFlowError> {
        let order = self.owned_order(user_id, order_id).await?;
        let items = self.db.fetch_order_items(order_id).await?;
        let deliveries = self.db.fetch_order_deliveries(order_id).await?;
        let voucher = self.db.fetch_order_voucher(order_id).await?;
        let (wallet_transaction, payment) = if order.payment_method == "wallet" {
            let txs = self.db.fetch_wallet_transactions_for_reference("order", order_id.as_str()).await?;
            (txs.into_iter().next(), None)
        } else {
            (None, self.db.fetch_payment_for_order(order_id).await?)
        };
        trace!("🧾️ Order detail for {order_id}: {} item(s), {} delivery(ies)", items.len(), deliveries.len());
        Ok(OrderDetail { order, items, deliveries, voucher, wallet_transaction, payment })
    }
}
