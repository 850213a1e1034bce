use serde::{Deserialize, Serialize};

use crate::db_types::{
    Delivery,
    DepositRequest,
    Order,
    OrderId,
    PaymentTransaction,
    Vnd,
    WalletTransaction,
};

/// Published once an order moves from `pending` to `paid`, whichever payment path was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    /// Set when the order was paid through an external provider.
    pub payment: Option<PaymentTransaction>,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order, payment: None }
    }

    pub fn with_payment(mut self, payment: PaymentTransaction) -> Self {
        self.payment = Some(payment);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFulfilledEvent {
    pub order_id: OrderId,
    pub deliveries: Vec<Delivery>,
}

impl OrderFulfilledEvent {
    pub fn new(order_id: OrderId, deliveries: Vec<Delivery>) -> Self {
        Self { order_id, deliveries }
    }
}

/// A paid order could not be fulfilled. Somebody has to resolve this by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentFailedEvent {
    pub order_id: OrderId,
    pub reason: String,
}

impl FulfillmentFailedEvent {
    pub fn new<S: Into<String>>(order_id: OrderId, reason: S) -> Self {
        Self { order_id, reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRefundedEvent {
    pub order: Order,
    pub amount: Vnd,
    pub reason: String,
}

impl OrderRefundedEvent {
    pub fn new(order: Order, reason: String) -> Self {
        let amount = order.total_amount;
        Self { order, amount, reason }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositCompletedEvent {
    pub deposit: DepositRequest,
    pub transaction: WalletTransaction,
}

impl DepositCompletedEvent {
    pub fn new(deposit: DepositRequest, transaction: WalletTransaction) -> Self {
        Self { deposit, transaction }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderPaid(OrderPaidEvent),
    OrderFulfilled(OrderFulfilledEvent),
    FulfillmentFailed(FulfillmentFailedEvent),
    OrderRefunded(OrderRefundedEvent),
    DepositCompleted(DepositCompletedEvent),
}
