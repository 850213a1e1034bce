use thiserror::Error;

use crate::{
    db_types::{
        CartItem,
        Order,
        OrderId,
        OrderItem,
        OrderVoucher,
        PaymentTransaction,
        ProductId,
        UserId,
        Voucher,
        VoucherRejection,
    },
    traits::{
        data_objects::{CheckoutOutcome, CheckoutRequest, OrderStats, Paging, RefundOutcome},
        InventoryError,
        WalletError,
    },
};

/// Carts, checkout and the order life cycle (`pending -> paid -> refunded`).
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    async fn fetch_cart(&self, user_id: &UserId) -> Result<Vec<CartItem>, OrderFlowError>;

    /// Adds `quantity` units of an active product to the cart, snapshotting the current price. Adding a product that
    /// is already in the cart increases its quantity.
    async fn add_to_cart(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartItem, OrderFlowError>;

    /// Sets the quantity of a cart line. A quantity of zero or less removes the line and returns `None`.
    async fn update_cart_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Option<CartItem>, OrderFlowError>;

    async fn remove_from_cart(&self, user_id: &UserId, product_id: &ProductId) -> Result<bool, OrderFlowError>;

    async fn clear_cart(&self, user_id: &UserId) -> Result<u64, OrderFlowError>;

    async fn fetch_voucher_by_code(&self, code: &str) -> Result<Option<Voucher>, OrderFlowError>;

    /// Turns the user's cart into an order in one atomic unit.
    ///
    /// * The voucher, if any, is validated and redeemed in the same unit as the order insert.
    /// * Wallet path: the order is debited, marked paid and allocated before the unit commits. Any failure along the
    ///   way (balance, inventory) leaves no order, no debit and no redemption behind.
    /// * External path: the order stays pending and a pending payment with its reconciliation code is created.
    ///
    /// The cart is cleared only when the unit commits.
    async fn checkout(&self, user_id: &UserId, request: &CheckoutRequest) -> Result<CheckoutOutcome, OrderFlowError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError>;

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, OrderFlowError>;

    async fn fetch_order_voucher(&self, order_id: &OrderId) -> Result<Option<OrderVoucher>, OrderFlowError>;

    /// The most recent provider payment for the order.
    async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<PaymentTransaction>, OrderFlowError>;

    /// Returns the order's pending provider payment, creating one if there is none. The order must be pending.
    async fn start_payment_for_order(
        &self,
        order_id: &OrderId,
        provider: &str,
    ) -> Result<PaymentTransaction, OrderFlowError>;

    /// Newest first.
    async fn fetch_orders_for_user(&self, user_id: &UserId, paging: Paging) -> Result<Vec<Order>, OrderFlowError>;

    async fn order_stats(&self, user_id: &UserId) -> Result<OrderStats, OrderFlowError>;

    /// Refunds a paid order to the buyer's wallet in one atomic unit: the status moves to `refunded`, the wallet is
    /// credited, the line quantities go back onto the stock counter, the voucher redemption is released and the
    /// allocated inventory returns to the pool.
    async fn refund_order(&self, order_id: &OrderId, reason: &str) -> Result<RefundOutcome, OrderFlowError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Product {0} is not available for sale")]
    ProductUnavailable(ProductId),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),
    #[error("{0}")]
    Voucher(#[from] VoucherRejection),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Inventory(#[from] InventoryError),
    #[error("{0}")]
    Wallet(#[from] WalletError),
}

impl OrderFlowError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::EmptyCart => "EMPTY_CART",
            Self::ProductNotFound(_) | Self::OrderNotFound(_) => "NOT_FOUND",
            Self::ProductUnavailable(_) => "PRODUCT_UNAVAILABLE",
            Self::InvalidQuantity(_) | Self::Validation(_) => "VALIDATION_ERROR",
            Self::Voucher(VoucherRejection::NotFound) => "VOUCHER_NOT_FOUND",
            Self::Voucher(VoucherRejection::NotYetValid) => "VOUCHER_NOT_YET_VALID",
            Self::Voucher(VoucherRejection::Expired) => "VOUCHER_EXPIRED",
            Self::Voucher(VoucherRejection::LimitReached) => "VOUCHER_LIMIT_REACHED",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Inventory(e) => e.reason(),
            Self::Wallet(e) => e.reason(),
        }
    }
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}
