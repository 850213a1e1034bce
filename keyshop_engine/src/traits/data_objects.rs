use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    db_types::{
        Delivery,
        DepositRequest,
        DepositStatus,
        InventoryItem,
        Order,
        OrderItem,
        OrderVoucher,
        PaymentTransaction,
        ProductId,
        VoucherDiscount,
        VoucherId,
        Vnd,
        WalletTransaction,
        WalletTxType,
    },
    traits::OrderFlowError,
};

/// Providers that settle orders through a bank transfer webhook.
pub const EXTERNAL_PAYMENT_METHODS: &[&str] = &["sepay", "momo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default = "default_page_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Default for Paging {
    fn default() -> Self {
        Self { limit: default_page_limit(), offset: 0 }
    }
}

fn default_page_limit() -> i64 {
    20
}

fn default_inventory_limit() -> i64 {
    100
}

fn default_true() -> bool {
    true
}

//--------------------------------------      Inventory       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryQueryFilter {
    #[serde(default = "default_true")]
    pub show_sold: bool,
    #[serde(default)]
    pub show_expired: bool,
    #[serde(default = "default_inventory_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Default for InventoryQueryFilter {
    fn default() -> Self {
        Self { show_sold: true, show_expired: false, limit: default_inventory_limit(), offset: 0 }
    }
}

impl InventoryQueryFilter {
    pub fn available_only(mut self) -> Self {
        self.show_sold = false;
        self.show_expired = false;
        self
    }

    pub fn with_expired(mut self) -> Self {
        self.show_expired = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct InventoryStats {
    pub product_id: ProductId,
    pub product_name: String,
    pub total: i64,
    pub available: i64,
    pub sold: i64,
    /// Unsold items whose shelf life has ended.
    pub expired: i64,
    pub total_cost: Vnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkImportResult {
    pub batch_id: String,
    pub count: usize,
    pub items: Vec<InventoryItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StockSyncResult {
    pub product_id: ProductId,
    pub old_stock: i64,
    pub new_stock: i64,
}

//--------------------------------------        Wallet        --------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WalletStats {
    pub total_deposits: Vnd,
    pub total_purchases: Vnd,
    pub total_refunds: Vnd,
    pub deposit_count: i64,
    pub purchase_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransactionFilter {
    #[serde(default, rename = "type")]
    pub tx_type: Option<WalletTxType>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default = "default_page_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Default for WalletTransactionFilter {
    fn default() -> Self {
        Self { tx_type: None, from: None, to: None, limit: default_page_limit(), offset: 0 }
    }
}

impl WalletTransactionFilter {
    pub fn with_type(mut self, tx_type: WalletTxType) -> Self {
        self.tx_type = Some(tx_type);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositQueryFilter {
    #[serde(default)]
    pub status: Option<DepositStatus>,
    #[serde(default = "default_page_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Default for DepositQueryFilter {
    fn default() -> Self {
        Self { status: None, limit: default_page_limit(), offset: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentResult {
    pub transaction: WalletTransaction,
    /// The balance written by the same atomic unit as `transaction`.
    pub new_balance: Vnd,
}

//--------------------------------------   Checkout/Orders    --------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default, alias = "payment_method")]
    pub payment_method: Option<String>,
    #[serde(default, alias = "use_wallet")]
    pub use_wallet: bool,
    #[serde(default, alias = "voucher_code")]
    pub voucher_code: Option<String>,
}

impl CheckoutRequest {
    pub fn wallet() -> Self {
        Self { payment_method: None, use_wallet: true, voucher_code: None }
    }

    pub fn external<S: Into<String>>(method: S) -> Self {
        Self { payment_method: Some(method.into()), use_wallet: false, voucher_code: None }
    }

    pub fn with_voucher<S: Into<String>>(mut self, code: S) -> Self {
        self.voucher_code = Some(code.into());
        self
    }

    /// `wallet` when paying from the wallet, otherwise the requested provider (`sepay` if none was given).
    ///
    /// Only the providers in [`EXTERNAL_PAYMENT_METHODS`] can settle an order outside the wallet. Asking for `wallet`
    /// without `use_wallet` is rejected too.
    pub fn resolved_payment_method(&self) -> Result<String, OrderFlowError> {
        if self.use_wallet {
            return Ok("wallet".to_string());
        }
        let method = self
            .payment_method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "sepay".to_string());
        if EXTERNAL_PAYMENT_METHODS.contains(&method.as_str()) {
            Ok(method)
        } else {
            Err(OrderFlowError::Validation(format!("Unsupported payment method: {method}")))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub pricing: VoucherDiscount,
    pub voucher: Option<OrderVoucher>,
    /// The pending provider payment, on the external path.
    pub payment: Option<PaymentTransaction>,
    /// The purchase debit, on the wallet path.
    pub wallet_transaction: Option<WalletTransaction>,
    /// Allocated secrets, on the wallet path.
    pub deliveries: Vec<Delivery>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending: i64,
    pub paid: i64,
    pub refunded: i64,
    pub total_spent: Vnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub order: Order,
    /// `None` only for orders with a zero total.
    pub wallet_transaction: Option<WalletTransaction>,
    pub released_items: Vec<InventoryItem>,
    pub voucher_released: Option<VoucherId>,
}

//--------------------------------------       Webhooks       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderPaymentOutcome {
    /// The payment was settled by this call. The order is now paid and must be fulfilled.
    Confirmed { order: Order, payment: PaymentTransaction },
    /// The payment had already succeeded. Nothing was changed.
    AlreadyProcessed(PaymentTransaction),
    /// The provider reported a failed transfer. The payment is now `failed`.
    Failed(PaymentTransaction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositOutcome {
    Completed { deposit: DepositRequest, transaction: WalletTransaction },
    AlreadyProcessed(DepositRequest),
}
