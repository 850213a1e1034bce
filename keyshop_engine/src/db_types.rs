//! Data types shared between the storage backends and the public API.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use ksp_common::Vnd;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     Identifiers     ---------------------------------------------------------
macro_rules! id_type {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
            #[sqlx(transparent)]
            #[serde(transparent)]
            pub struct $name(pub String);

            impl $name {
                /// Generates a fresh random (v4 UUID) identifier.
                pub fn random() -> Self {
                    Self(uuid::Uuid::new_v4().to_string())
                }

                pub fn as_str(&self) -> &str {
                    self.0.as_str()
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }
        )+
    };
}

id_type!(
    /// The subject id yielded by bearer verification.
    UserId,
    ProductId,
    OrderId,
    OrderItemId,
    InventoryItemId,
    WalletId,
    DepositRequestId,
    VoucherId,
    PaymentId,
);

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind} value: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// Order states. Transitions are monotonic: `Pending -> Paid -> Refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order exists, but no payment has been confirmed.
    Pending,
    /// Payment has been captured.
    Paid,
    /// The order was paid and has since been refunded to the buyer's wallet. Terminal.
    Refunded,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError::new("order status", s)),
        }
    }
}

//--------------------------------------    PaymentStatus     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

//--------------------------------------    DepositStatus     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    Pending,
    Completed,
    Expired,
}

impl Display for DepositStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for DepositStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "expired" => Ok(Self::Expired),
            s => Err(ConversionError::new("deposit status", s)),
        }
    }
}

//--------------------------------------    WalletTxType      --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WalletTxType {
    Deposit,
    Purchase,
    Refund,
    Withdraw,
}

impl WalletTxType {
    /// Purchases and withdrawals take money out of the wallet.
    pub fn is_debit(&self) -> bool {
        matches!(self, Self::Purchase | Self::Withdraw)
    }

    /// Applies the sign implied by this transaction type to a (positive) amount.
    pub fn signed(&self, amount: Vnd) -> Vnd {
        if self.is_debit() {
            -amount
        } else {
            amount
        }
    }
}

impl Display for WalletTxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Purchase => write!(f, "purchase"),
            Self::Refund => write!(f, "refund"),
            Self::Withdraw => write!(f, "withdraw"),
        }
    }
}

impl FromStr for WalletTxType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "purchase" => Ok(Self::Purchase),
            "refund" => Ok(Self::Refund),
            "withdraw" => Ok(Self::Withdraw),
            s => Err(ConversionError::new("wallet transaction type", s)),
        }
    }
}

//--------------------------------------         Role         --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    /// Holds every permission implicitly.
    Super,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
            Self::Super => write!(f, "super"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "super" => Ok(Self::Super),
            s => Err(ConversionError::new("role", s)),
        }
    }
}

//--------------------------------------        Product       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Vnd,
    /// Cached count of available inventory. Allocation never reads this.
    pub stock: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Vnd,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, slug: S, price: Vnd) -> Self {
        Self { name: name.into(), slug: slug.into(), description: None, price, is_active: true }
    }
}

/// The fields of a product that may be changed after creation. Anything else in an update request is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<Vnd>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.is_active.is_none()
    }
}

//--------------------------------------     InventoryItem    --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub product_id: ProductId,
    pub secret_data: String,
    pub batch_id: Option<String>,
    pub cost_price: Vnd,
    pub source: String,
    pub notes: Option<String>,
    pub is_sold: bool,
    pub sold_at: Option<DateTime<Utc>>,
    pub order_item_id: Option<OrderItemId>,
    /// Shelf life of the secret itself. Unrelated to how long a buyer can see a delivery.
    pub account_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        !self.is_sold && self.account_expires_at.map(|t| t > now).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub product_id: ProductId,
    pub secret_data: String,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub cost_price: Vnd,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub account_expires_at: Option<DateTime<Utc>>,
}

impl NewInventoryItem {
    pub fn new<S: Into<String>>(product_id: ProductId, secret_data: S) -> Self {
        Self {
            product_id,
            secret_data: secret_data.into(),
            batch_id: None,
            cost_price: Vnd::default(),
            source: default_source(),
            notes: None,
            account_expires_at: None,
        }
    }

    pub fn with_cost_price(mut self, cost_price: Vnd) -> Self {
        self.cost_price = cost_price;
        self
    }

    pub fn with_account_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.account_expires_at = Some(expires_at);
        self
    }

    pub fn with_batch<S: Into<String>>(mut self, batch_id: S, source: S) -> Self {
        self.batch_id = Some(batch_id.into());
        self.source = source.into();
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

fn default_source() -> String {
    "manual".to_string()
}

fn default_true() -> bool {
    true
}

//--------------------------------------       Delivery       --------------------------------------------------------
/// The buyer-visible copy of an allocated secret.
///
/// `data` is copied at allocation time, so later edits or refunds of the inventory row never change what the buyer
/// already received.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Delivery {
    pub id: String,
    pub order_item_id: OrderItemId,
    pub data: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A delivery joined to its order line, as shown in the buyer's resource listing.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserDelivery {
    pub id: String,
    pub order_item_id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub data: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    Order/OrderItem   --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatusType,
    pub total_amount: Vnd,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Name and price are snapshots taken at checkout.
    pub name: String,
    pub price: Vnd,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn line_total(&self) -> Vnd {
        self.price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Vnd,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    pub fn line_total(&self) -> Vnd {
        self.price * self.quantity
    }
}

//--------------------------------------        Wallet        --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub balance: Vnd,
    /// Sum of all `deposit` transactions.
    pub total_deposited: Vnd,
    /// Sum of all `purchase` transactions.
    pub total_spent: Vnd,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable wallet audit row. `amount` is always positive; the sign comes from `tx_type`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: String,
    pub wallet_id: WalletId,
    pub user_id: UserId,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub tx_type: WalletTxType,
    pub amount: Vnd,
    pub balance_before: Vnd,
    pub balance_after: Vnd,
    pub description: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub status: String,
    pub provider: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWalletTransaction {
    pub tx_type: WalletTxType,
    pub amount: Vnd,
    pub description: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub provider: String,
}

impl NewWalletTransaction {
    pub fn new<S: Into<String>>(tx_type: WalletTxType, amount: Vnd, provider: S) -> Self {
        Self {
            tx_type,
            amount,
            description: None,
            reference_type: None,
            reference_id: None,
            provider: provider.into(),
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_reference<S: Into<String>, T: Into<String>>(mut self, reference_type: S, reference_id: T) -> Self {
        self.reference_type = Some(reference_type.into());
        self.reference_id = Some(reference_id.into());
        self
    }
}

//--------------------------------------    DepositRequest    --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DepositRequest {
    pub id: DepositRequestId,
    pub user_id: UserId,
    pub wallet_id: WalletId,
    pub amount: Vnd,
    pub payment_method: String,
    pub payment_code: String,
    pub status: DepositStatus,
    pub provider_tx_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DepositRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == DepositStatus::Pending && now > self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDepositRequest {
    pub user_id: UserId,
    pub amount: Vnd,
    pub payment_method: String,
    pub payment_code: String,
    pub expires_at: DateTime<Utc>,
}

//--------------------------------------  PaymentTransaction  --------------------------------------------------------
/// An order payment through an external provider, matched by `code`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub provider: String,
    pub provider_tx_id: Option<String>,
    pub amount: Vnd,
    pub status: PaymentStatus,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       Voucher        --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub code: String,
    pub description: Option<String>,
    pub discount_percent: Option<i64>,
    pub discount_amount: Option<Vnd>,
    pub max_uses: Option<i64>,
    pub used_count: i64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoucherRejection {
    #[error("Voucher not found or inactive")]
    NotFound,
    #[error("Voucher not yet valid")]
    NotYetValid,
    #[error("Voucher expired")]
    Expired,
    #[error("Voucher limit reached")]
    LimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherDiscount {
    pub subtotal: Vnd,
    pub discount: Vnd,
    pub total: Vnd,
}

impl Voucher {
    /// Checks activity, the validity window and remaining uses, in that order.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), VoucherRejection> {
        if !self.is_active {
            return Err(VoucherRejection::NotFound);
        }
        if self.valid_from.map(|t| now < t).unwrap_or(false) {
            return Err(VoucherRejection::NotYetValid);
        }
        if self.valid_to.map(|t| now > t).unwrap_or(false) {
            return Err(VoucherRejection::Expired);
        }
        if self.max_uses.map(|max| self.used_count >= max).unwrap_or(false) {
            return Err(VoucherRejection::LimitReached);
        }
        Ok(())
    }

    /// Percent discount first, then the flat amount. Neither step can take the total below zero.
    pub fn apply_to(&self, subtotal: Vnd) -> VoucherDiscount {
        let mut total = subtotal;
        if let Some(pct) = self.discount_percent.filter(|p| *p > 0) {
            total = total.saturating_sub(subtotal.percent(pct.min(100)));
        }
        if let Some(flat) = self.discount_amount.filter(|a| a.is_positive()) {
            total = total.saturating_sub(flat);
        }
        VoucherDiscount { subtotal, discount: subtotal - total, total }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVoucher {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub discount_percent: Option<i64>,
    #[serde(default)]
    pub discount_amount: Option<Vnd>,
    #[serde(default)]
    pub max_uses: Option<i64>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewVoucher {
    pub fn percent<S: Into<String>>(code: S, pct: i64) -> Self {
        Self {
            code: code.into(),
            description: None,
            discount_percent: Some(pct),
            discount_amount: None,
            max_uses: None,
            valid_from: None,
            valid_to: None,
            is_active: true,
        }
    }

    pub fn flat<S: Into<String>>(code: S, amount: Vnd) -> Self {
        Self { discount_percent: None, discount_amount: Some(amount), ..Self::percent(code, 0) }
    }

    pub fn with_max_uses(mut self, max_uses: i64) -> Self {
        self.max_uses = Some(max_uses);
        self
    }

    pub fn with_validity(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.valid_from = from;
        self.valid_to = to;
        self
    }
}

/// Voucher fields an admin may change. `used_count` is only ever changed by checkout and refund.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoucherUpdate {
    pub description: Option<String>,
    pub discount_percent: Option<i64>,
    pub discount_amount: Option<Vnd>,
    pub max_uses: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl VoucherUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.discount_percent.is_none()
            && self.discount_amount.is_none()
            && self.max_uses.is_none()
            && self.valid_from.is_none()
            && self.valid_to.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderVoucher {
    pub order_id: OrderId,
    pub voucher_id: VoucherId,
    pub code: String,
    pub discount_amount: Vnd,
    pub created_at: DateTime<Utc>,
}
