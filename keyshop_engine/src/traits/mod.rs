//! # Backend contracts
//!
//! These traits define what a storage backend must provide for the shop engine to run on it. Every method that
//! changes more than one row is a single atomic unit: it either applies completely or leaves no trace.
//!
//! * [`InventoryManagement`] holds the secret pool: insertion, allocation to paid orders, refunds and stock sync.
//! * [`DeliveryManagement`] exposes the buyer-visible copies of allocated secrets.
//! * [`WalletManagement`] is the wallet ledger. `post_transaction` is the only way a balance changes.
//! * [`OrderManagement`] covers carts, checkout, orders and refunds.
//! * [`PaymentReconciliation`] settles external payments and wallet deposits reported by provider webhooks.
//! * [`CatalogManagement`] is the minimal product and voucher plumbing the flows above depend on.
//! * [`PermissionManagement`] maps users to named admin permissions.
mod catalog_management;
mod data_objects;
mod delivery_management;
mod inventory_management;
mod order_management;
mod payment_reconciliation;
mod permission_management;
mod wallet_management;

pub use catalog_management::{CatalogError, CatalogManagement};
pub use data_objects::{
    AdjustmentResult,
    BulkImportResult,
    CheckoutOutcome,
    CheckoutRequest,
    DepositOutcome,
    DepositQueryFilter,
    EXTERNAL_PAYMENT_METHODS,
    InventoryQueryFilter,
    InventoryStats,
    OrderPaymentOutcome,
    OrderStats,
    Paging,
    RefundOutcome,
    StockSyncResult,
    WalletStats,
    WalletTransactionFilter,
};
pub use delivery_management::DeliveryManagement;
pub use inventory_management::{InventoryError, InventoryManagement};
pub use order_management::{OrderFlowError, OrderManagement};
pub use payment_reconciliation::{PaymentError, PaymentReconciliation};
pub use permission_management::{PermissionError, PermissionManagement};
pub use wallet_management::{WalletError, WalletManagement};
