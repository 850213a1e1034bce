//! Keyshop Engine
//!
//! The Keyshop engine is the core of a shop selling digital goods (accounts, license keys, API keys). Goods are
//! delivered from a pre-provisioned pool of secrets instead of being shipped. This library contains the core logic and
//! is independent of any HTTP framework.
//!
//! The library is divided into two main sections:
//! 1. Storage ([`mod@traits`] and [`mod@sqlite`]). The traits define what a backend must provide, and
//!    [`SqliteDatabase`] implements all of them. Every multi-step operation is one atomic unit. The data types used by
//!    the backends live in [`mod@db_types`] and are public.
//! 2. The public API ([`mod@shop_api`]). This is the functionality the server exposes: inventory, the wallet ledger,
//!    checkout, fulfillment, payment webhooks, stock sync and permissions.
//!
//! The engine also publishes events when orders are paid, fulfilled or refunded, when fulfillment fails and when
//! deposits complete. See [`mod@events`] for how to subscribe to them.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod shop_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use shop_api::{
    catalog_api::CatalogApi,
    checkout_api::{CartView, CheckoutApi, CheckoutResponse, OrderDetail, PaymentStart, VoucherPreview},
    fulfillment_api::FulfillmentApi,
    inventory_api::{ImportOptions, InventoryApi},
    payment_instructions::{PaymentInstructions, PaymentProviderConfig},
    permission_api::{PermissionApi, PermissionCache},
    stock_sync_api::StockSyncApi,
    wallet_api::{DepositStatusReport, DepositTicket, WalletApi, WalletInfo},
    webhook_api::PaymentWebhookApi,
    webhook_objects::{
        CombinedWebhookResult,
        DepositWebhookResult,
        OrderWebhookResult,
        TransferNotification,
        WebhookResponse,
    },
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
