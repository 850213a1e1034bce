//! # Keyshop engine public API
//!
//! The `shop_api` module exposes the programmatic API of the shop. The API is modular, so that clients can pick the
//! parts they need, and each part only asks its backend for the traits it actually uses.
//!
//! * [`inventory_api`] manages the secret pool: single and bulk import, listings, stats and buyer deliveries.
//! * [`wallet_api`] is the user and admin side of the wallet ledger: deposits, history, debits, credits and manual
//!   adjustments.
//! * [`checkout_api`] covers carts, voucher previews, checkout, order details and refunds.
//! * [`fulfillment_api`] allocates inventory to paid orders and reports failures loudly.
//! * [`webhook_api`] reconciles provider transfer notifications with pending payments and deposits.
//! * [`stock_sync_api`] recomputes cached product stock from live inventory.
//! * [`permission_api`] checks named admin permissions through an injected cache.
//! * [`catalog_api`] is the minimal product and voucher administration.
//!
//! # API usage
//!
//! An API instance is created by supplying a backend that implements the traits the API needs:
//!
//! ```rust,ignore
//! use keyshop_engine::{InventoryApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/keyshop.db", 5).await?;
//! // SqliteDatabase implements InventoryManagement
//! let api = InventoryApi::new(db);
//! let stats = api.inventory_stats(None).await?;
//! ```
pub mod catalog_api;
pub mod checkout_api;
pub mod fulfillment_api;
pub mod inventory_api;
pub mod payment_instructions;
pub mod permission_api;
pub mod stock_sync_api;
pub mod wallet_api;
pub mod webhook_api;
pub mod webhook_objects;
