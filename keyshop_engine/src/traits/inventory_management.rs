use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{Delivery, InventoryItem, InventoryItemId, NewInventoryItem, OrderId, OrderItemId, ProductId},
    traits::data_objects::{InventoryQueryFilter, InventoryStats, StockSyncResult},
};

/// The secret inventory ledger.
///
/// Authority over what is available always lies with the inventory rows themselves. `products.stock` is a cache that
/// backends refresh after inventory mutations and that [`InventoryManagement::sync_stock`] can rebuild at any time.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement: Clone {
    /// Inserts the items in one atomic unit and refreshes the stock counter of every product touched.
    async fn insert_inventory_items(&self, items: Vec<NewInventoryItem>) -> Result<Vec<InventoryItem>, InventoryError>;

    async fn fetch_inventory_item(&self, id: &InventoryItemId) -> Result<Option<InventoryItem>, InventoryError>;

    /// Newest first.
    async fn fetch_inventory_for_product(
        &self,
        product_id: &ProductId,
        filter: InventoryQueryFilter,
    ) -> Result<Vec<InventoryItem>, InventoryError>;

    /// Unsold items whose shelf life has not ended.
    async fn available_inventory_count(&self, product_id: &ProductId) -> Result<i64, InventoryError>;

    /// Deletes an unsold item. Sold items are part of an order's history and cannot be deleted.
    async fn delete_inventory_item(&self, id: &InventoryItemId) -> Result<InventoryItem, InventoryError>;

    async fn inventory_stats(&self, product_id: Option<&ProductId>) -> Result<Vec<InventoryStats>, InventoryError>;

    /// Unsold items whose shelf life ends within `within` from now.
    async fn expiring_inventory(&self, within: Duration) -> Result<Vec<InventoryItem>, InventoryError>;

    /// Allocates inventory to every line of a paid order, oldest items first, and creates a delivery for each
    /// allocated item.
    ///
    /// All-or-nothing: if any line cannot be fully satisfied, nothing is allocated and
    /// [`InventoryError::InsufficientInventory`] names the first short product.
    async fn allocate_inventory_for_order(&self, order_id: &OrderId) -> Result<Vec<Delivery>, InventoryError>;

    /// Returns the items allocated to `order_item_id` to the available pool. Deliveries already issued are kept.
    async fn refund_inventory(&self, order_item_id: &OrderItemId) -> Result<Vec<InventoryItem>, InventoryError>;

    /// Recomputes `products.stock` from the live inventory, for one product or all of them. Only products whose
    /// counter changed are reported.
    async fn sync_stock(&self, product_id: Option<&ProductId>) -> Result<Vec<StockSyncResult>, InventoryError>;
}

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Inventory item {0} does not exist")]
    ItemNotFound(InventoryItemId),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Inventory item {0} has been sold and cannot be modified")]
    ItemAlreadySold(InventoryItemId),
    #[error("Invalid inventory data: {0}")]
    InvalidSecret(String),
    #[error("No inventory items were supplied")]
    EmptyImport,
    #[error("Insufficient inventory for {product_name}: requested {requested}, available {available}")]
    InsufficientInventory { product_id: ProductId, product_name: String, requested: i64, available: i64 },
    #[error("Order {0} is not paid, so it cannot be fulfilled")]
    OrderNotPaid(OrderId),
    #[error("Order {0} has already been fulfilled")]
    AlreadyFulfilled(OrderId),
    #[error("Could not claim inventory for product {0} after repeated contention")]
    AllocationContention(ProductId),
}

impl InventoryError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::ProductNotFound(_) | Self::ItemNotFound(_) | Self::OrderNotFound(_) => "NOT_FOUND",
            Self::ItemAlreadySold(_) | Self::OrderNotPaid(_) | Self::AlreadyFulfilled(_) => "INVALID_STATE",
            Self::InvalidSecret(_) | Self::EmptyImport => "VALIDATION_ERROR",
            Self::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            Self::AllocationContention(_) => "CONFLICT",
        }
    }

    pub fn shortfall(&self) -> Option<i64> {
        match self {
            Self::InsufficientInventory { requested, available, .. } => Some(requested - available),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }
}
