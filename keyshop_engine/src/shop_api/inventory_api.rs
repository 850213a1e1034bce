use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    db_types::{
        Delivery,
        InventoryItem,
        InventoryItemId,
        NewInventoryItem,
        OrderId,
        OrderItemId,
        ProductId,
        UserDelivery,
        UserId,
        Vnd,
    },
    helpers::{new_batch_id, validate_secret_data, BulkImport},
    traits::{
        BulkImportResult,
        DeliveryManagement,
        InventoryError,
        InventoryManagement,
        InventoryQueryFilter,
        InventoryStats,
    },
};

pub const DEFAULT_EXPIRING_INVENTORY_DAYS: i64 = 7;
pub const DEFAULT_EXPIRING_DELIVERY_DAYS: i64 = 3;

/// Options applied to every row of a bulk import.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub cost_price: Vnd,
    pub account_expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// `InventoryApi` manages the pool of sellable secrets and the buyer-facing deliveries made from it.
pub struct InventoryApi<B> {
    db: B,
}

impl<B: Debug> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi ({:?})", self.db)
    }
}

impl<B: Clone> Clone for InventoryApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    pub async fn add_inventory_item(&self, item: NewInventoryItem) -> Result<InventoryItem, InventoryError> {
        validate_secret_data(&item.secret_data).map_err(InventoryError::InvalidSecret)?;
        let mut items = self.db.insert_inventory_items(vec![item]).await?;
        items.pop().ok_or(InventoryError::EmptyImport)
    }

    /// Splits `import` into individual secrets and inserts them all under a fresh batch id.
    ///
    /// Every entry is validated before anything is written. The import is all or nothing.
    pub async fn import_inventory(
        &self,
        product_id: &ProductId,
        import: BulkImport,
        options: ImportOptions,
    ) -> Result<BulkImportResult, InventoryError> {
        let entries = import.entries();
        if entries.is_empty() {
            return Err(InventoryError::EmptyImport);
        }
        for (i, entry) in entries.iter().enumerate() {
            validate_secret_data(entry).map_err(|e| InventoryError::InvalidSecret(format!("Entry {}: {e}", i + 1)))?;
        }
        let batch_id = new_batch_id(Utc::now());
        let items = entries
            .into_iter()
            .map(|secret| {
                let mut item = NewInventoryItem::new(product_id.clone(), secret)
                    .with_cost_price(options.cost_price)
                    .with_batch(batch_id.as_str(), "bulk_import");
                item.account_expires_at = options.account_expires_at;
                item.notes = options.notes.clone();
                item
            })
            .collect::<Vec<_>>();
        let items = self.db.insert_inventory_items(items).await?;
        info!("📦️ Imported {} inventory item(s) for product {product_id} as batch {batch_id}", items.len());
        Ok(BulkImportResult { batch_id, count: items.len(), items })
    }

    pub async fn fetch_item(&self, id: &InventoryItemId) -> Result<InventoryItem, InventoryError> {
        self.db.fetch_inventory_item(id).await?.ok_or_else(|| InventoryError::ItemNotFound(id.clone()))
    }

    pub async fn list_inventory(
        &self,
        product_id: &ProductId,
        filter: InventoryQueryFilter,
    ) -> Result<Vec<InventoryItem>, InventoryError> {
        self.db.fetch_inventory_for_product(product_id, filter).await
    }

    pub async fn available_count(&self, product_id: &ProductId) -> Result<i64, InventoryError> {
        self.db.available_inventory_count(product_id).await
    }

    pub async fn delete_inventory_item(&self, id: &InventoryItemId) -> Result<InventoryItem, InventoryError> {
        self.db.delete_inventory_item(id).await
    }

    pub async fn inventory_stats(&self, product_id: Option<&ProductId>) -> Result<Vec<InventoryStats>, InventoryError> {
        self.db.inventory_stats(product_id).await
    }

    /// Unsold items whose shelf life ends within `days` (7 if not given).
    pub async fn expiring_inventory(&self, days: Option<i64>) -> Result<Vec<InventoryItem>, InventoryError> {
        let days = days.filter(|d| *d > 0).unwrap_or(DEFAULT_EXPIRING_INVENTORY_DAYS);
        self.db.expiring_inventory(Duration::days(days)).await
    }

    pub async fn refund_inventory(&self, order_item_id: &OrderItemId) -> Result<Vec<InventoryItem>, InventoryError> {
        self.db.refund_inventory(order_item_id).await
    }
}

impl<B> InventoryApi<B>
where B: DeliveryManagement
{
    /// The buyer's resource listing: every delivery of their orders that has not expired yet.
    pub async fn user_resources(&self, user_id: &UserId) -> Result<Vec<UserDelivery>, InventoryError> {
        self.db.fetch_user_deliveries(user_id).await
    }

    pub async fn order_deliveries(&self, order_id: &OrderId) -> Result<Vec<Delivery>, InventoryError> {
        self.db.fetch_order_deliveries(order_id).await
    }

    pub async fn expiring_deliveries(&self, days: Option<i64>) -> Result<Vec<UserDelivery>, InventoryError> {
        let days = days.filter(|d| *d > 0).unwrap_or(DEFAULT_EXPIRING_DELIVERY_DAYS);
        self.db.fetch_expiring_deliveries(Duration::days(days)).await
    }

    pub async fn delete_expired_deliveries(&self) -> Result<Vec<Delivery>, InventoryError> {
        let deleted = self.db.delete_expired_deliveries().await?;
        if !deleted.is_empty() {
            debug!("📦️ {} expired deliveries removed", deleted.len());
        }
        Ok(deleted)
    }
}
