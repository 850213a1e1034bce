use std::fmt::Debug;

use log::*;

use crate::{
    db_types::ProductId,
    traits::{InventoryError, InventoryManagement, StockSyncResult},
};

/// Recomputes the cached `stock` of products from live inventory.
///
/// The cached value is only a display hint, so syncing is always safe and can run as often as needed.
pub struct StockSyncApi<B> {
    db: B,
}

impl<B: Debug> Debug for StockSyncApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StockSyncApi ({:?})", self.db)
    }
}

impl<B: Clone> Clone for StockSyncApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> StockSyncApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> StockSyncApi<B>
where B: InventoryManagement
{
    /// Syncs every product. Only products whose stock actually changed are returned.
    pub async fn sync_all(&self) -> Result<Vec<StockSyncResult>, InventoryError> {
        let changed = self.db.sync_stock(None).await?;
        for c in &changed {
            debug!("📦️ Stock of {} corrected from {} to {}", c.product_id, c.old_stock, c.new_stock);
        }
        Ok(changed)
    }

    pub async fn sync_product(&self, product_id: &ProductId) -> Result<Vec<StockSyncResult>, InventoryError> {
        self.db.sync_stock(Some(product_id)).await
    }
}
