use chrono::Duration;

use crate::{
    db_types::{Delivery, OrderId, UserDelivery, UserId},
    traits::InventoryError,
};

/// Read and sweep access to deliveries. Deliveries are only ever created by inventory allocation.
#[allow(async_fn_in_trait)]
pub trait DeliveryManagement: Clone {
    /// The unexpired deliveries across all of the user's orders, newest first.
    async fn fetch_user_deliveries(&self, user_id: &UserId) -> Result<Vec<UserDelivery>, InventoryError>;

    async fn fetch_order_deliveries(&self, order_id: &OrderId) -> Result<Vec<Delivery>, InventoryError>;

    /// Unexpired deliveries whose access window closes within `within` from now.
    async fn fetch_expiring_deliveries(&self, within: Duration) -> Result<Vec<UserDelivery>, InventoryError>;

    /// Deletes every delivery whose `expires_at` has passed and returns the deleted rows.
    async fn delete_expired_deliveries(&self) -> Result<Vec<Delivery>, InventoryError>;
}
