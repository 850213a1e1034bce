use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Delivery, OrderId},
    events::{EventProducers, FulfillmentFailedEvent, OrderFulfilledEvent},
    publish,
    traits::{InventoryError, InventoryManagement},
};

/// Turns a paid order into delivered secrets.
///
/// `FulfillmentApi` takes no compensating action when allocation fails. The order stays paid and the failure is
/// logged and published, because the buyer has already been charged and somebody has to sort it out by hand.
pub struct FulfillmentApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Debug> Debug for FulfillmentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FulfillmentApi ({:?})", self.db)
    }
}

impl<B: Clone> Clone for FulfillmentApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone() }
    }
}

impl<B> FulfillmentApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> FulfillmentApi<B>
where B: InventoryManagement
{
    pub async fn fulfill_order(&self, order_id: &OrderId) -> Result<Vec<Delivery>, InventoryError> {
        match self.db.allocate_inventory_for_order(order_id).await {
            Ok(deliveries) => {
                info!("📦️ Order {order_id} fulfilled with {} item(s)", deliveries.len());
                publish!(self.producers.order_fulfilled_producer, OrderFulfilledEvent::new(order_id.clone(), deliveries.clone()));
                Ok(deliveries)
            },
            Err(e) => {
                error!("📦️ Paid order {order_id} could not be fulfilled: {e}. This order needs manual resolution.");
                publish!(self.producers.fulfillment_failed_producer, FulfillmentFailedEvent::new(order_id.clone(), e.to_string()));
                Err(e)
            },
        }
    }
}
