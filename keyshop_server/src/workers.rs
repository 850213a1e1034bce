//! Background sweepers.
//!
//! Each worker is a `tokio` task that wakes up on a fixed interval. A failed run is logged and the worker carries on
//! with the next tick. Do not await the returned [`JoinHandle`]s, as the workers run indefinitely.
use std::time::Duration;

use keyshop_engine::{InventoryApi, SqliteDatabase, StockSyncApi, WalletApi};
use log::*;
use tokio::task::JoinHandle;

/// Removes deliveries whose account has expired, so they drop out of the owners' resource lists.
pub fn start_delivery_sweeper(api: InventoryApi<SqliteDatabase>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Expired delivery sweeper started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running expired delivery sweep");
            match api.delete_expired_deliveries().await {
                Ok(removed) if removed.is_empty() => trace!("🕰️ No expired deliveries"),
                Ok(removed) => {
                    info!("🕰️ {} expired deliveries removed", removed.len());
                    let ids = removed.iter().map(|d| d.id.as_str()).collect::<Vec<_>>().join(", ");
                    debug!("🕰️ Removed deliveries: {ids}");
                },
                Err(e) => error!("🕰️ Error running the expired delivery sweep: {e}"),
            }
        }
    })
}

/// Marks pending deposit requests as expired once their payment window has closed.
pub fn start_deposit_sweeper(api: WalletApi<SqliteDatabase>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Deposit expiry sweeper started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running deposit expiry sweep");
            match api.expire_deposits().await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No deposit requests expired"),
                Ok(expired) => {
                    info!("🕰️ {} deposit requests expired", expired.len());
                    let codes = expired.iter().map(|d| d.payment_code.as_str()).collect::<Vec<_>>().join(", ");
                    debug!("🕰️ Expired deposit codes: {codes}");
                },
                Err(e) => error!("🕰️ Error running the deposit expiry sweep: {e}"),
            }
        }
    })
}

/// Recomputes every product's stock counter from the inventory pool.
pub fn start_stock_sync_worker(api: StockSyncApi<SqliteDatabase>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Stock sync worker started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            match api.sync_all().await {
                Ok(changed) if changed.is_empty() => trace!("🕰️ Stock counters are in sync"),
                Ok(changed) => info!("🕰️ Stock sync corrected {} product(s)", changed.len()),
                Err(e) => error!("🕰️ Error running the stock sync: {e}"),
            }
        }
    })
}
