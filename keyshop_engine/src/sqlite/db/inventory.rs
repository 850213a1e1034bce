use chrono::{DateTime, Duration, Utc};
use log::{debug, trace, warn};
use sqlx::{QueryBuilder, SqliteConnection};

use super::{deliveries, orders};
use crate::{
    db_types::{
        Delivery,
        InventoryItem,
        InventoryItemId,
        NewInventoryItem,
        OrderId,
        OrderItemId,
        OrderStatusType,
        ProductId,
    },
    traits::{InventoryError, InventoryQueryFilter, InventoryStats, StockSyncResult},
};

/// How long a buyer can see an allocated secret.
pub const DELIVERY_WINDOW_DAYS: i64 = 30;
/// Candidate re-selection rounds per order line before allocation gives up on a contended product.
const MAX_CLAIM_ROUNDS: usize = 5;

pub async fn insert_inventory_item(
    item: NewInventoryItem,
    conn: &mut SqliteConnection,
) -> Result<InventoryItem, sqlx::Error> {
    let now = Utc::now();
    let item = sqlx::query_as(
        r#"
            INSERT INTO inventory_items (
                id, product_id, secret_data, batch_id, cost_price, source, notes, is_sold, account_expires_at,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $9)
            RETURNING *;
        "#,
    )
    .bind(InventoryItemId::random())
    .bind(item.product_id)
    .bind(item.secret_data.trim())
    .bind(item.batch_id)
    .bind(item.cost_price)
    .bind(item.source)
    .bind(item.notes)
    .bind(item.account_expires_at)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_inventory_item(
    id: &InventoryItemId,
    conn: &mut SqliteConnection,
) -> Result<Option<InventoryItem>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM inventory_items WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(item)
}

pub async fn fetch_inventory_for_product(
    product_id: &ProductId,
    filter: InventoryQueryFilter,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<InventoryItem>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM inventory_items WHERE product_id = ");
    builder.push_bind(product_id);
    if !filter.show_sold {
        builder.push(" AND is_sold = 0");
    }
    if !filter.show_expired {
        // Sold items stay visible regardless of shelf life; expiry only matters while an item is for sale.
        builder.push(" AND (is_sold = 1 OR account_expires_at IS NULL OR account_expires_at > ");
        builder.push_bind(now);
        builder.push(")");
    }
    builder.push(" ORDER BY created_at DESC, rowid DESC LIMIT ");
    builder.push_bind(filter.limit);
    builder.push(" OFFSET ");
    builder.push_bind(filter.offset);
    let items = builder.build_query_as::<InventoryItem>().fetch_all(conn).await?;
    Ok(items)
}

pub async fn available_count(
    product_id: &ProductId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        r#"
            SELECT COUNT(*) FROM inventory_items
            WHERE product_id = $1 AND is_sold = 0 AND (account_expires_at IS NULL OR account_expires_at > $2)
        "#,
    )
    .bind(product_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// Deletes the item if it is unsold. Returns `None` if nothing was deleted.
pub async fn delete_unsold_item(
    id: &InventoryItemId,
    conn: &mut SqliteConnection,
) -> Result<Option<InventoryItem>, sqlx::Error> {
    let item = sqlx::query_as("DELETE FROM inventory_items WHERE id = $1 AND is_sold = 0 RETURNING *")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(item)
}

pub async fn inventory_stats(
    product_id: Option<&ProductId>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<InventoryStats>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
        SELECT
            p.id AS product_id,
            p.name AS product_name,
            COUNT(i.id) AS total,
            COALESCE(SUM(CASE WHEN i.is_sold = 0 AND (i.account_expires_at IS NULL OR i.account_expires_at > "#,
    );
    builder.push_bind(now);
    builder.push(
        r#") THEN 1 ELSE 0 END), 0) AS available,
            COALESCE(SUM(CASE WHEN i.is_sold = 1 THEN 1 ELSE 0 END), 0) AS sold,
            COALESCE(SUM(CASE WHEN i.is_sold = 0 AND i.account_expires_at IS NOT NULL AND i.account_expires_at <= "#,
    );
    builder.push_bind(now);
    builder.push(
        r#" THEN 1 ELSE 0 END), 0) AS expired,
            COALESCE(SUM(i.cost_price), 0) AS total_cost
        FROM products p
        LEFT JOIN inventory_items i ON i.product_id = p.id
        "#,
    );
    if let Some(id) = product_id {
        builder.push(" WHERE p.id = ");
        builder.push_bind(id);
    }
    builder.push(" GROUP BY p.id, p.name ORDER BY p.name");
    let stats = builder.build_query_as::<InventoryStats>().fetch_all(conn).await?;
    Ok(stats)
}

pub async fn expiring_inventory(
    now: DateTime<Utc>,
    until: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<InventoryItem>, sqlx::Error> {
    let items = sqlx::query_as(
        r#"
            SELECT * FROM inventory_items
            WHERE is_sold = 0 AND account_expires_at IS NOT NULL AND account_expires_at > $1 AND account_expires_at <= $2
            ORDER BY account_expires_at ASC
        "#,
    )
    .bind(now)
    .bind(until)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Up to `limit` available items for the product, oldest first.
async fn select_candidates(
    product_id: &ProductId,
    limit: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<InventoryItemId>, sqlx::Error> {
    let ids = sqlx::query_scalar(
        r#"
            SELECT id FROM inventory_items
            WHERE product_id = $1 AND is_sold = 0 AND (account_expires_at IS NULL OR account_expires_at > $2)
            ORDER BY created_at ASC, rowid ASC
            LIMIT $3
        "#,
    )
    .bind(product_id)
    .bind(now)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(ids)
}

/// Compare-and-swap claim of a single item. Returns the claimed item, or `None` if somebody else got there first (or
/// the item expired in the meantime).
async fn claim_item(
    id: &InventoryItemId,
    order_item_id: &OrderItemId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<InventoryItem>, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
            UPDATE inventory_items SET is_sold = 1, sold_at = $1, order_item_id = $2, updated_at = $1
            WHERE id = $3 AND is_sold = 0 AND (account_expires_at IS NULL OR account_expires_at > $1)
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(order_item_id)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(item)
}

async fn allocated_count_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar(
        r#"
            SELECT COUNT(*) FROM inventory_items i JOIN order_items oi ON oi.id = i.order_item_id
            WHERE oi.order_id = $1
        "#,
    )
    .bind(order_id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// Allocates inventory for every line of a paid order and creates the matching deliveries.
///
/// This is not atomic on its own. Run it inside a transaction and roll back on error, otherwise a shortfall on a
/// later line leaves the earlier lines allocated.
pub async fn allocate_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Delivery>, InventoryError> {
    let now = Utc::now();
    let order =
        orders::lock_order(order_id, now, conn).await?.ok_or_else(|| InventoryError::OrderNotFound(order_id.clone()))?;
    if order.status != OrderStatusType::Paid {
        return Err(InventoryError::OrderNotPaid(order_id.clone()));
    }
    if allocated_count_for_order(order_id, conn).await? > 0 {
        return Err(InventoryError::AlreadyFulfilled(order_id.clone()));
    }
    let expires_at = now + Duration::days(DELIVERY_WINDOW_DAYS);
    let mut result = Vec::new();
    for line in orders::fetch_order_items(order_id, conn).await? {
        let mut claimed = 0i64;
        let mut rounds = 0usize;
        while claimed < line.quantity {
            if rounds == MAX_CLAIM_ROUNDS {
                warn!("📦️ Gave up claiming inventory for {} on order {order_id}", line.product_id);
                return Err(InventoryError::AllocationContention(line.product_id));
            }
            rounds += 1;
            let needed = line.quantity - claimed;
            let candidates = select_candidates(&line.product_id, needed, now, conn).await?;
            if (candidates.len() as i64) < needed {
                return Err(InventoryError::InsufficientInventory {
                    product_id: line.product_id,
                    product_name: line.name,
                    requested: line.quantity,
                    available: claimed + candidates.len() as i64,
                });
            }
            for candidate in candidates {
                match claim_item(&candidate, &line.id, now, conn).await? {
                    Some(item) => {
                        let delivery = deliveries::insert_delivery(&line.id, &item.secret_data, expires_at, conn).await?;
                        result.push(delivery);
                        claimed += 1;
                    },
                    None => trace!("📦️ Lost the claim on inventory item {candidate}"),
                }
            }
        }
        debug!("📦️ Allocated {claimed} item(s) of {} to order {order_id}", line.product_id);
    }
    Ok(result)
}

/// Returns the items held by `order_item_id` to the available pool and stamps a refund note on each.
pub async fn release_items(
    order_item_id: &OrderItemId,
    conn: &mut SqliteConnection,
) -> Result<Vec<InventoryItem>, sqlx::Error> {
    let now = Utc::now();
    let note = format!("[REFUNDED: {}]", now.to_rfc3339());
    let items = sqlx::query_as(
        r#"
            UPDATE inventory_items SET
                is_sold = 0,
                sold_at = NULL,
                order_item_id = NULL,
                notes = CASE WHEN notes IS NULL OR notes = '' THEN $1 ELSE notes || ' ' || $1 END,
                updated_at = $2
            WHERE order_item_id = $3
            RETURNING *;
        "#,
    )
    .bind(note)
    .bind(now)
    .bind(order_item_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Rebuilds the stock counter from live inventory. Only changed products are written and reported.
pub async fn sync_stock(
    product_id: Option<&ProductId>,
    conn: &mut SqliteConnection,
) -> Result<Vec<StockSyncResult>, sqlx::Error> {
    let now = Utc::now();
    let mut builder = QueryBuilder::new(
        r#"
        SELECT p.id AS product_id, p.stock AS old_stock, (
            SELECT COUNT(*) FROM inventory_items i
            WHERE i.product_id = p.id AND i.is_sold = 0 AND (i.account_expires_at IS NULL OR i.account_expires_at > "#,
    );
    builder.push_bind(now);
    builder.push(")) AS new_stock FROM products p");
    if let Some(id) = product_id {
        builder.push(" WHERE p.id = ");
        builder.push_bind(id);
    }
    let counts = builder.build_query_as::<StockSyncResult>().fetch_all(&mut *conn).await?;
    let mut changed = Vec::new();
    for count in counts.into_iter().filter(|c| c.old_stock != c.new_stock) {
        sqlx::query("UPDATE products SET stock = $1, updated_at = $2 WHERE id = $3")
            .bind(count.new_stock)
            .bind(now)
            .bind(&count.product_id)
            .execute(&mut *conn)
            .await?;
        changed.push(count);
    }
    Ok(changed)
}
