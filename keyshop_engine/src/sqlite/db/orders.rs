use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Order, OrderId, OrderItem, OrderItemId, OrderStatusType, ProductId, UserId, Vnd},
    traits::{OrderStats, Paging},
};

pub async fn insert_order(
    user_id: &UserId,
    total_amount: Vnd,
    payment_method: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (id, user_id, status, total_amount, payment_method, created_at, updated_at)
            VALUES ($1, $2, 'pending', $3, $4, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(OrderId::random())
    .bind(user_id)
    .bind(total_amount)
    .bind(payment_method)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order {} inserted for user {user_id}. Total {}", order.id, order.total_amount);
    Ok(order)
}

pub async fn insert_order_item(
    order_id: &OrderId,
    product_id: &ProductId,
    name: &str,
    price: Vnd,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (id, order_id, product_id, name, price, quantity, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(OrderItemId::random())
    .bind(order_id)
    .bind(product_id)
    .bind(name)
    .bind(price)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

/// Touches the order row so that the calling unit holds the write lock before it reads the order state.
pub async fn lock_order(
    order_id: &OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET updated_at = $1 WHERE id = $2 RETURNING *")
        .bind(now)
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Moves the order from `from` to `to`. Returns `None` (and changes nothing) if the order is not in state `from`.
pub async fn transition_status(
    order_id: &OrderId,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING *")
        .bind(to)
        .bind(Utc::now())
        .bind(order_id)
        .bind(from)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at ASC, rowid ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_orders_for_user(
    user_id: &UserId,
    paging: Paging,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, rowid DESC LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(paging.limit)
    .bind(paging.offset)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub async fn order_stats(user_id: &UserId, conn: &mut SqliteConnection) -> Result<OrderStats, sqlx::Error> {
    let stats = sqlx::query_as(
        r#"
            SELECT
                COUNT(*) AS total_orders,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN status = 'paid' THEN 1 ELSE 0 END), 0) AS paid,
                COALESCE(SUM(CASE WHEN status = 'refunded' THEN 1 ELSE 0 END), 0) AS refunded,
                COALESCE(SUM(CASE WHEN status = 'paid' THEN total_amount ELSE 0 END), 0) AS total_spent
            FROM orders WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(stats)
}
