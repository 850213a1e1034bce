use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{Delivery, OrderId, OrderItemId, UserDelivery, UserId};

const USER_DELIVERY_COLUMNS: &str = r#"
    SELECT d.id, d.order_item_id, oi.order_id, oi.product_id, oi.name AS product_name, d.data, d.expires_at,
           d.created_at
    FROM order_item_deliveries d
    JOIN order_items oi ON oi.id = d.order_item_id
    JOIN orders o ON o.id = oi.order_id
"#;

pub async fn insert_delivery(
    order_item_id: &OrderItemId,
    data: &str,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Delivery, sqlx::Error> {
    let delivery = sqlx::query_as(
        r#"
            INSERT INTO order_item_deliveries (id, order_item_id, data, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(order_item_id)
    .bind(data)
    .bind(expires_at)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(delivery)
}

pub async fn fetch_user_deliveries(
    user_id: &UserId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<UserDelivery>, sqlx::Error> {
    let q = format!("{USER_DELIVERY_COLUMNS} WHERE o.user_id = $1 AND d.expires_at > $2 ORDER BY d.created_at DESC");
    let deliveries = sqlx::query_as(&q).bind(user_id).bind(now).fetch_all(conn).await?;
    Ok(deliveries)
}

pub async fn fetch_order_deliveries(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Delivery>, sqlx::Error> {
    let deliveries = sqlx::query_as(
        r#"
            SELECT d.* FROM order_item_deliveries d
            JOIN order_items oi ON oi.id = d.order_item_id
            WHERE oi.order_id = $1
            ORDER BY d.created_at ASC, d.rowid ASC
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(deliveries)
}

/// Deliveries that are still visible now, but whose window closes before `until`.
pub async fn fetch_expiring_deliveries(
    now: DateTime<Utc>,
    until: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<UserDelivery>, sqlx::Error> {
    let q = format!("{USER_DELIVERY_COLUMNS} WHERE d.expires_at > $1 AND d.expires_at <= $2 ORDER BY d.expires_at ASC");
    let deliveries = sqlx::query_as(&q).bind(now).bind(until).fetch_all(conn).await?;
    Ok(deliveries)
}

pub async fn delete_expired_deliveries(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Delivery>, sqlx::Error> {
    let deleted =
        sqlx::query_as("DELETE FROM order_item_deliveries WHERE expires_at <= $1 RETURNING *").bind(now).fetch_all(conn).await?;
    Ok(deleted)
}
