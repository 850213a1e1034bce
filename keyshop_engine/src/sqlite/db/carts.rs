use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{CartItem, ProductId, UserId, Vnd};

const CART_ITEM_COLUMNS: &str = r#"
    SELECT ci.id, ci.cart_id, ci.product_id, p.name AS product_name, ci.price, ci.quantity, ci.created_at,
           ci.updated_at
    FROM cart_items ci
    JOIN carts c ON c.id = ci.cart_id
    JOIN products p ON p.id = ci.product_id
"#;

/// Creates the user's cart if necessary and touches it, taking the write lock for the calling unit. Returns the
/// cart id.
pub async fn lock_cart(user_id: &UserId, now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<String, sqlx::Error> {
    let id = sqlx::query_scalar(
        r#"
            INSERT INTO carts (id, user_id, created_at, updated_at) VALUES ($1, $2, $3, $3)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = excluded.updated_at
            RETURNING id;
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn fetch_cart_items(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let q = format!("{CART_ITEM_COLUMNS} WHERE c.user_id = $1 ORDER BY ci.created_at ASC, ci.rowid ASC");
    let items = sqlx::query_as(&q).bind(user_id).fetch_all(conn).await?;
    Ok(items)
}

pub async fn fetch_cart_item(
    cart_id: &str,
    product_id: &ProductId,
    conn: &mut SqliteConnection,
) -> Result<Option<CartItem>, sqlx::Error> {
    let q = format!("{CART_ITEM_COLUMNS} WHERE ci.cart_id = $1 AND ci.product_id = $2");
    let item = sqlx::query_as(&q).bind(cart_id).bind(product_id).fetch_optional(conn).await?;
    Ok(item)
}

/// Adds `quantity` to the cart line, creating it if needed. The line price is refreshed to `price`.
pub async fn upsert_cart_item(
    cart_id: &str,
    product_id: &ProductId,
    price: Vnd,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO cart_items (id, cart_id, product_id, price, quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET
                quantity = cart_items.quantity + excluded.quantity,
                price = excluded.price,
                updated_at = excluded.updated_at;
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(cart_id)
    .bind(product_id)
    .bind(price)
    .bind(quantity)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn set_cart_item_quantity(
    cart_id: &str,
    product_id: &ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE cart_items SET quantity = $1, updated_at = $2 WHERE cart_id = $3 AND product_id = $4")
            .bind(quantity)
            .bind(Utc::now())
            .bind(cart_id)
            .bind(product_id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_cart_item(
    cart_id: &str,
    product_id: &ProductId,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn clear_cart(cart_id: &str, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(conn).await?;
    Ok(result.rows_affected())
}
