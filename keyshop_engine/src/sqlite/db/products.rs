use chrono::Utc;
use log::debug;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::db_types::{NewProduct, Product, ProductId, ProductUpdate};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let now = Utc::now();
    let product: Product = sqlx::query_as(
        r#"
            INSERT INTO products (id, name, slug, description, price, stock, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $7)
            RETURNING *;
        "#,
    )
    .bind(ProductId::random())
    .bind(product.name)
    .bind(product.slug)
    .bind(product.description)
    .bind(product.price)
    .bind(product.is_active)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Product [{}] inserted with id {}", product.slug, product.id);
    Ok(product)
}

pub async fn fetch_product(id: &ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

/// Each field of [`ProductUpdate`] maps to exactly one column. Returns `None` if the product does not exist.
pub async fn update_product(
    id: &ProductId,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE products SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(name) = update.name {
        builder.push(", name = ").push_bind(name);
    }
    if let Some(slug) = update.slug {
        builder.push(", slug = ").push_bind(slug);
    }
    if let Some(description) = update.description {
        builder.push(", description = ").push_bind(description);
    }
    if let Some(price) = update.price {
        builder.push(", price = ").push_bind(price);
    }
    if let Some(is_active) = update.is_active {
        builder.push(", is_active = ").push_bind(is_active);
    }
    builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
    let product = builder.build_query_as::<Product>().fetch_optional(conn).await?;
    Ok(product)
}

/// Best-effort adjustment of the cached stock counter. The counter never goes below zero; `sync_stock` corrects any
/// drift.
pub async fn adjust_stock(product_id: &ProductId, delta: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE products SET stock = MAX(stock + $1, 0), updated_at = $2 WHERE id = $3")
        .bind(delta)
        .bind(Utc::now())
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(())
}
