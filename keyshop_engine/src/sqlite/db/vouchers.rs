use chrono::Utc;
use log::debug;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::db_types::{NewVoucher, OrderId, OrderVoucher, Vnd, Voucher, VoucherId, VoucherUpdate};

pub async fn insert_voucher(voucher: NewVoucher, conn: &mut SqliteConnection) -> Result<Voucher, sqlx::Error> {
    let now = Utc::now();
    let voucher: Voucher = sqlx::query_as(
        r#"
            INSERT INTO vouchers (
                id, code, description, discount_percent, discount_amount, max_uses, used_count,
                valid_from, valid_to, is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $9, $10, $10)
            RETURNING *;
        "#,
    )
    .bind(VoucherId::random())
    .bind(voucher.code.trim().to_uppercase())
    .bind(voucher.description)
    .bind(voucher.discount_percent)
    .bind(voucher.discount_amount)
    .bind(voucher.max_uses)
    .bind(voucher.valid_from)
    .bind(voucher.valid_to)
    .bind(voucher.is_active)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Voucher {} inserted with id {}", voucher.code, voucher.id);
    Ok(voucher)
}

pub async fn fetch_voucher(id: &VoucherId, conn: &mut SqliteConnection) -> Result<Option<Voucher>, sqlx::Error> {
    let voucher = sqlx::query_as("SELECT * FROM vouchers WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(voucher)
}

/// Codes are matched case-insensitively.
pub async fn fetch_voucher_by_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<Voucher>, sqlx::Error> {
    let voucher = sqlx::query_as("SELECT * FROM vouchers WHERE code = $1")
        .bind(code.trim().to_uppercase())
        .fetch_optional(conn)
        .await?;
    Ok(voucher)
}

pub async fn update_voucher(
    id: &VoucherId,
    update: VoucherUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Voucher>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE vouchers SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(description) = update.description {
        builder.push(", description = ").push_bind(description);
    }
    if let Some(pct) = update.discount_percent {
        builder.push(", discount_percent = ").push_bind(pct);
    }
    if let Some(amount) = update.discount_amount {
        builder.push(", discount_amount = ").push_bind(amount);
    }
    if let Some(max_uses) = update.max_uses {
        builder.push(", max_uses = ").push_bind(max_uses);
    }
    if let Some(valid_from) = update.valid_from {
        builder.push(", valid_from = ").push_bind(valid_from);
    }
    if let Some(valid_to) = update.valid_to {
        builder.push(", valid_to = ").push_bind(valid_to);
    }
    if let Some(is_active) = update.is_active {
        builder.push(", is_active = ").push_bind(is_active);
    }
    builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
    let voucher = builder.build_query_as::<Voucher>().fetch_optional(conn).await?;
    Ok(voucher)
}

/// Takes one use of the voucher. Returns `false` if no uses remain, in which case nothing was changed.
pub async fn redeem_voucher(id: &VoucherId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE vouchers SET used_count = used_count + 1, updated_at = $1
            WHERE id = $2 AND (max_uses IS NULL OR used_count < max_uses)
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Gives back one use of the voucher, never going below zero.
pub async fn release_voucher(id: &VoucherId, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE vouchers SET used_count = MAX(used_count - 1, 0), updated_at = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_order_voucher(
    order_id: &OrderId,
    voucher: &Voucher,
    discount: Vnd,
    conn: &mut SqliteConnection,
) -> Result<OrderVoucher, sqlx::Error> {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO order_vouchers (order_id, voucher_id, discount_amount, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(order_id)
    .bind(&voucher.id)
    .bind(discount)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(OrderVoucher {
        order_id: order_id.clone(),
        voucher_id: voucher.id.clone(),
        code: voucher.code.clone(),
        discount_amount: discount,
        created_at: now,
    })
}

pub async fn fetch_order_voucher(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderVoucher>, sqlx::Error> {
    let link = sqlx::query_as(
        r#"
            SELECT ov.order_id, ov.voucher_id, v.code, ov.discount_amount, ov.created_at
            FROM order_vouchers ov JOIN vouchers v ON v.id = ov.voucher_id
            WHERE ov.order_id = $1
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(link)
}
