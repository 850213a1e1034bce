use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{OrderId, PaymentId, PaymentStatus, PaymentTransaction, Vnd};

pub async fn insert_payment(
    order_id: &OrderId,
    provider: &str,
    amount: Vnd,
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<PaymentTransaction, sqlx::Error> {
    let payment: PaymentTransaction = sqlx::query_as(
        r#"
            INSERT INTO transactions (id, order_id, provider, amount, status, code, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, $6)
            RETURNING *;
        "#,
    )
    .bind(PaymentId::random())
    .bind(order_id)
    .bind(provider)
    .bind(amount)
    .bind(code)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Payment {} ({}) for order {order_id} created. Code {code}", payment.id, payment.provider);
    Ok(payment)
}

pub async fn fetch_payment_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    let payment = sqlx::query_as(
        "SELECT * FROM transactions WHERE order_id = $1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Locks the payment that a notification with `code` refers to.
///
/// Several payments can share a code when a buyer retried after a failed transfer. A successful payment wins, then
/// the newest pending one, then the newest failed one.
pub async fn lock_payment_by_code(
    code: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            UPDATE transactions SET updated_at = $1
            WHERE id = (
                SELECT id FROM transactions WHERE code = $2
                ORDER BY CASE status WHEN 'success' THEN 0 WHEN 'pending' THEN 1 ELSE 2 END, created_at DESC, rowid DESC
                LIMIT 1
            )
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(code)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Settles a pending payment. Returns `None` if it was no longer pending.
pub async fn settle_payment(
    id: &PaymentId,
    status: PaymentStatus,
    provider_tx_id: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            UPDATE transactions SET status = $1, provider_tx_id = COALESCE($2, provider_tx_id), updated_at = $3
            WHERE id = $4 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(provider_tx_id)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}
