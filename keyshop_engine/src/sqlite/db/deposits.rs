use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{DepositRequest, DepositRequestId, NewDepositRequest, UserId, WalletId},
    traits::DepositQueryFilter,
};

pub async fn insert_deposit_request(
    request: NewDepositRequest,
    wallet_id: &WalletId,
    conn: &mut SqliteConnection,
) -> Result<DepositRequest, sqlx::Error> {
    let deposit: DepositRequest = sqlx::query_as(
        r#"
            INSERT INTO deposit_requests (
                id, user_id, wallet_id, amount, payment_method, payment_code, status, expires_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8, $8)
            RETURNING *;
        "#,
    )
    .bind(DepositRequestId::random())
    .bind(request.user_id)
    .bind(wallet_id)
    .bind(request.amount)
    .bind(request.payment_method)
    .bind(request.payment_code)
    .bind(request.expires_at)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Deposit request {} for {} created with code {}", deposit.id, deposit.amount, deposit.payment_code);
    Ok(deposit)
}

pub async fn fetch_deposit_request(
    user_id: &UserId,
    id: &DepositRequestId,
    conn: &mut SqliteConnection,
) -> Result<Option<DepositRequest>, sqlx::Error> {
    let deposit = sqlx::query_as("SELECT * FROM deposit_requests WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(deposit)
}

pub async fn fetch_deposit_requests(
    user_id: &UserId,
    filter: DepositQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<DepositRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM deposit_requests WHERE user_id = ");
    builder.push_bind(user_id);
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.to_string());
    }
    builder.push(" ORDER BY created_at DESC, rowid DESC LIMIT ").push_bind(filter.limit);
    builder.push(" OFFSET ").push_bind(filter.offset);
    let deposits = builder.build_query_as::<DepositRequest>().fetch_all(conn).await?;
    Ok(deposits)
}

/// Touches the deposit request with `code`, taking the write lock for the calling unit.
pub async fn lock_deposit_by_code(
    code: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<DepositRequest>, sqlx::Error> {
    let deposit = sqlx::query_as("UPDATE deposit_requests SET updated_at = $1 WHERE payment_code = $2 RETURNING *")
        .bind(now)
        .bind(code)
        .fetch_optional(conn)
        .await?;
    Ok(deposit)
}

/// Moves a pending request to `completed`. Returns `None` if the request was not pending.
pub async fn complete_deposit(
    id: &DepositRequestId,
    provider_tx_id: Option<String>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<DepositRequest>, sqlx::Error> {
    let deposit = sqlx::query_as(
        r#"
            UPDATE deposit_requests SET status = 'completed', provider_tx_id = $1, completed_at = $2, updated_at = $2
            WHERE id = $3 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(provider_tx_id)
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(deposit)
}

pub async fn expire_deposit_requests(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<DepositRequest>, sqlx::Error> {
    let expired = sqlx::query_as(
        r#"
            UPDATE deposit_requests SET status = 'expired', updated_at = $1
            WHERE status = 'pending' AND expires_at < $1
            RETURNING *;
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(expired)
}
