use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewWalletTransaction, UserId, Vnd, Wallet, WalletId, WalletTransaction, WalletTxType},
    traits::{WalletError, WalletStats, WalletTransactionFilter},
};

pub async fn fetch_wallet(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Option<Wallet>, sqlx::Error> {
    let wallet = sqlx::query_as("SELECT * FROM wallets WHERE user_id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(wallet)
}

/// Creates the user's wallet if necessary and touches the row, taking the write lock for the calling unit. The
/// returned row is current for as long as the unit is open.
pub async fn lock_wallet(
    user_id: &UserId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Wallet, sqlx::Error> {
    let wallet = sqlx::query_as(
        r#"
            INSERT INTO wallets (id, user_id, balance, total_deposited, total_spent, created_at, updated_at)
            VALUES ($1, $2, 0, 0, 0, $3, $3)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(WalletId::random())
    .bind(user_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(wallet)
}

/// Applies a ledger entry to the user's wallet and appends the audit row.
///
/// This is not atomic on its own. Callers run it inside a transaction. Since it locks the wallet row before reading
/// the balance, concurrent postings on the same wallet are serialised.
pub async fn post_transaction(
    user_id: &UserId,
    tx: NewWalletTransaction,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, WalletError> {
    if !tx.amount.is_positive() {
        return Err(WalletError::InvalidAmount(format!("{} must be greater than zero", tx.amount)));
    }
    let now = Utc::now();
    let wallet = lock_wallet(user_id, now, conn).await?;
    let balance_before = wallet.balance;
    let balance_after = balance_before + tx.tx_type.signed(tx.amount);
    if balance_after < Vnd::default() {
        return Err(WalletError::InsufficientBalance { balance: balance_before, required: tx.amount });
    }
    let deposited = if tx.tx_type == WalletTxType::Deposit { tx.amount } else { Vnd::default() };
    let spent = if tx.tx_type == WalletTxType::Purchase { tx.amount } else { Vnd::default() };
    sqlx::query(
        r#"
            UPDATE wallets SET
                balance = $1,
                total_deposited = total_deposited + $2,
                total_spent = total_spent + $3,
                updated_at = $4
            WHERE id = $5
        "#,
    )
    .bind(balance_after)
    .bind(deposited)
    .bind(spent)
    .bind(now)
    .bind(&wallet.id)
    .execute(&mut *conn)
    .await?;
    let record: WalletTransaction = sqlx::query_as(
        r#"
            INSERT INTO wallet_transactions (
                id, wallet_id, user_id, type, amount, balance_before, balance_after, description,
                reference_type, reference_id, status, provider, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'success', $11, $12)
            RETURNING *;
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&wallet.id)
    .bind(user_id)
    .bind(tx.tx_type)
    .bind(tx.amount)
    .bind(balance_before)
    .bind(balance_after)
    .bind(tx.description)
    .bind(tx.reference_type)
    .bind(tx.reference_id)
    .bind(tx.provider)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!(
        "💰️ {} of {} posted to wallet {}. Balance {balance_before} -> {balance_after}",
        record.tx_type, record.amount, wallet.id
    );
    Ok(record)
}

pub async fn wallet_stats(user_id: &UserId, conn: &mut SqliteConnection) -> Result<WalletStats, sqlx::Error> {
    let stats = sqlx::query_as(
        r#"
            SELECT
                COALESCE(SUM(CASE WHEN type = 'deposit' THEN amount ELSE 0 END), 0) AS total_deposits,
                COALESCE(SUM(CASE WHEN type = 'purchase' THEN amount ELSE 0 END), 0) AS total_purchases,
                COALESCE(SUM(CASE WHEN type = 'refund' THEN amount ELSE 0 END), 0) AS total_refunds,
                COALESCE(SUM(CASE WHEN type = 'deposit' THEN 1 ELSE 0 END), 0) AS deposit_count,
                COALESCE(SUM(CASE WHEN type = 'purchase' THEN 1 ELSE 0 END), 0) AS purchase_count
            FROM wallet_transactions WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(stats)
}

pub async fn fetch_transactions(
    user_id: &UserId,
    filter: WalletTransactionFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM wallet_transactions WHERE user_id = ");
    builder.push_bind(user_id);
    if let Some(tx_type) = filter.tx_type {
        builder.push(" AND type = ").push_bind(tx_type);
    }
    if let Some(from) = filter.from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND created_at <= ").push_bind(to);
    }
    builder.push(" ORDER BY created_at DESC, rowid DESC LIMIT ").push_bind(filter.limit);
    builder.push(" OFFSET ").push_bind(filter.offset);
    let transactions = builder.build_query_as::<WalletTransaction>().fetch_all(conn).await?;
    Ok(transactions)
}

pub async fn fetch_transactions_for_reference(
    reference_type: &str,
    reference_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, sqlx::Error> {
    let transactions = sqlx::query_as(
        r#"
            SELECT * FROM wallet_transactions WHERE reference_type = $1 AND reference_id = $2
            ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .bind(reference_type)
    .bind(reference_id)
    .fetch_all(conn)
    .await?;
    Ok(transactions)
}
