use thiserror::Error;

use crate::{
    db_types::{
        DepositRequest,
        DepositRequestId,
        NewDepositRequest,
        NewWalletTransaction,
        UserId,
        Vnd,
        Wallet,
        WalletTransaction,
    },
    traits::data_objects::{DepositQueryFilter, WalletStats, WalletTransactionFilter},
};

/// The wallet ledger.
///
/// Wallets are created lazily, on first access. [`WalletManagement::post_transaction`] is the only operation that
/// changes a balance, and it always writes the matching audit row in the same atomic unit.
#[allow(async_fn_in_trait)]
pub trait WalletManagement: Clone {
    async fn fetch_or_create_wallet(&self, user_id: &UserId) -> Result<Wallet, WalletError>;

    /// Locks the user's wallet, applies the signed amount, updates the running aggregates and appends the audit row.
    ///
    /// Fails with [`WalletError::InvalidAmount`] unless `amount > 0`, and with [`WalletError::InsufficientBalance`] if
    /// a debit would take the balance below zero. On failure nothing is written.
    async fn post_transaction(
        &self,
        user_id: &UserId,
        tx: NewWalletTransaction,
    ) -> Result<WalletTransaction, WalletError>;

    async fn wallet_stats(&self, user_id: &UserId) -> Result<WalletStats, WalletError>;

    /// Newest first.
    async fn fetch_wallet_transactions(
        &self,
        user_id: &UserId,
        filter: WalletTransactionFilter,
    ) -> Result<Vec<WalletTransaction>, WalletError>;

    async fn fetch_wallet_transactions_for_reference(
        &self,
        reference_type: &str,
        reference_id: &str,
    ) -> Result<Vec<WalletTransaction>, WalletError>;

    async fn insert_deposit_request(&self, request: NewDepositRequest) -> Result<DepositRequest, WalletError>;

    /// Only returns the request if it belongs to `user_id`.
    async fn fetch_deposit_request(
        &self,
        user_id: &UserId,
        id: &DepositRequestId,
    ) -> Result<Option<DepositRequest>, WalletError>;

    /// Newest first.
    async fn fetch_deposit_requests(
        &self,
        user_id: &UserId,
        filter: DepositQueryFilter,
    ) -> Result<Vec<DepositRequest>, WalletError>;

    /// Moves every pending request past its `expires_at` to `expired`, and returns them.
    async fn expire_deposit_requests(&self) -> Result<Vec<DepositRequest>, WalletError>;
}

#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Insufficient wallet balance. Balance: {balance}, required: {required}")]
    InsufficientBalance { balance: Vnd, required: Vnd },
    #[error("Deposit request {0} does not exist")]
    DepositNotFound(String),
    #[error("Payment method {0} is not supported")]
    UnsupportedPaymentMethod(String),
}

impl WalletError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InvalidAmount(_) | Self::UnsupportedPaymentMethod(_) => "VALIDATION_ERROR",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::DepositNotFound(_) => "NOT_FOUND",
        }
    }
}

impl From<sqlx::Error> for WalletError {
    fn from(e: sqlx::Error) -> Self {
        WalletError::DatabaseError(e.to_string())
    }
}
