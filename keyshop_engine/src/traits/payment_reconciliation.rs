use thiserror::Error;

use crate::{
    db_types::{OrderId, Vnd},
    traits::{
        data_objects::{DepositOutcome, OrderPaymentOutcome},
        WalletError,
    },
};

/// Settles provider-reported transfers.
///
/// Every method locks the matched payment or deposit row first and checks its status before changing anything, so
/// duplicate deliveries of the same notification are harmless.
#[allow(async_fn_in_trait)]
pub trait PaymentReconciliation: Clone {
    /// Marks the payment with reconciliation `code` as successful and its order as paid.
    ///
    /// * Already successful: [`OrderPaymentOutcome::AlreadyProcessed`], nothing changes.
    /// * `amount` below the expected amount: [`PaymentError::AmountMismatch`], nothing changes.
    ///
    /// Fulfillment is not part of this unit.
    async fn confirm_order_payment(
        &self,
        code: &str,
        amount: Vnd,
        provider_tx_id: Option<String>,
    ) -> Result<OrderPaymentOutcome, PaymentError>;

    /// Marks a pending payment as failed. The order stays pending.
    async fn fail_order_payment(
        &self,
        code: &str,
        provider_tx_id: Option<String>,
    ) -> Result<OrderPaymentOutcome, PaymentError>;

    /// Completes the pending deposit with `code` and credits the wallet by the requested amount, in one unit.
    ///
    /// A deposit that is no longer pending (completed, or expired by the sweeper) is reported as
    /// [`DepositOutcome::AlreadyProcessed`] without any change.
    async fn confirm_deposit(
        &self,
        code: &str,
        amount: Vnd,
        provider_tx_id: Option<String>,
    ) -> Result<DepositOutcome, PaymentError>;
}

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("No payment code found in the transfer content")]
    MissingCode,
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
    #[error("No payment matches code {0}")]
    PaymentNotFound(String),
    #[error("No deposit request matches code {0}")]
    DepositNotFound(String),
    #[error("Amount mismatch. Expected at least {expected}, received {received}")]
    AmountMismatch { expected: Vnd, received: Vnd },
    #[error("Payment {0} has already failed")]
    PaymentAlreadyFailed(String),
    #[error("Order {0} is no longer awaiting payment")]
    OrderNotPayable(OrderId),
    #[error("{0}")]
    Wallet(#[from] WalletError),
}

impl PaymentError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::MissingCode => "MISSING_CODE",
            Self::InvalidPayload(_) => "VALIDATION_ERROR",
            Self::PaymentNotFound(_) | Self::DepositNotFound(_) => "NOT_FOUND",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::PaymentAlreadyFailed(_) | Self::OrderNotPayable(_) => "INVALID_STATE",
            Self::Wallet(e) => e.reason(),
        }
    }
}

impl From<sqlx::Error> for PaymentError {
    fn from(e: sqlx::Error) -> Self {
        PaymentError::DatabaseError(e.to_string())
    }
}
