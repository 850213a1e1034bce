use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use serde::{Deserialize, Serialize};

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
        WalletTxType,
    },
    helpers::new_deposit_code,
    shop_api::payment_instructions::{PaymentInstructions, PaymentProviderConfig},
    traits::{
        AdjustmentResult,
        DepositQueryFilter,
        WalletError,
        WalletManagement,
        WalletStats,
        WalletTransactionFilter,
    },
};

pub const MIN_DEPOSIT: Vnd = Vnd::new(10_000);
pub const MAX_DEPOSIT: Vnd = Vnd::new(50_000_000);
pub const DEPOSIT_WINDOW_MINUTES: i64 = 30;
pub const DEFAULT_DEPOSIT_METHOD: &str = "sepay";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    pub wallet: Wallet,
    pub stats: WalletStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositTicket {
    pub deposit: DepositRequest,
    pub instructions: PaymentInstructions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositStatusReport {
    pub deposit: DepositRequest,
    /// Still pending, but past its payment window.
    pub is_expired: bool,
}

/// `WalletApi` is the user and admin facing side of the wallet ledger.
///
/// All balance changes go through [`WalletManagement::post_transaction`]; this struct only decides the type,
/// provider and reference of each posting.
pub struct WalletApi<B> {
    db: B,
    providers: PaymentProviderConfig,
}

impl<B: Debug> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi ({:?})", self.db)
    }
}

impl<B: Clone> Clone for WalletApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), providers: self.providers.clone() }
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B, providers: PaymentProviderConfig) -> Self {
        Self { db, providers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> WalletApi<B>
where B: WalletManagement
{
    pub async fn wallet_info(&self, user_id: &UserId) -> Result<WalletInfo, WalletError> {
        let wallet = self.db.fetch_or_create_wallet(user_id).await?;
        let stats = self.db.wallet_stats(user_id).await?;
        Ok(WalletInfo { wallet, stats })
    }

    pub async fn balance(&self, user_id: &UserId) -> Result<Vnd, WalletError> {
        Ok(self.db.fetch_or_create_wallet(user_id).await?.balance)
    }

    /// Opens a deposit request that stays payable for 30 minutes.
    pub async fn create_deposit(
        &self,
        user_id: &UserId,
        amount: Vnd,
        method: Option<&str>,
    ) -> Result<DepositTicket, WalletError> {
        if amount < MIN_DEPOSIT {
            return Err(WalletError::InvalidAmount(format!("Minimum deposit amount is {MIN_DEPOSIT}")));
        }
        if amount > MAX_DEPOSIT {
            return Err(WalletError::InvalidAmount(format!("Maximum deposit amount is {MAX_DEPOSIT}")));
        }
        let method =
            method.map(|m| m.trim().to_lowercase()).filter(|m| !m.is_empty()).unwrap_or(DEFAULT_DEPOSIT_METHOD.into());
        if method == "wallet" {
            return Err(WalletError::UnsupportedPaymentMethod(method));
        }
        let now = Utc::now();
        let request = NewDepositRequest {
            user_id: user_id.clone(),
            amount,
            payment_method: method.clone(),
            payment_code: new_deposit_code(now),
            expires_at: now + Duration::minutes(DEPOSIT_WINDOW_MINUTES),
        };
        let deposit = self.db.insert_deposit_request(request).await?;
        info!("💰️ Deposit request {} for {amount} opened by {user_id} via {method}", deposit.payment_code);
        let instructions = self.providers.instructions_for(&method, amount, &deposit.payment_code);
        Ok(DepositTicket { deposit, instructions })
    }

    pub async fn deposit_status(
        &self,
        user_id: &UserId,
        id: &DepositRequestId,
    ) -> Result<DepositStatusReport, WalletError> {
        let deposit = self
            .db
            .fetch_deposit_request(user_id, id)
            .await?
            .ok_or_else(|| WalletError::DepositNotFound(id.to_string()))?;
        let is_expired = deposit.is_expired(Utc::now());
        Ok(DepositStatusReport { deposit, is_expired })
    }

    pub async fn deposit_history(
        &self,
        user_id: &UserId,
        filter: DepositQueryFilter,
    ) -> Result<Vec<DepositRequest>, WalletError> {
        self.db.fetch_deposit_requests(user_id, filter).await
    }

    pub async fn transaction_history(
        &self,
        user_id: &UserId,
        filter: WalletTransactionFilter,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        self.db.fetch_wallet_transactions(user_id, filter).await
    }

    /// Debits the wallet for a purchase. Fails with [`WalletError::InsufficientBalance`] without writing anything if
    /// the balance does not cover `amount`.
    pub async fn pay_with_wallet(
        &self,
        user_id: &UserId,
        amount: Vnd,
        description: &str,
        reference: Option<(&str, &str)>,
    ) -> Result<WalletTransaction, WalletError> {
        let mut tx = NewWalletTransaction::new(WalletTxType::Purchase, amount, "wallet").with_description(description);
        if let Some((ref_type, ref_id)) = reference {
            tx = tx.with_reference(ref_type, ref_id);
        }
        self.db.post_transaction(user_id, tx).await
    }

    pub async fn refund_to_wallet(
        &self,
        user_id: &UserId,
        amount: Vnd,
        description: &str,
        reference: Option<(&str, &str)>,
    ) -> Result<WalletTransaction, WalletError> {
        let mut tx = NewWalletTransaction::new(WalletTxType::Refund, amount, "system").with_description(description);
        if let Some((ref_type, ref_id)) = reference {
            tx = tx.with_reference(ref_type, ref_id);
        }
        self.db.post_transaction(user_id, tx).await
    }

    /// Applies a signed manual correction. Credits are posted as deposits and debits as withdrawals.
    ///
    /// The reported balance is the `balance_after` of the audit row, so it is exactly the balance this adjustment
    /// produced.
    pub async fn admin_adjust(
        &self,
        user_id: &UserId,
        amount: Vnd,
        description: &str,
        admin_id: &UserId,
    ) -> Result<AdjustmentResult, WalletError> {
        if amount.is_zero() {
            return Err(WalletError::InvalidAmount("Adjustment amount cannot be zero".into()));
        }
        let tx_type = if amount.is_positive() { WalletTxType::Deposit } else { WalletTxType::Withdraw };
        let tx = NewWalletTransaction::new(tx_type, amount.abs(), "admin")
            .with_description(description)
            .with_reference("admin_adjustment", admin_id.as_str());
        let transaction = self.db.post_transaction(user_id, tx).await?;
        let new_balance = transaction.balance_after;
        info!("💰️ Admin {admin_id} adjusted the wallet of {user_id} by {amount}. New balance: {new_balance}");
        Ok(AdjustmentResult { transaction, new_balance })
    }

    pub async fn expire_deposits(&self) -> Result<Vec<DepositRequest>, WalletError> {
        let expired = self.db.expire_deposit_requests().await?;
        if !expired.is_empty() {
            debug!("💰️ {} deposit request(s) expired", expired.len());
        }
        Ok(expired)
    }
}
