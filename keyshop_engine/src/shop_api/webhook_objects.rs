use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    db_types::{DepositRequest, Order, PaymentTransaction, Vnd, WalletTransaction},
    helpers::{extract_deposit_code, extract_order_code},
    traits::PaymentError,
};

const CONTENT_FIELDS: [&str; 3] = ["content", "code", "description"];
const AMOUNT_FIELDS: [&str; 2] = ["transferAmount", "amount"];
const PROVIDER_TX_FIELDS: [&str; 4] = ["referenceCode", "transactionId", "provider_tx_id", "id"];

/// A transfer notification from a payment provider, reduced to the fields reconciliation needs.
///
/// Providers disagree on field names, so each value is taken from the first of several candidate fields that is
/// present. SePay for instance sends `content`, `code` and `description` together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferNotification {
    /// The free text the buyer typed into the transfer.
    pub content: String,
    pub amount: Vnd,
    pub provider_tx_id: Option<String>,
    pub status: Option<String>,
}

impl TransferNotification {
    pub fn from_json(payload: &Value) -> Result<Self, PaymentError> {
        if !payload.is_object() {
            return Err(PaymentError::InvalidPayload("Expected a JSON object".into()));
        }
        let content = CONTENT_FIELDS
            .iter()
            .filter_map(|f| payload.get(*f).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(String::from)
            .ok_or(PaymentError::MissingCode)?;
        let amount = AMOUNT_FIELDS
            .iter()
            .find_map(|f| payload.get(*f).filter(|v| !v.is_null()))
            .ok_or_else(|| PaymentError::InvalidPayload("The transfer amount is missing".into()))
            .and_then(parse_amount)?;
        let provider_tx_id = PROVIDER_TX_FIELDS.iter().find_map(|f| match payload.get(*f) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });
        let status = payload.get("status").and_then(Value::as_str).map(|s| s.trim().to_lowercase());
        Ok(Self { content, amount, provider_tx_id, status })
    }

    /// An absent status counts as success. Providers that only notify on completed transfers do not send one.
    pub fn is_success(&self) -> bool {
        self.status.as_deref().map(|s| s == "success").unwrap_or(true)
    }

    pub fn order_code(&self) -> Option<String> {
        extract_order_code(&self.content)
    }

    pub fn deposit_code(&self) -> Option<String> {
        extract_deposit_code(&self.content)
    }
}

fn parse_amount(value: &Value) -> Result<Vnd, PaymentError> {
    let invalid = || PaymentError::InvalidPayload(format!("Invalid transfer amount: {value}"));
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(Vnd::from(v))
            } else {
                n.to_string().parse::<Vnd>().map_err(|_| invalid())
            }
        },
        Value::String(s) => s.parse::<Vnd>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// The body returned to the provider. Duplicates of settled transfers also get `success: true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
}

impl WebhookResponse {
    pub fn ok<S: Into<String>>(message: S) -> Self {
        Self { success: true, message: message.into() }
    }
}

/// What happened to an order payment notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OrderWebhookResult {
    Paid { order: Order, payment: PaymentTransaction, fulfilled: bool },
    AlreadyProcessed { payment: PaymentTransaction },
    MarkedFailed { payment: PaymentTransaction },
}

impl OrderWebhookResult {
    pub fn response(&self) -> WebhookResponse {
        match self {
            Self::Paid { fulfilled: true, .. } => WebhookResponse::ok("Payment confirmed and order fulfilled"),
            Self::Paid { fulfilled: false, .. } => {
                WebhookResponse::ok("Payment confirmed. Fulfillment failed and needs manual review")
            },
            Self::AlreadyProcessed { .. } => WebhookResponse::ok("Payment already processed"),
            Self::MarkedFailed { .. } => WebhookResponse::ok("Payment marked as failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DepositWebhookResult {
    Completed { deposit: DepositRequest, transaction: WalletTransaction },
    AlreadyProcessed { deposit: DepositRequest },
}

impl DepositWebhookResult {
    pub fn response(&self) -> WebhookResponse {
        match self {
            Self::Completed { .. } => WebhookResponse::ok("Deposit completed"),
            Self::AlreadyProcessed { .. } => WebhookResponse::ok("Deposit already processed"),
        }
    }
}

/// The outcome of a notification that may carry an order code, a deposit code, or both.
///
/// Each flow runs on its own. A failure in one is reported here and does not stop the other.
#[derive(Debug, Clone, Default)]
pub struct CombinedWebhookResult {
    pub order: Option<Result<OrderWebhookResult, PaymentError>>,
    pub deposit: Option<Result<DepositWebhookResult, PaymentError>>,
}

impl CombinedWebhookResult {
    /// Collapses the two flows into the provider response. A single failing flow makes the whole response an error,
    /// unless the other flow succeeded.
    pub fn into_response(self) -> Result<WebhookResponse, PaymentError> {
        let order = self.order.map(|r| r.map(|o| o.response()));
        let deposit = self.deposit.map(|r| r.map(|d| d.response()));
        match (order, deposit) {
            (Some(Ok(o)), Some(Ok(d))) => Ok(WebhookResponse::ok(format!("{} {}", o.message, d.message))),
            (Some(Ok(r)), Some(Err(_))) | (Some(Err(_)), Some(Ok(r))) => Ok(r),
            (Some(result), None) | (None, Some(result)) => result,
            (Some(Err(e)), Some(Err(_))) => Err(e),
            (None, None) => Err(PaymentError::MissingCode),
        }
    }
}
