use std::fmt::Display;

use chrono::{DateTime, Utc};
use keyshop_engine::{
    db_types::{ProductId, Vnd},
    helpers::BulkImport,
    ImportOptions,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//--------------------------------------        Cart          --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartParams {
    #[serde(alias = "product_id")]
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCartItemParams {
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherCheckParams {
    #[serde(default)]
    pub subtotal: Vnd,
}

//--------------------------------------       Wallet         --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositParams {
    pub amount: Vnd,
    #[serde(default, alias = "payment_method")]
    pub payment_method: Option<String>,
}

//--------------------------------------       Admin          --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkInventoryParams {
    #[serde(alias = "product_id")]
    pub product_id: ProductId,
    /// Either a list of secrets, or a block of text separated by `---` lines (or blank lines).
    pub items: BulkImport,
    #[serde(default, alias = "cost_price")]
    pub cost_price: Vnd,
    #[serde(default, alias = "account_expires_at")]
    pub account_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BulkInventoryParams {
    pub fn options(&self) -> ImportOptions {
        ImportOptions {
            cost_price: self.cost_price,
            account_expires_at: self.account_expires_at,
            notes: self.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpiringParams {
    #[serde(default)]
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilterParams {
    #[serde(default)]
    pub product_id: Option<ProductId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundParams {
    #[serde(default)]
    pub reason: Option<String>,
}

impl RefundParams {
    pub fn reason(&self) -> &str {
        self.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()).unwrap_or("Refunded by admin")
    }
}

/// A signed correction. Positive amounts credit the wallet, negative amounts debit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletAdjustmentParams {
    pub amount: Vnd,
    pub description: String,
}

/// `role: null` removes the user's admin role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRoleParams {
    pub role: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bulk_params_accept_both_forms() {
        let p: BulkInventoryParams =
            serde_json::from_str(r#"{"productId": "p1", "items": ["user1:pass1111", "user2:pass2222"]}"#).unwrap();
        assert_eq!(p.items.entries().len(), 2);
        let p: BulkInventoryParams = serde_json::from_str(
            r#"{"product_id": "p1", "items": "user1:pass1111\n---\nuser2:pass2222", "cost_price": 1000}"#,
        )
        .unwrap();
        assert_eq!(p.items.entries().len(), 2);
        assert_eq!(p.options().cost_price, Vnd::from(1000));
    }

    #[test]
    fn refund_reason_falls_back() {
        assert_eq!(RefundParams { reason: Some("  ".into()) }.reason(), "Refunded by admin");
        assert_eq!(RefundParams { reason: Some("Broken key".into()) }.reason(), "Broken key");
    }

    #[test]
    fn cart_quantity_defaults_to_one() {
        let p: AddToCartParams = serde_json::from_str(r#"{"productId": "p1"}"#).unwrap();
        assert_eq!(p.quantity, 1);
    }
}
