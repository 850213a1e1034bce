use std::env;

use log::*;
use serde::{Deserialize, Serialize};

use crate::db_types::Vnd;

const SEPAY_QR_BASE: &str = "https://qr.sepay.vn/img";
const VIETQR_BASE: &str = "https://img.vietqr.io/image";
const DEFAULT_QR_TEMPLATE: &str = "compact";

/// Bank and wallet details shown to buyers who pay by transfer.
///
/// Every field is optional. Missing bank details just produce emptier instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProviderConfig {
    pub bank_account: String,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
    /// `sepay` selects the qr.sepay.vn image service.
    pub qr_provider: Option<String>,
    pub qr_account: Option<String>,
    pub bank_short_name: Option<String>,
    pub qr_template: Option<String>,
    /// With a BIN configured, VietQR images are used when the SePay QR service is not.
    pub bank_bin: Option<String>,
    pub momo_number: String,
    pub momo_name: String,
}

impl PaymentProviderConfig {
    pub fn from_env() -> Self {
        let text = |name: &str| env::var(name).ok().map(|s| s.trim().to_string()).unwrap_or_default();
        let optional = |name: &str| env::var(name).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let config = Self {
            bank_account: text("KSP_BANK_ACCOUNT"),
            bank_name: text("KSP_BANK_NAME"),
            account_number: text("KSP_ACCOUNT_NUMBER"),
            account_name: text("KSP_ACCOUNT_NAME"),
            qr_provider: optional("KSP_QR_PROVIDER"),
            qr_account: optional("KSP_QR_ACCOUNT"),
            bank_short_name: optional("KSP_BANK_SHORT_NAME"),
            qr_template: optional("KSP_QR_TEMPLATE"),
            bank_bin: optional("KSP_BANK_BIN"),
            momo_number: text("KSP_MOMO_NUMBER"),
            momo_name: text("KSP_MOMO_NAME"),
        };
        if config.account_number.is_empty() {
            warn!("🪛️ KSP_ACCOUNT_NUMBER is not set. Transfer instructions will not include a bank account.");
        }
        config
    }

    /// Builds the instructions for paying `amount` with the reconciliation `code` through `method`.
    pub fn instructions_for(&self, method: &str, amount: Vnd, code: &str) -> PaymentInstructions {
        let mut result = PaymentInstructions {
            method: method.to_string(),
            amount,
            code: code.to_string(),
            note: "Transfer with exactly this content so the payment is matched automatically".to_string(),
            ..Default::default()
        };
        match method {
            "sepay" => {
                result.bank_account = Some(self.bank_account.clone());
                result.bank_name = Some(self.bank_name.clone());
                result.account_number = Some(self.account_number.clone());
                result.account_name = Some(self.account_name.clone());
                result.qr_url = self.qr_url(amount, code);
            },
            "momo" => {
                result.momo_number = Some(self.momo_number.clone());
                result.momo_name = Some(self.momo_name.clone());
            },
            _ => result.note = "This payment method is not supported".to_string(),
        }
        result
    }

    fn qr_url(&self, amount: Vnd, code: &str) -> Option<String> {
        let amount_part = if amount.is_positive() { format!("&amount={}", amount.value()) } else { String::new() };
        let sepay_qr = (self.qr_provider.as_deref() == Some("sepay"))
            .then(|| self.qr_account.as_ref().zip(self.bank_short_name.as_ref()))
            .flatten();
        if let Some((account, bank)) = sepay_qr {
            let template = self.qr_template.as_deref().unwrap_or(DEFAULT_QR_TEMPLATE);
            return Some(format!(
                "{SEPAY_QR_BASE}?acc={}&bank={}{amount_part}&des={}&template={template}",
                urlencoding::encode(account),
                urlencoding::encode(bank),
                urlencoding::encode(code)
            ));
        }
        match &self.bank_bin {
            Some(bin) if !self.account_number.is_empty() && !self.account_name.is_empty() => Some(format!(
                "{VIETQR_BASE}/{bin}-{}-print.png?addInfo={}&accountName={}{amount_part}",
                urlencoding::encode(&self.account_number),
                urlencoding::encode(code),
                urlencoding::encode(&self.account_name)
            )),
            _ => None,
        }
    }
}

/// What a buyer needs to complete a transfer. Provider specific fields are omitted when they do not apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructions {
    pub method: String,
    pub amount: Vnd,
    pub code: String,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub momo_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub momo_name: Option<String>,
}
