//! Reconciliation codes.
//!
//! Buyers paste these codes into the free-text content of a bank transfer, and the payment provider echoes that text
//! back in its webhook. The grammar is a fixed prefix followed by upper-case alphanumerics:
//!
//! * Order payments: `ORD-` followed by exactly 10 characters. The hyphen is optional when matching, since banking
//!   apps often strip punctuation from transfer content.
//! * Wallet deposits: `DEP` followed by 8 digits and 4 characters.
//!
//! A code must stand on its own as a word, so ordinary words such as "deposit" or "record" never match. Matching is
//! case-insensitive. Extracted codes are returned in canonical (upper-case, hyphenated) form.
use chrono::{DateTime, Utc};
use rand::{distributions::Uniform, Rng};
use regex::Regex;

use crate::db_types::OrderId;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let dist = Uniform::from(0..CODE_ALPHABET.len());
    (0..len).map(|_| CODE_ALPHABET[rng.sample(dist)] as char).collect()
}

fn epoch_millis_tail(now: DateTime<Utc>, digits: usize) -> String {
    let ms = now.timestamp_millis().unsigned_abs().to_string();
    let start = ms.len().saturating_sub(digits);
    format!("{:0>digits$}", &ms[start..])
}

/// The transfer code for an order: `ORD-` followed by the first 10 characters of the order id, without hyphens.
pub fn order_payment_code(order_id: &OrderId) -> String {
    let compact = order_id.as_str().replace('-', "").to_uppercase();
    let head: String = compact.chars().take(10).collect();
    format!("ORD-{head}")
}

/// `DEP` followed by the last 8 digits of the epoch-millisecond clock and 4 random characters.
pub fn new_deposit_code(now: DateTime<Utc>) -> String {
    format!("DEP{}{}", epoch_millis_tail(now, 8), random_suffix(4))
}

/// `BATCH-YYYYMMDD-nnnnnn-XXXX`
pub fn new_batch_id(now: DateTime<Utc>) -> String {
    format!("BATCH-{}-{}-{}", now.format("%Y%m%d"), epoch_millis_tail(now, 6), random_suffix(4))
}

pub fn extract_order_code(content: &str) -> Option<String> {
    let re = Regex::new(r"\bORD-?([A-Z0-9]{10})\b").ok()?;
    let upper = content.to_uppercase();
    re.captures(&upper).and_then(|c| c.get(1)).map(|m| format!("ORD-{}", m.as_str()))
}

pub fn extract_deposit_code(content: &str) -> Option<String> {
    let re = Regex::new(r"\bDEP[0-9]{8}[A-Z0-9]{4}\b").ok()?;
    let upper = content.to_uppercase();
    re.find(&upper).map(|m| m.as_str().to_string())
}
