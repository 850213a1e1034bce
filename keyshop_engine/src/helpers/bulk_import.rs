use serde::{Deserialize, Serialize};

pub const MIN_SECRET_LENGTH: usize = 10;
pub const MAX_SECRET_LENGTH: usize = 10_000;

/// Bulk inventory input. Either a list of secrets that has already been split, or a block of text to split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BulkImport {
    Items(Vec<String>),
    Text(String),
}

impl BulkImport {
    /// Returns the individual secrets, trimmed, with empty entries dropped.
    pub fn entries(&self) -> Vec<String> {
        match self {
            BulkImport::Items(items) => {
                items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from).collect()
            },
            BulkImport::Text(text) => split_bulk_text(text),
        }
    }
}

/// Splits on lines consisting only of `---`. If there are no such separators, blank lines separate entries instead.
pub fn split_bulk_text(text: &str) -> Vec<String> {
    let text = text.replace("\r\n", "\n");
    let mut blocks = split_on(&text, |line| line.trim() == "---");
    if blocks.len() <= 1 {
        blocks = split_on(&text, |line| line.trim().is_empty());
    }
    blocks
}

fn split_on<F: Fn(&str) -> bool>(text: &str, is_separator: F) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if is_separator(line) {
            blocks.push(current.join("\n"));
            current.clear();
        } else {
            current.push(line);
        }
    }
    blocks.push(current.join("\n"));
    blocks.into_iter().map(|b| b.trim().to_string()).filter(|b| !b.is_empty()).collect()
}

/// Checks the secret length, counted in characters.
pub fn validate_secret_data(secret: &str) -> Result<(), String> {
    let len = secret.trim().chars().count();
    if len < MIN_SECRET_LENGTH {
        return Err(format!("Secret data must be at least {MIN_SECRET_LENGTH} characters"));
    }
    if len > MAX_SECRET_LENGTH {
        return Err(format!("Secret data must be at most {MAX_SECRET_LENGTH} characters"));
    }
    Ok(())
}
