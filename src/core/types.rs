use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Base contract address: `0x` followed by exactly 40 hex digits.
pub static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"0x[a-fA-F0-9]{40}").unwrap());

static ADDRESS_EXACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap());

/// One discovered token, as it travels from extractor to ingress to
/// subscribers. Immutable once built; enrichment fields stay whatever the
/// extractor saw at capture time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub contract: String,
    #[serde(default = "placeholder_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet_url: Option<String>,
    /// Capture time, epoch milliseconds.
    #[serde(default = "current_timestamp_millis")]
    pub timestamp: i64,
}

impl TokenRecord {
    pub fn new(contract: String, name: String) -> Self {
        Self {
            contract,
            name,
            symbol: None,
            creator: None,
            followers: None,
            tokens_created: None,
            tax: None,
            liquidity: None,
            tags: None,
            tweet_url: None,
            timestamp: current_timestamp_millis(),
        }
    }

    /// Identity used by the dedup tracker: the canonical contract address.
    pub fn identity_key(&self) -> String {
        self.contract.to_lowercase()
    }

    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis - self.timestamp
    }
}

pub fn placeholder_name() -> String {
    "Token".to_string()
}

pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Canonical lowercase form of a contract address, or `None` when the input
/// is not a well-formed 42-character hex address.
pub fn canonical_contract(input: &str) -> Option<String> {
    if ADDRESS_EXACT_RE.is_match(input) {
        Some(input.to_lowercase())
    } else {
        None
    }
}
