// Validation of untyped wallet snapshots.
//
// Replacement wallets usually come from outside the server (client snapshots,
// admin tools, stale saves) so they arrive as raw JSON. Filtering is kept free
// of any mutation or replication so it can be tested on its own.

use super::wallet_models::Wallet;
use serde_json::Value;
use std::fmt;

/// Why an entry was left out of a replacement wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    UnknownCurrency,
    NotAnInteger,
    /// Only produced when negative balances are disabled.
    Negative,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DropReason::UnknownCurrency => "unknown currency",
            DropReason::NotAnInteger => "value is not an integer",
            DropReason::Negative => "negative balances are disabled",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedEntry {
    pub key: String,
    pub value: Value,
    pub reason: DropReason,
}

/// Outcome of filtering a well-formed snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredBalances {
    pub wallet: Wallet,
    pub dropped: Vec<DroppedEntry>,
}

/// Filter a raw `{ key: amount }` snapshot down to a valid wallet.
///
/// Returns `None` when `input` is not a JSON object at all. Otherwise every
/// entry survives only if `is_registered(key)` holds and the value is an
/// integer that fits in an `i64`; floats, strings, and oversized numbers are dropped.
pub fn filter_balances<F>(
    input: &Value,
    is_registered: F,
    allow_negative: bool,
) -> Option<FilteredBalances>
where
    F: Fn(&str) -> bool,
{
    let entries = input.as_object()?;
    let mut filtered = FilteredBalances::default();

    for (key, value) in entries {
        let reason = if !is_registered(key) {
            Some(DropReason::UnknownCurrency)
        } else {
            match value.as_i64() {
                None => Some(DropReason::NotAnInteger),
                Some(amount) if amount < 0 && !allow_negative => Some(DropReason::Negative),
                Some(amount) => {
                    filtered.wallet.insert(key, amount);
                    None
                }
            }
        };

        if let Some(reason) = reason {
            filtered.dropped.push(DroppedEntry {
                key: key.clone(),
                value: value.clone(),
                reason,
            });
        }
    }

    Some(filtered)
}
