// Wallet domain models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Host-assigned identifier of a connected player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player's balances, keyed by currency.
///
/// A currency missing from the wallet has a balance of 0. Keys are only ever
/// inserted by the synchronizer after a registry check, so every key present
/// names a registered currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Wallet {
    balances: BTreeMap<String, i64>,
}

impl Wallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance for `key`, treating absence as 0.
    pub fn balance(&self, key: &str) -> i64 {
        self.balances.get(key).copied().unwrap_or(0)
    }

    /// Stored balance, or `None` if the key was never written.
    pub fn get(&self, key: &str) -> Option<i64> {
        self.balances.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.balances.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.balances.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.balances.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub(crate) fn insert(&mut self, key: &str, amount: i64) -> Option<i64> {
        self.balances.insert(key.to_string(), amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_balance_is_zero() {
        let mut wallet = Wallet::new();
        assert_eq!(wallet.balance("gold"), 0);
        assert_eq!(wallet.get("gold"), None);

        wallet.insert("gold", -4);
        assert_eq!(wallet.balance("gold"), -4);
        assert!(wallet.contains("gold"));
        assert_eq!(wallet.len(), 1);
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let mut wallet = Wallet::new();
        wallet.insert("gold", 5);
        wallet.insert("cash", 12);

        let json = serde_json::to_value(&wallet).unwrap();
        assert_eq!(json, serde_json::json!({ "cash": 12, "gold": 5 }));
    }
}
