// Currency domain models
//
// A currency is defined once at startup and never changes afterwards, so every
// field here is plain owned data that can be cloned out of the registry freely.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Label handed out by `CurrencyRegistry::display_name_of` for unknown keys.
pub const INVALID_CURRENCY_NAME: &str = "Invalid Currency";

/// Prefix of every replication channel name.
pub(crate) const SYNC_KEY_PREFIX: &str = "currency_";

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Controls whether a balance change is replicated to game clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// Server-side only. Nothing is sent to any client.
    #[default]
    None,
    /// Pushed to every connected client (shared counters, jackpots).
    Broadcast,
    /// Pushed only to the owning player's client (private balances).
    OwnerOnly,
}

impl SyncPolicy {
    /// Convert the policy to its string representation for config files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPolicy::None => "none",
            SyncPolicy::Broadcast => "broadcast",
            SyncPolicy::OwnerOnly => "owner_only",
        }
    }

    /// Get all recognized policies.
    pub fn all() -> [SyncPolicy; 3] {
        [SyncPolicy::None, SyncPolicy::Broadcast, SyncPolicy::OwnerOnly]
    }
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncPolicy {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncPolicy::all()
            .into_iter()
            .find(|policy| policy.as_str() == s)
            .ok_or_else(|| CurrencyError::InvalidArgument(format!("unknown sync policy '{s}'")))
    }
}

/// A registered currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Currency {
    pub key: String,
    pub display_name: String,
    pub sync_policy: SyncPolicy,
    /// Replication channel name, always `currency_<key>`.
    pub sync_key: String,
}

impl Currency {
    pub(crate) fn new(key: &str, display_name: &str, sync_policy: SyncPolicy) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            sync_policy,
            sync_key: format!("{SYNC_KEY_PREFIX}{key}"),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================
// Only setup-time operations fail hard. Everything player-facing degrades to
// booleans and defaults instead.

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Currency '{0}' already exists")]
    AlreadyExists(String),

    #[error("Failed to load currency definitions: {0}")]
    Definitions(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_key_is_derived_from_key() {
        let currency = Currency::new("gold", "Gold", SyncPolicy::Broadcast);
        assert_eq!(currency.sync_key, "currency_gold");
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("none".parse::<SyncPolicy>(), Ok(SyncPolicy::None));
        assert_eq!("broadcast".parse::<SyncPolicy>(), Ok(SyncPolicy::Broadcast));
        assert_eq!("owner_only".parse::<SyncPolicy>(), Ok(SyncPolicy::OwnerOnly));
        assert!(matches!(
            "everyone".parse::<SyncPolicy>(),
            Err(CurrencyError::InvalidArgument(_))
        ));
        assert!("Broadcast".parse::<SyncPolicy>().is_err());
    }

    #[test]
    fn test_policy_serde_names_match_as_str() {
        for policy in SyncPolicy::all() {
            let json = serde_json::to_string(&policy).unwrap();
            assert_eq!(json, format!("\"{}\"", policy.as_str()));
        }
    }
}
