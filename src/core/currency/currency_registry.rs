// Currency registry - the single source of truth for currency definitions.
//
// Definitions are written a handful of times at startup and read on every
// wallet mutation, so the table sits behind one read-mostly lock. Readers never
// block each other.

use super::currency_models::{Currency, CurrencyError, SyncPolicy, INVALID_CURRENCY_NAME};
use crate::core::events::{CurrencyEvent, EventBus};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::{debug, info};

#[derive(Default)]
struct RegistryTable {
    currencies: HashMap<String, Currency>,
    /// Keys in definition order, for stable listings.
    order: Vec<String>,
}

/// Process-wide store of currency definitions.
///
/// Constructed explicitly by the host and shared via `Arc`, so tests can build
/// as many independent registries as they like.
pub struct CurrencyRegistry {
    table: RwLock<RegistryTable>,
    events: Arc<EventBus>,
}

impl CurrencyRegistry {
    /// Create an empty registry that announces definitions on `events`.
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            table: RwLock::new(RegistryTable::default()),
            events,
        }
    }

    /// Define a new currency.
    ///
    /// Fails with `InvalidArgument` for an empty key or label and with
    /// `AlreadyExists` when the key is taken. A rejected call leaves the
    /// registry untouched. Listeners are notified after the write lock is released.
    pub fn define(
        &self,
        key: &str,
        display_name: &str,
        sync_policy: SyncPolicy,
    ) -> Result<Currency, CurrencyError> {
        if key.trim().is_empty() {
            return Err(CurrencyError::InvalidArgument(
                "currency key must not be empty".to_string(),
            ));
        }
        if display_name.trim().is_empty() {
            return Err(CurrencyError::InvalidArgument(format!(
                "display name for currency '{key}' must not be empty"
            )));
        }

        let currency = {
            let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
            if table.currencies.contains_key(key) {
                debug!(currency = key, "Rejected duplicate currency definition");
                return Err(CurrencyError::AlreadyExists(key.to_string()));
            }
            let currency = Currency::new(key, display_name, sync_policy);
            table.order.push(currency.key.clone());
            table
                .currencies
                .insert(currency.key.clone(), currency.clone());
            currency
        };

        info!(
            currency = %currency.key,
            display_name = %currency.display_name,
            sync_policy = %currency.sync_policy,
            sync_key = %currency.sync_key,
            "Currency defined"
        );

        self.events.emit(&CurrencyEvent::CurrencyDefined {
            key: currency.key.clone(),
            display_name: currency.display_name.clone(),
            sync_policy: currency.sync_policy,
            sync_key: currency.sync_key.clone(),
        });

        Ok(currency)
    }

    /// Define a currency whose policy arrives as text (config files, admin tools).
    pub fn define_named_policy(
        &self,
        key: &str,
        display_name: &str,
        sync_policy: &str,
    ) -> Result<Currency, CurrencyError> {
        let policy = sync_policy.parse::<SyncPolicy>()?;
        self.define(key, display_name, policy)
    }

    pub fn has(&self, key: &str) -> bool {
        self.read().currencies.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Currency> {
        self.read().currencies.get(key).cloned()
    }

    /// All registered keys, in definition order.
    pub fn list_keys(&self) -> Vec<String> {
        self.read().order.clone()
    }

    /// The currency's label, or `"Invalid Currency"` for unknown keys.
    pub fn display_name_of(&self, key: &str) -> String {
        self.read()
            .currencies
            .get(key)
            .map(|c| c.display_name.clone())
            .unwrap_or_else(|| INVALID_CURRENCY_NAME.to_string())
    }

    /// Unknown keys are never replicated, so they report `SyncPolicy::None`.
    pub fn sync_policy_of(&self, key: &str) -> SyncPolicy {
        self.read()
            .currencies
            .get(key)
            .map(|c| c.sync_policy)
            .unwrap_or(SyncPolicy::None)
    }

    pub fn sync_key_of(&self, key: &str) -> Option<String> {
        self.read().currencies.get(key).map(|c| c.sync_key.clone())
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// TESTS
// ============================================================================
