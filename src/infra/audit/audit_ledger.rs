// In-memory audit trail of balance changes.
//
// Subscribes to the event bus like any other listener and keeps the most
// recent changes per player, newest last. Nothing is persisted; the ledger is
// a diagnostic aid for admins and tests.

use crate::core::events::{CurrencyEvent, CurrencyEventListener};
use crate::core::wallet::PlayerId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

/// Reason recorded for changes made through a wallet replacement.
pub const REPLACE_REASON: &str = "replace";

/// Configuration for the audit ledger.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Oldest entries are evicted once a player has this many.
    pub max_entries_per_player: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_entries_per_player: 50,
        }
    }
}

/// One recorded balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub player_id: PlayerId,
    pub currency: String,
    pub old_amount: i64,
    pub new_amount: i64,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn delta(&self) -> i64 {
        self.new_amount.saturating_sub(self.old_amount)
    }
}

pub struct AuditLedger {
    entries: DashMap<PlayerId, VecDeque<AuditEntry>>,
    config: AuditConfig,
}

impl AuditLedger {
    pub fn new() -> Self {
        Self::new_with_config(AuditConfig::default())
    }

    pub fn new_with_config(config: AuditConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Most recent entries for a player, newest first.
    pub fn recent(&self, player_id: PlayerId, limit: usize) -> Vec<AuditEntry> {
        self.entries
            .get(&player_id)
            .map(|entries| entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Forget a player's history.
    pub fn clear(&self, player_id: PlayerId) {
        self.entries.remove(&player_id);
    }

    /// Number of players with at least one recorded entry.
    pub fn tracked_players(&self) -> usize {
        self.entries.len()
    }

    fn record(&self, entry: AuditEntry) {
        if self.config.max_entries_per_player == 0 {
            return;
        }
        let mut entries = self.entries.entry(entry.player_id).or_default();
        entries.push_back(entry);
        while entries.len() > self.config.max_entries_per_player {
            entries.pop_front();
        }
    }
}

impl Default for AuditLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrencyEventListener for AuditLedger {
    fn handle(&self, event: &CurrencyEvent) {
        let timestamp = Utc::now();
        match event {
            CurrencyEvent::CurrencyDefined { .. } => {}
            CurrencyEvent::CurrencyUpdated {
                player_id,
                key,
                old_amount,
                new_amount,
                reason,
            } => self.record(AuditEntry {
                player_id: *player_id,
                currency: key.clone(),
                old_amount: *old_amount,
                new_amount: *new_amount,
                reason: reason.to_string(),
                timestamp,
            }),
            CurrencyEvent::WalletReplaced {
                player_id,
                old_wallet,
                new_wallet,
            } => {
                // One entry per currency whose balance actually moved.
                let keys: BTreeSet<&str> = old_wallet.keys().chain(new_wallet.keys()).collect();
                for key in keys {
                    let old_amount = old_wallet.balance(key);
                    let new_amount = new_wallet.balance(key);
                    if old_amount == new_amount {
                        continue;
                    }
                    self.record(AuditEntry {
                        player_id: *player_id,
                        currency: key.to_string(),
                        old_amount,
                        new_amount,
                        reason: REPLACE_REASON.to_string(),
                        timestamp,
                    });
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "audit_ledger"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::{CurrencyRegistry, SyncPolicy};
    use crate::core::events::EventBus;
    use crate::core::wallet::WalletSynchronizer;
    use crate::infra::replication::InMemoryReplicator;
    use serde_json::json;
    use std::sync::Arc;

    const PLAYER: PlayerId = PlayerId(11);

    fn wired(config: AuditConfig) -> (WalletSynchronizer, Arc<AuditLedger>) {
        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(CurrencyRegistry::new(Arc::clone(&bus)));
        registry.define("gold", "Gold", SyncPolicy::Broadcast).unwrap();
        registry.define("cash", "Cash", SyncPolicy::OwnerOnly).unwrap();

        let ledger = Arc::new(AuditLedger::new_with_config(config));
        bus.subscribe(ledger.clone());

        let wallets =
            WalletSynchronizer::new(registry, Arc::new(InMemoryReplicator::new()), bus);
        wallets.attach_player(PLAYER);
        (wallets, ledger)
    }

    #[test]
    fn test_records_updates_newest_first() {
        let (wallets, ledger) = wired(AuditConfig::default());

        wallets.set_balance(PLAYER, "gold", 100);
        wallets.adjust_balance(PLAYER, "gold", -30);

        let recent = ledger.recent(PLAYER, 10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].reason, "adjust");
        assert_eq!(recent[0].delta(), -30);
        assert_eq!(recent[1].reason, "set");
        assert_eq!(recent[1].new_amount, 100);
    }

    #[test]
    fn test_replacement_records_changed_currencies_only() {
        let (wallets, ledger) = wired(AuditConfig::default());
        wallets.set_balance(PLAYER, "gold", 5);
        wallets.set_balance(PLAYER, "cash", 9);

        wallets.replace_wallet(PLAYER, &json!({ "gold": 5, "cash": 1 }));

        let recent = ledger.recent(PLAYER, 1);
        assert_eq!(recent[0].currency, "cash");
        assert_eq!(recent[0].reason, REPLACE_REASON);
        assert_eq!((recent[0].old_amount, recent[0].new_amount), (9, 1));
        assert_eq!(ledger.recent(PLAYER, 10).len(), 3);
    }

    #[test]
    fn test_history_is_bounded_per_player() {
        let (wallets, ledger) = wired(AuditConfig {
            max_entries_per_player: 3,
        });

        for amount in 1..=5 {
            wallets.set_balance(PLAYER, "gold", amount);
        }

        let recent = ledger.recent(PLAYER, 10);
        let amounts: Vec<i64> = recent.iter().map(|e| e.new_amount).collect();
        assert_eq!(amounts, vec![5, 4, 3]);

        ledger.clear(PLAYER);
        assert!(ledger.recent(PLAYER, 10).is_empty());
        assert_eq!(ledger.tracked_players(), 0);
    }
}
