// In-memory implementation of VariableReplicator.
//
// Stands in for the host's variable sharing when there is no network layer
// (tests, local tools). It remembers the latest value every client scope has
// been sent, plus the full hand-off history in order.

use crate::core::wallet::{PlayerId, ReplicatedVariable, ReplicationScope, VariableReplicator};
use dashmap::DashMap;
use std::sync::{Mutex, PoisonError};

/// A composite key for looking up the last value sent on a channel.
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
struct ChannelKey {
    scope: ReplicationScope,
    sync_key: String,
}

pub struct InMemoryReplicator {
    /// Maps (scope, sync_key) -> last value sent
    latest: DashMap<ChannelKey, i64>,
    history: Mutex<Vec<ReplicatedVariable>>,
}

impl InMemoryReplicator {
    pub fn new() -> Self {
        Self {
            latest: DashMap::new(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Last value pushed on `sync_key` within `scope`, if any.
    pub fn latest(&self, scope: ReplicationScope, sync_key: &str) -> Option<i64> {
        let key = ChannelKey {
            scope,
            sync_key: sync_key.to_string(),
        };
        self.latest.get(&key).map(|entry| *entry.value())
    }

    /// Every hand-off so far, oldest first.
    pub fn history(&self) -> Vec<ReplicatedVariable> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, scope: ReplicationScope, sync_key: &str, value: i64) {
        self.latest.insert(
            ChannelKey {
                scope,
                sync_key: sync_key.to_string(),
            },
            value,
        );
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ReplicatedVariable {
                scope,
                sync_key: sync_key.to_string(),
                value,
            });
    }
}

impl VariableReplicator for InMemoryReplicator {
    fn broadcast_variable(&self, owner: PlayerId, sync_key: &str, value: i64) {
        self.record(ReplicationScope::Everyone(owner), sync_key, value);
    }

    fn send_own_variable(&self, player: PlayerId, sync_key: &str, value: i64) {
        self.record(ReplicationScope::Owner(player), sync_key, value);
    }
}

impl Default for InMemoryReplicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::{CurrencyRegistry, SyncPolicy};
    use crate::core::events::EventBus;
    use crate::core::wallet::WalletSynchronizer;
    use std::sync::Arc;

    #[test]
    fn test_latest_value_per_scope() {
        let replicator = InMemoryReplicator::new();
        let player = PlayerId(1);

        replicator.broadcast_variable(player, "currency_gold", 10);
        replicator.broadcast_variable(player, "currency_gold", 25);
        replicator.send_own_variable(player, "currency_cash", 3);

        assert_eq!(
            replicator.latest(ReplicationScope::Everyone(player), "currency_gold"),
            Some(25)
        );
        assert_eq!(
            replicator.latest(ReplicationScope::Owner(player), "currency_cash"),
            Some(3)
        );
        assert_eq!(
            replicator.latest(ReplicationScope::Owner(player), "currency_gold"),
            None
        );
        assert_eq!(replicator.history().len(), 3);
    }

    #[test]
    fn test_private_balances_never_reach_other_scopes() {
        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(CurrencyRegistry::new(Arc::clone(&bus)));
        registry.define("cash", "Cash", SyncPolicy::OwnerOnly).unwrap();
        registry.define("jackpot", "Jackpot", SyncPolicy::Broadcast).unwrap();
        registry.define("debt", "Debt", SyncPolicy::None).unwrap();

        let replicator = Arc::new(InMemoryReplicator::new());
        let wallets = WalletSynchronizer::new(registry, replicator.clone(), bus);
        let (alice, bob) = (PlayerId(1), PlayerId(2));
        wallets.attach_player(alice);
        wallets.attach_player(bob);

        wallets.set_balance(alice, "cash", 50);
        wallets.set_balance(bob, "jackpot", 1_000);
        wallets.set_balance(bob, "debt", 7);

        assert_eq!(
            replicator.latest(ReplicationScope::Owner(alice), "currency_cash"),
            Some(50)
        );
        assert_eq!(
            replicator.latest(ReplicationScope::Everyone(alice), "currency_cash"),
            None
        );
        assert_eq!(
            replicator.latest(ReplicationScope::Everyone(bob), "currency_jackpot"),
            Some(1_000)
        );
        assert!(replicator
            .history()
            .iter()
            .all(|sent| sent.sync_key != "currency_debt"));
    }
}
