// Wallet synchronizer - business logic for player balances
//
// This module owns every player's wallet and the three mutation operations.
// Each mutation checks the currency against the registry, applies the change
// in memory, hands the new value to the replication port according to the
// currency's sync policy, and finally announces the change on the event bus.
//
// Player-facing operations never return errors. They are routinely fed data
// the server does not control, so they report `false` (or 0) and log a warning.

use super::balance_filter::filter_balances;
use super::replication::VariableReplicator;
use super::wallet_models::{PlayerId, Wallet};
use crate::core::currency::{Currency, CurrencyRegistry, SyncPolicy};
use crate::core::events::{CurrencyEvent, EventBus, UpdateReason};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the wallet synchronizer.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Whether balances may go below zero. When disabled, a mutation that would
    /// produce a negative balance is refused.
    pub allow_negative_balances: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            allow_negative_balances: true,
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Per-player wallet storage plus the balance mutation operations.
///
/// Wallets live in a side table keyed by player. Each wallet has its own lock,
/// so two players never wait on each other.
pub struct WalletSynchronizer {
    registry: Arc<CurrencyRegistry>,
    replicator: Arc<dyn VariableReplicator>,
    events: Arc<EventBus>,
    wallets: DashMap<PlayerId, Arc<Mutex<Wallet>>>,
    config: WalletConfig,
}

impl WalletSynchronizer {
    pub fn new(
        registry: Arc<CurrencyRegistry>,
        replicator: Arc<dyn VariableReplicator>,
        events: Arc<EventBus>,
    ) -> Self {
        Self::new_with_config(registry, replicator, events, WalletConfig::default())
    }

    pub fn new_with_config(
        registry: Arc<CurrencyRegistry>,
        replicator: Arc<dyn VariableReplicator>,
        events: Arc<EventBus>,
        config: WalletConfig,
    ) -> Self {
        Self {
            registry,
            replicator,
            events,
            wallets: DashMap::new(),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<CurrencyRegistry> {
        &self.registry
    }

    // ------------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------------

    /// Give a freshly joined player an empty wallet.
    ///
    /// A wallet left over from a previous session is discarded.
    pub fn attach_player(&self, player_id: PlayerId) {
        let previous = self
            .wallets
            .insert(player_id, Arc::new(Mutex::new(Wallet::new())));
        if previous.is_some() {
            warn!(%player_id, "Player already had a wallet attached, replacing it");
        }
        info!(%player_id, "Wallet attached");
    }

    /// Drop a departing player's wallet, returning what it held.
    pub fn detach_player(&self, player_id: PlayerId) -> Option<Wallet> {
        let (_, wallet) = self.wallets.remove(&player_id)?;
        let wallet = lock_wallet(&wallet).clone();
        info!(%player_id, currencies = wallet.len(), "Wallet detached");
        Some(wallet)
    }

    pub fn is_attached(&self, player_id: PlayerId) -> bool {
        self.wallets.contains_key(&player_id)
    }

    pub fn attached_players(&self) -> usize {
        self.wallets.len()
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Balance of `key` for `player_id`. Unknown players and unknown or unset
    /// currencies all read as 0.
    pub fn get_balance(&self, player_id: PlayerId, key: &str) -> i64 {
        self.player_wallet(player_id)
            .map(|wallet| lock_wallet(&wallet).balance(key))
            .unwrap_or(0)
    }

    /// Copy of the player's whole wallet.
    pub fn wallet_snapshot(&self, player_id: PlayerId) -> Option<Wallet> {
        self.player_wallet(player_id)
            .map(|wallet| lock_wallet(&wallet).clone())
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Replace the player's whole wallet with a raw `{ key: amount }` snapshot.
    ///
    /// Returns false, changing nothing, if the player has no wallet or the
    /// snapshot is not an object. Entries for unknown currencies or with
    /// non-integer values are dropped and logged; the call still succeeds.
    pub fn replace_wallet(&self, player_id: PlayerId, new_balances: &Value) -> bool {
        let Some(wallet) = self.player_wallet(player_id) else {
            warn!(%player_id, "replace_wallet on a player without a wallet");
            return false;
        };

        let Some(filtered) = filter_balances(
            new_balances,
            |key| self.registry.has(key),
            self.config.allow_negative_balances,
        ) else {
            warn!(%player_id, "replace_wallet expects an object of currency balances");
            return false;
        };

        for dropped in &filtered.dropped {
            warn!(
                %player_id,
                currency = %dropped.key,
                value = %dropped.value,
                reason = %dropped.reason,
                "Dropped wallet entry"
            );
        }

        let new_wallet = filtered.wallet;
        let old_wallet = {
            let Some(mut guard) = self.lock_if_current(player_id, &wallet) else {
                warn!(%player_id, "Wallet detached during replace_wallet");
                return false;
            };
            let old_wallet = std::mem::replace(&mut *guard, new_wallet.clone());
            for (key, amount) in new_wallet.iter() {
                if let Some(currency) = self.registry.get(key) {
                    self.replicate(player_id, &currency, amount);
                }
            }
            old_wallet
        };

        debug!(
            %player_id,
            kept = new_wallet.len(),
            dropped = filtered.dropped.len(),
            "Wallet replaced"
        );

        self.events.emit(&CurrencyEvent::WalletReplaced {
            player_id,
            old_wallet,
            new_wallet,
        });
        true
    }

    /// Overwrite one balance.
    ///
    /// Returns false, changing nothing, for an unknown player or currency.
    pub fn set_balance(&self, player_id: PlayerId, key: &str, new_amount: i64) -> bool {
        self.write_balance(player_id, key, UpdateReason::Set, |_| Some(new_amount))
    }

    /// Add `delta` (possibly negative) to one balance. A currency the player has
    /// never held starts from 0.
    ///
    /// Returns false, changing nothing, for an unknown player or currency, or
    /// if the result would overflow.
    pub fn adjust_balance(&self, player_id: PlayerId, key: &str, delta: i64) -> bool {
        self.write_balance(player_id, key, UpdateReason::Adjust, |current| {
            current.unwrap_or(0).checked_add(delta)
        })
    }

    fn write_balance<F>(
        &self,
        player_id: PlayerId,
        key: &str,
        reason: UpdateReason,
        compute: F,
    ) -> bool
    where
        F: FnOnce(Option<i64>) -> Option<i64>,
    {
        let Some(currency) = self.registry.get(key) else {
            warn!(%player_id, currency = key, %reason, "Unknown currency");
            return false;
        };
        let Some(wallet) = self.player_wallet(player_id) else {
            warn!(%player_id, currency = key, %reason, "Player has no wallet attached");
            return false;
        };

        let (old_amount, new_amount) = {
            let Some(mut guard) = self.lock_if_current(player_id, &wallet) else {
                warn!(%player_id, currency = key, %reason, "Wallet detached during update");
                return false;
            };
            let current = guard.get(key);

            let Some(new_amount) = compute(current) else {
                warn!(%player_id, currency = key, %reason, "Balance would overflow");
                return false;
            };
            if new_amount < 0 && !self.config.allow_negative_balances {
                warn!(
                    %player_id,
                    currency = key,
                    %reason,
                    new_amount,
                    "Refusing negative balance"
                );
                return false;
            }

            guard.insert(key, new_amount);
            self.replicate(player_id, &currency, new_amount);
            (current.unwrap_or(0), new_amount)
        };

        debug!(%player_id, currency = key, %reason, old_amount, new_amount, "Balance updated");

        self.events.emit(&CurrencyEvent::CurrencyUpdated {
            player_id,
            key: currency.key,
            old_amount,
            new_amount,
            reason,
        });
        true
    }

    /// Hand the value to the host according to the currency's sync policy.
    fn replicate(&self, player_id: PlayerId, currency: &Currency, value: i64) {
        match currency.sync_policy {
            SyncPolicy::None => {}
            SyncPolicy::Broadcast => {
                debug!(%player_id, sync_key = %currency.sync_key, value, "Broadcasting balance");
                self.replicator
                    .broadcast_variable(player_id, &currency.sync_key, value);
            }
            SyncPolicy::OwnerOnly => {
                debug!(%player_id, sync_key = %currency.sync_key, value, "Sending balance to owner");
                self.replicator
                    .send_own_variable(player_id, &currency.sync_key, value);
            }
        }
    }

    fn player_wallet(&self, player_id: PlayerId) -> Option<Arc<Mutex<Wallet>>> {
        // Clone the Arc out so the map shard is released before locking.
        self.wallets.get(&player_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Lock `wallet` only if it is still the one attached to `player_id`.
    ///
    /// A detach or re-attach can slip in between `player_wallet` and the lock;
    /// writing to the discarded wallet would be lost silently.
    fn lock_if_current<'a>(
        &self,
        player_id: PlayerId,
        wallet: &'a Arc<Mutex<Wallet>>,
    ) -> Option<MutexGuard<'a, Wallet>> {
        let guard = lock_wallet(wallet);
        let current = self
            .wallets
            .get(&player_id)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), wallet));
        current.then_some(guard)
    }
}

fn lock_wallet(wallet: &Mutex<Wallet>) -> MutexGuard<'_, Wallet> {
    wallet.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wallet::{ReplicatedVariable, ReplicationScope};
    use serde_json::json;

    // Simple recording replicator for testing
    #[derive(Default)]
    struct RecordingReplicator {
        sent: Mutex<Vec<ReplicatedVariable>>,
    }

    impl RecordingReplicator {
        fn sent(&self) -> Vec<ReplicatedVariable> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl VariableReplicator for RecordingReplicator {
        fn broadcast_variable(&self, owner: PlayerId, sync_key: &str, value: i64) {
            self.sent.lock().unwrap().push(ReplicatedVariable {
                scope: ReplicationScope::Everyone(owner),
                sync_key: sync_key.to_string(),
                value,
            });
        }

        fn send_own_variable(&self, player: PlayerId, sync_key: &str, value: i64) {
            self.sent.lock().unwrap().push(ReplicatedVariable {
                scope: ReplicationScope::Owner(player),
                sync_key: sync_key.to_string(),
                value,
            });
        }
    }

    struct Fixture {
        wallets: WalletSynchronizer,
        replicator: Arc<RecordingReplicator>,
        events: Arc<Mutex<Vec<CurrencyEvent>>>,
    }

    const PLAYER: PlayerId = PlayerId(7);

    fn fixture_with_config(config: WalletConfig) -> Fixture {
        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(CurrencyRegistry::new(Arc::clone(&bus)));
        registry.define("gold", "Gold", SyncPolicy::Broadcast).unwrap();
        registry.define("cash", "Cash", SyncPolicy::OwnerOnly).unwrap();
        registry.define("xp", "Experience", SyncPolicy::None).unwrap();

        // Subscribe after defining so only wallet events are recorded.
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        bus.subscribe_fn("recorder", move |event| sink.lock().unwrap().push(event.clone()));

        let replicator = Arc::new(RecordingReplicator::default());
        let wallets =
            WalletSynchronizer::new_with_config(registry, replicator.clone(), bus, config);
        wallets.attach_player(PLAYER);

        Fixture {
            wallets,
            replicator,
            events,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_config(WalletConfig::default())
    }

    fn recorded(fixture: &Fixture) -> Vec<CurrencyEvent> {
        fixture.events.lock().unwrap().clone()
    }

    #[test]
    fn test_set_balance_broadcasts_and_notifies() {
        let f = fixture();

        assert!(f.wallets.set_balance(PLAYER, "gold", 100));
        assert_eq!(f.wallets.get_balance(PLAYER, "gold"), 100);
        assert_eq!(
            f.replicator.sent(),
            vec![ReplicatedVariable {
                scope: ReplicationScope::Everyone(PLAYER),
                sync_key: "currency_gold".to_string(),
                value: 100,
            }]
        );
        assert_eq!(
            recorded(&f),
            vec![CurrencyEvent::CurrencyUpdated {
                player_id: PLAYER,
                key: "gold".to_string(),
                old_amount: 0,
                new_amount: 100,
                reason: UpdateReason::Set,
            }]
        );
    }

    #[test]
    fn test_adjust_balance_after_set() {
        let f = fixture();
        f.wallets.set_balance(PLAYER, "gold", 100);

        assert!(f.wallets.adjust_balance(PLAYER, "gold", -30));
        assert_eq!(f.wallets.get_balance(PLAYER, "gold"), 70);

        let last = recorded(&f).pop().unwrap();
        assert_eq!(
            last,
            CurrencyEvent::CurrencyUpdated {
                player_id: PLAYER,
                key: "gold".to_string(),
                old_amount: 100,
                new_amount: 70,
                reason: UpdateReason::Adjust,
            }
        );
        assert_eq!(f.replicator.sent().last().map(|v| v.value), Some(70));
    }

    #[test]
    fn test_adjusts_compose_like_a_single_set() {
        let adjusted = fixture();
        assert!(adjusted.wallets.adjust_balance(PLAYER, "cash", 15));
        assert!(adjusted.wallets.adjust_balance(PLAYER, "cash", -40));

        let set = fixture();
        assert!(set.wallets.set_balance(PLAYER, "cash", 15 + -40));

        assert_eq!(
            adjusted.wallets.get_balance(PLAYER, "cash"),
            set.wallets.get_balance(PLAYER, "cash")
        );
        assert_eq!(adjusted.wallets.get_balance(PLAYER, "cash"), -25);
    }

    #[test]
    fn test_owner_only_and_none_policies() {
        let f = fixture();

        f.wallets.set_balance(PLAYER, "cash", 12);
        f.wallets.set_balance(PLAYER, "xp", 900);

        assert_eq!(
            f.replicator.sent(),
            vec![ReplicatedVariable {
                scope: ReplicationScope::Owner(PLAYER),
                sync_key: "currency_cash".to_string(),
                value: 12,
            }]
        );
        // xp is still stored and announced, just never replicated.
        assert_eq!(f.wallets.get_balance(PLAYER, "xp"), 900);
        assert_eq!(recorded(&f).len(), 2);
    }

    #[test]
    fn test_unknown_currency_is_a_soft_failure() {
        let f = fixture();

        assert!(!f.wallets.set_balance(PLAYER, "diamonds", 5));
        assert!(!f.wallets.adjust_balance(PLAYER, "diamonds", 5));
        assert_eq!(f.wallets.get_balance(PLAYER, "diamonds"), 0);
        assert_eq!(f.wallets.wallet_snapshot(PLAYER), Some(Wallet::new()));
        assert!(f.replicator.sent().is_empty());
        assert!(recorded(&f).is_empty());
    }

    #[test]
    fn test_unattached_player_is_a_soft_failure() {
        let f = fixture();
        let stranger = PlayerId(99);

        assert!(!f.wallets.set_balance(stranger, "gold", 5));
        assert!(!f.wallets.adjust_balance(stranger, "gold", 5));
        assert!(!f.wallets.replace_wallet(stranger, &json!({ "gold": 5 })));
        assert_eq!(f.wallets.get_balance(stranger, "gold"), 0);
        assert_eq!(f.wallets.wallet_snapshot(stranger), None);
        assert!(recorded(&f).is_empty());
    }

    #[test]
    fn test_adjust_overflow_is_refused() {
        let f = fixture();
        f.wallets.set_balance(PLAYER, "gold", i64::MAX);

        assert!(!f.wallets.adjust_balance(PLAYER, "gold", 1));
        assert_eq!(f.wallets.get_balance(PLAYER, "gold"), i64::MAX);
        assert_eq!(recorded(&f).len(), 1);
    }

    #[test]
    fn test_negative_balances_can_be_disabled() {
        let f = fixture_with_config(WalletConfig {
            allow_negative_balances: false,
        });
        f.wallets.set_balance(PLAYER, "gold", 10);

        assert!(!f.wallets.adjust_balance(PLAYER, "gold", -11));
        assert!(!f.wallets.set_balance(PLAYER, "gold", -1));
        assert_eq!(f.wallets.get_balance(PLAYER, "gold"), 10);

        assert!(f.wallets.adjust_balance(PLAYER, "gold", -10));
        assert_eq!(f.wallets.get_balance(PLAYER, "gold"), 0);
    }

    #[test]
    fn test_replace_wallet_filters_and_replicates() {
        let f = fixture();
        f.wallets.set_balance(PLAYER, "cash", 3);

        let input = json!({ "gold": 5, "unknown_currency": 9, "gold2": "not_a_number" });
        assert!(f.wallets.replace_wallet(PLAYER, &input));

        let wallet = f.wallets.wallet_snapshot(PLAYER).unwrap();
        assert_eq!(wallet.iter().collect::<Vec<_>>(), vec![("gold", 5)]);
        assert_eq!(f.wallets.get_balance(PLAYER, "cash"), 0);

        let sent = f.replicator.sent();
        assert_eq!(
            sent.last().map(|v| (v.sync_key.as_str(), v.value)),
            Some(("currency_gold", 5))
        );

        let mut old_wallet = Wallet::new();
        old_wallet.insert("cash", 3);
        assert_eq!(
            recorded(&f).pop().unwrap(),
            CurrencyEvent::WalletReplaced {
                player_id: PLAYER,
                old_wallet,
                new_wallet: wallet,
            }
        );
    }

    #[test]
    fn test_replace_wallet_replicates_each_policy_once() {
        let f = fixture();

        let input = json!({ "gold": 40, "cash": 12, "xp": 300 });
        assert!(f.wallets.replace_wallet(PLAYER, &input));

        let sent = f.replicator.sent();
        let broadcasts: Vec<_> = sent
            .iter()
            .filter(|v| v.scope == ReplicationScope::Everyone(PLAYER))
            .collect();
        let owned: Vec<_> = sent
            .iter()
            .filter(|v| v.scope == ReplicationScope::Owner(PLAYER))
            .collect();

        assert_eq!(sent.len(), 2);
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(
            (broadcasts[0].sync_key.as_str(), broadcasts[0].value),
            ("currency_gold", 40)
        );
        assert_eq!(owned.len(), 1);
        assert_eq!(
            (owned[0].sync_key.as_str(), owned[0].value),
            ("currency_cash", 12)
        );
        assert!(sent.iter().all(|v| v.sync_key != "currency_xp"));
        assert_eq!(f.wallets.get_balance(PLAYER, "xp"), 300);
    }

    #[test]
    fn test_stale_wallet_handle_is_not_written() {
        let f = fixture();
        let stale = f.wallets.player_wallet(PLAYER).unwrap();

        f.wallets.detach_player(PLAYER);
        assert!(f.wallets.lock_if_current(PLAYER, &stale).is_none());

        f.wallets.attach_player(PLAYER);
        assert!(f.wallets.lock_if_current(PLAYER, &stale).is_none());

        let fresh = f.wallets.player_wallet(PLAYER).unwrap();
        assert!(f.wallets.lock_if_current(PLAYER, &fresh).is_some());
        assert!(f.wallets.set_balance(PLAYER, "gold", 3));
        assert_eq!(f.wallets.get_balance(PLAYER, "gold"), 3);
    }

    #[test]
    fn test_replace_wallet_rejects_malformed_input() {
        let f = fixture();
        f.wallets.set_balance(PLAYER, "gold", 1);

        assert!(!f.wallets.replace_wallet(PLAYER, &json!([1, 2, 3])));
        assert!(!f.wallets.replace_wallet(PLAYER, &json!("gold")));
        assert_eq!(f.wallets.get_balance(PLAYER, "gold"), 1);
        assert_eq!(recorded(&f).len(), 1);
    }

    #[test]
    fn test_attach_and_detach() {
        let f = fixture();
        f.wallets.set_balance(PLAYER, "gold", 42);

        let discarded = f.wallets.detach_player(PLAYER).unwrap();
        assert_eq!(discarded.balance("gold"), 42);
        assert!(!f.wallets.is_attached(PLAYER));
        assert_eq!(f.wallets.detach_player(PLAYER), None);

        f.wallets.attach_player(PLAYER);
        assert_eq!(f.wallets.get_balance(PLAYER, "gold"), 0);
        assert_eq!(f.wallets.attached_players(), 1);
    }

    #[test]
    fn test_listener_can_read_balance_during_notification() {
        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(CurrencyRegistry::new(Arc::clone(&bus)));
        registry.define("gold", "Gold", SyncPolicy::None).unwrap();
        let wallets = Arc::new(WalletSynchronizer::new(
            registry,
            Arc::new(RecordingReplicator::default()),
            Arc::clone(&bus),
        ));
        wallets.attach_player(PLAYER);

        let seen = Arc::new(Mutex::new(None));
        let (sink, reader) = (Arc::clone(&seen), Arc::downgrade(&wallets));
        bus.subscribe_fn("reader", move |_| {
            if let Some(wallets) = reader.upgrade() {
                *sink.lock().unwrap() = Some(wallets.get_balance(PLAYER, "gold"));
            }
        });

        wallets.set_balance(PLAYER, "gold", 8);
        assert_eq!(*seen.lock().unwrap(), Some(8));
    }
}
