// Notifications emitted by the registry and the wallet synchronizer.
//
// Listeners subscribe to an `EventBus` and receive every event in the order
// they were registered. The bus is the only side channel the core has besides
// the replication port, which keeps the core testable without a network layer.

use crate::core::currency::SyncPolicy;
use crate::core::wallet::{PlayerId, Wallet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// Why a single balance changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateReason {
    Set,
    Adjust,
}

impl UpdateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateReason::Set => "set",
            UpdateReason::Adjust => "adjust",
        }
    }
}

impl fmt::Display for UpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the core announces to the outside world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrencyEvent {
    /// A new currency was registered.
    CurrencyDefined {
        key: String,
        display_name: String,
        sync_policy: SyncPolicy,
        sync_key: String,
    },
    /// A player's wallet was replaced wholesale.
    WalletReplaced {
        player_id: PlayerId,
        old_wallet: Wallet,
        new_wallet: Wallet,
    },
    /// A single balance was set or adjusted.
    CurrencyUpdated {
        player_id: PlayerId,
        key: String,
        old_amount: i64,
        new_amount: i64,
        reason: UpdateReason,
    },
}

impl CurrencyEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CurrencyEvent::CurrencyDefined { .. } => "currency_defined",
            CurrencyEvent::WalletReplaced { .. } => "wallet_replaced",
            CurrencyEvent::CurrencyUpdated { .. } => "currency_updated",
        }
    }
}

/// Trait for anything that wants to observe currency events.
///
/// Handlers run synchronously on the thread that performed the mutation, after
/// the affected wallet has been unlocked, so they may read balances back.
pub trait CurrencyEventListener: Send + Sync {
    fn handle(&self, event: &CurrencyEvent);

    /// Name of this listener for diagnostics.
    fn name(&self) -> &'static str;
}

/// Adapter so plain closures can be subscribed.
struct FnListener<F> {
    name: &'static str,
    callback: F,
}

impl<F> CurrencyEventListener for FnListener<F>
where
    F: Fn(&CurrencyEvent) + Send + Sync,
{
    fn handle(&self, event: &CurrencyEvent) {
        (self.callback)(event)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fan-out of events to registered listeners.
pub struct EventBus {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn CurrencyEventListener>)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener. It is called after every listener registered before it.
    pub fn subscribe(&self, listener: Arc<dyn CurrencyEventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    pub fn subscribe_fn<F>(&self, name: &'static str, callback: F) -> ListenerId
    where
        F: Fn(&CurrencyEvent) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnListener { name, callback }))
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver an event to every listener in registration order.
    pub fn emit(&self, event: &CurrencyEvent) {
        // Snapshot first so a listener can (un)subscribe without deadlocking.
        let listeners: Vec<Arc<dyn CurrencyEventListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            trace!(listener = listener.name(), event = event.kind(), "Dispatching event");
            listener.handle(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
