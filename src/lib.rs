// Currency registry and player-wallet synchronization for a game server.
//
// **Architecture Overview:**
// - `core/` = Domain logic (registry, wallets, sync policy, notifications)
// - `infra/` = Implementations of core ports (replicators, definition files, audit)
// - `host/` = Adapters the host runtime drives (player session lifecycle)
//
// The host process owns one `CurrencyRegistry`, one `EventBus` and one
// `WalletSynchronizer`, and injects them wherever they are needed. Nothing in
// this crate lives in a global.

// Same trick as the binary: point each layer at a descriptive root file.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "host/host_layer.rs"]
pub mod host;
#[path = "infra/infra_layer.rs"]
pub mod infra;

pub use crate::core::currency::{
    Currency, CurrencyError, CurrencyRegistry, SyncPolicy, INVALID_CURRENCY_NAME,
};
pub use crate::core::events::{CurrencyEvent, CurrencyEventListener, EventBus, UpdateReason};
pub use crate::core::wallet::{
    PlayerId, ReplicationScope, VariableReplicator, Wallet, WalletConfig, WalletSynchronizer,
};
