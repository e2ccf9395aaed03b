// Wallet module - per-player balances and their replication to clients

mod balance_filter;
mod replication;
mod wallet_models;
mod wallet_service;

pub use balance_filter::{filter_balances, DropReason, DroppedEntry, FilteredBalances};
pub use replication::{ReplicatedVariable, ReplicationScope, VariableReplicator};
pub use wallet_models::{PlayerId, Wallet};
pub use wallet_service::{WalletConfig, WalletSynchronizer};
