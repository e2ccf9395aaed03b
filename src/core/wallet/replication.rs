// Replication port.
//
// The core decides WHETHER and TO WHOM a balance is pushed; the host's variable
// sharing mechanism decides HOW. Implementations live in the infra layer.

use super::wallet_models::PlayerId;
use serde::Serialize;

/// Who can see a replicated variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", content = "player_id", rename_all = "snake_case")]
pub enum ReplicationScope {
    /// Every connected client sees this player's value.
    Everyone(PlayerId),
    /// Only the player's own client sees it.
    Owner(PlayerId),
}

impl ReplicationScope {
    pub fn player_id(&self) -> PlayerId {
        match self {
            ReplicationScope::Everyone(player_id) | ReplicationScope::Owner(player_id) => {
                *player_id
            }
        }
    }
}

/// One value handed to the replication mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicatedVariable {
    pub scope: ReplicationScope,
    pub sync_key: String,
    pub value: i64,
}

/// Variable sharing primitives provided by the host runtime.
///
/// Both calls are fire-and-forget: they must not block and must not call back
/// into the wallet synchronizer, which holds the player's wallet lock while
/// replicating.
pub trait VariableReplicator: Send + Sync {
    /// Push `value` on channel `sync_key` of `owner` to all connected clients.
    fn broadcast_variable(&self, owner: PlayerId, sync_key: &str, value: i64);

    /// Push `value` on channel `sync_key` to `player`'s own client only.
    fn send_own_variable(&self, player: PlayerId, sync_key: &str, value: i64);
}
