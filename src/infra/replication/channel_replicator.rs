// Channel-backed VariableReplicator.
//
// Replication is a fire-and-forget hand-off: the synchronizer pushes onto an
// unbounded channel and returns immediately, and a tokio task owned by the host
// drains the receiver into its network layer.

use crate::core::wallet::{PlayerId, ReplicatedVariable, ReplicationScope, VariableReplicator};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

pub struct ChannelReplicator {
    tx: UnboundedSender<ReplicatedVariable>,
}

impl ChannelReplicator {
    /// Create a replicator and the receiving end the host should drain.
    pub fn new() -> (Self, UnboundedReceiver<ReplicatedVariable>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, scope: ReplicationScope, sync_key: &str, value: i64) {
        let variable = ReplicatedVariable {
            scope,
            sync_key: sync_key.to_string(),
            value,
        };
        if self.tx.send(variable).is_err() {
            // Receiver gone means the host is shutting down; nothing to deliver to.
            warn!(
                player_id = %scope.player_id(),
                sync_key,
                "Replication channel closed, dropping update"
            );
        }
    }
}

impl VariableReplicator for ChannelReplicator {
    fn broadcast_variable(&self, owner: PlayerId, sync_key: &str, value: i64) {
        self.push(ReplicationScope::Everyone(owner), sync_key, value);
    }

    fn send_own_variable(&self, player: PlayerId, sync_key: &str, value: i64) {
        self.push(ReplicationScope::Owner(player), sync_key, value);
    }
}
