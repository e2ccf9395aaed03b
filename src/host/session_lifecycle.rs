// Session lifecycle hooks.
//
// The host runtime tells us when players join and leave; this adapter makes
// sure a wallet is attached before any wallet operation can reach the player
// and is discarded when they go, along with their audit history. The registry
// is never touched here.

use crate::core::wallet::{PlayerId, WalletSynchronizer};
use crate::infra::audit::AuditLedger;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Player session transitions reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    PlayerJoined(PlayerId),
    PlayerLeft(PlayerId),
}

pub struct SessionLifecycle {
    wallets: Arc<WalletSynchronizer>,
    audit: Option<Arc<AuditLedger>>,
}

impl SessionLifecycle {
    pub fn new(wallets: Arc<WalletSynchronizer>) -> Self {
        Self {
            wallets,
            audit: None,
        }
    }

    /// Also forget a player's audit history when they leave.
    pub fn with_audit(mut self, audit: Arc<AuditLedger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Apply one session transition.
    pub fn handle(&self, event: SessionEvent) {
        match event {
            SessionEvent::PlayerJoined(player_id) => self.wallets.attach_player(player_id),
            SessionEvent::PlayerLeft(player_id) => {
                if self.wallets.detach_player(player_id).is_none() {
                    debug!(%player_id, "Player left without an attached wallet");
                }
                if let Some(audit) = &self.audit {
                    audit.clear(player_id);
                }
            }
        }
    }

    /// Process session events until every sender is dropped.
    pub async fn run(self, mut events: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        info!(
            remaining = self.wallets.attached_players(),
            "Session event stream closed"
        );
    }
}
