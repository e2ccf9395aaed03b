// Composition root for the currency sync layer.
//
// In production the game server embeds the library and wires these pieces to
// its own session and networking code. This binary does the same wiring with
// stand-ins so the whole flow can be watched from a terminal:
// 1. Load configuration
// 2. Define currencies (from a JSON file, or a built-in set)
// 3. Wire the registry, event bus, replicator and synchronizer together
// 4. Replay a short session, printing wallets and the audit trail before players leave

use anyhow::{ensure, Context, Result};
use currency_sync::core::currency::{CurrencyRegistry, SyncPolicy};
use currency_sync::core::events::{CurrencyEvent, EventBus};
use currency_sync::core::wallet::{PlayerId, WalletConfig, WalletSynchronizer};
use currency_sync::host::session::{SessionEvent, SessionLifecycle};
use currency_sync::infra::audit::{AuditConfig, AuditLedger};
use currency_sync::infra::currency as definitions;
use currency_sync::infra::replication::ChannelReplicator;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Settings read from the environment (and `.env`, if present).
struct AppConfig {
    definitions_file: Option<String>,
    wallet: WalletConfig,
    audit: AuditConfig,
}

impl AppConfig {
    fn from_env() -> Result<Self> {
        let definitions_file = std::env::var("CURRENCY_DEFINITIONS_FILE").ok();

        let mut wallet = WalletConfig::default();
        if let Ok(value) = std::env::var("ALLOW_NEGATIVE_BALANCES") {
            wallet.allow_negative_balances = value.parse().with_context(|| {
                format!("ALLOW_NEGATIVE_BALANCES must be true or false, got '{value}'")
            })?;
        }

        let mut audit = AuditConfig::default();
        if let Ok(value) = std::env::var("AUDIT_MAX_ENTRIES") {
            audit.max_entries_per_player = value
                .parse()
                .with_context(|| format!("AUDIT_MAX_ENTRIES must be a number, got '{value}'"))?;
        }

        Ok(Self {
            definitions_file,
            wallet,
            audit,
        })
    }
}

fn define_builtin_currencies(registry: &CurrencyRegistry) -> Result<()> {
    registry.define("cash", "Cash", SyncPolicy::OwnerOnly)?;
    registry.define("vip_tokens", "VIP Tokens", SyncPolicy::OwnerOnly)?;
    registry.define("jackpot", "Jackpot", SyncPolicy::Broadcast)?;
    registry.define("reputation", "Reputation", SyncPolicy::None)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let events = Arc::new(EventBus::new());
    events.subscribe_fn("logger", |event| {
        if let CurrencyEvent::CurrencyUpdated {
            player_id,
            key,
            old_amount,
            new_amount,
            reason,
        } = event
        {
            info!(
                %player_id,
                currency = %key,
                old_amount,
                new_amount,
                %reason,
                "Currency updated"
            );
        }
    });

    let audit = Arc::new(AuditLedger::new_with_config(config.audit.clone()));
    events.subscribe(audit.clone());

    let registry = Arc::new(CurrencyRegistry::new(Arc::clone(&events)));
    match &config.definitions_file {
        Some(path) => {
            definitions::load_into(&registry, path)
                .with_context(|| format!("Failed to define currencies from {path}"))?;
        }
        None => define_builtin_currencies(&registry)?,
    }
    info!(currencies = ?registry.list_keys(), "Currency registry ready");

    // Stand-in for the host's network layer: log everything we would send.
    let (replicator, mut outbound) = ChannelReplicator::new();
    let network = tokio::spawn(async move {
        while let Some(variable) = outbound.recv().await {
            info!(
                scope = ?variable.scope,
                sync_key = %variable.sync_key,
                value = variable.value,
                "Replicating variable"
            );
        }
    });

    let wallets = Arc::new(WalletSynchronizer::new_with_config(
        Arc::clone(&registry),
        Arc::new(replicator),
        Arc::clone(&events),
        config.wallet.clone(),
    ));

    let sessions = SessionLifecycle::new(Arc::clone(&wallets)).with_audit(Arc::clone(&audit));

    // ========================================================================
    // SAMPLE SESSION
    // ========================================================================

    let (alice, bob) = (PlayerId(1), PlayerId(2));
    sessions.handle(SessionEvent::PlayerJoined(alice));
    sessions.handle(SessionEvent::PlayerJoined(bob));

    for key in registry.list_keys() {
        ensure!(
            wallets.set_balance(alice, &key, 100),
            "failed to seed {key} for {alice}"
        );
    }
    ensure!(
        wallets.adjust_balance(alice, "cash", -30),
        "failed to charge {alice}"
    );
    ensure!(
        wallets.adjust_balance(bob, "vip_tokens", 5),
        "failed to grant tokens to {bob}"
    );
    // Unknown and non-integer entries are dropped; the replacement itself succeeds.
    ensure!(
        wallets.replace_wallet(
            bob,
            &json!({ "cash": 250, "jackpot": 1_000, "diamonds": 9, "vip_tokens": "lots" }),
        ),
        "failed to replace wallet for {bob}"
    );

    for player in [alice, bob] {
        let wallet = wallets.wallet_snapshot(player).unwrap_or_default();
        let wallet = serde_json::to_string(&wallet)?;
        info!(%player, %wallet, "Final wallet");
        for entry in audit.recent(player, 5) {
            info!(
                %player,
                currency = %registry.display_name_of(&entry.currency),
                old_amount = entry.old_amount,
                new_amount = entry.new_amount,
                reason = %entry.reason,
                at = %entry.timestamp,
                "Audit"
            );
        }
    }

    sessions.handle(SessionEvent::PlayerLeft(alice));
    sessions.handle(SessionEvent::PlayerLeft(bob));
    drop(sessions);

    // Dropping the synchronizer drops the replicator, which closes the channel.
    drop(wallets);
    network.await.context("replication task panicked")?;

    Ok(())
}
