// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "replication/mod.rs"]
pub mod replication;

#[path = "currency/json_definitions.rs"]
pub mod currency;

#[path = "audit/audit_ledger.rs"]
pub mod audit;
