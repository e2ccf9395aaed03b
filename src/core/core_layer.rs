// The core module contains all domain logic.
// Each concern gets its own submodule; none of them know about the host runtime.

#[path = "currency/mod.rs"]
pub mod currency;

#[path = "events/event_bus.rs"]
pub mod events;

#[path = "wallet/mod.rs"]
pub mod wallet;
