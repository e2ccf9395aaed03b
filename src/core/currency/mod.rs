// Currency module - the registry of currency definitions

mod currency_models;
mod currency_registry;

pub use currency_models::{Currency, CurrencyError, SyncPolicy, INVALID_CURRENCY_NAME};
pub use currency_registry::CurrencyRegistry;
