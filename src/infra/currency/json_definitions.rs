// JSON currency definitions.
//
// Lets the host declare its currencies in a file instead of code:
//
// [
//   { "key": "cash", "display_name": "Cash", "sync_policy": "owner_only" },
//   { "key": "jackpot", "display_name": "Jackpot", "sync_policy": "broadcast" }
// ]
//
// `sync_policy` is kept as text so an unknown policy surfaces as the same
// InvalidArgument error `define` would report.

use crate::core::currency::{Currency, CurrencyError, CurrencyRegistry};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One entry of a definitions file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyDefinition {
    pub key: String,
    pub display_name: String,
    #[serde(default = "default_policy")]
    pub sync_policy: String,
}

fn default_policy() -> String {
    "none".to_string()
}

/// Read the definitions in a file without registering them.
pub fn load_definitions(
    path: impl AsRef<Path>,
) -> Result<Vec<CurrencyDefinition>, CurrencyError> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| CurrencyError::Definitions(format!("{}: {}", path.display(), e)))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| CurrencyError::Definitions(format!("{}: {}", path.display(), e)))
}

/// Register definitions in order, stopping at the first failure.
///
/// Currencies defined before the failing entry stay registered.
pub fn define_all(
    registry: &CurrencyRegistry,
    definitions: &[CurrencyDefinition],
) -> Result<Vec<Currency>, CurrencyError> {
    definitions
        .iter()
        .map(|def| registry.define_named_policy(&def.key, &def.display_name, &def.sync_policy))
        .collect()
}

/// Load a definitions file straight into the registry.
pub fn load_into(
    registry: &CurrencyRegistry,
    path: impl AsRef<Path>,
) -> Result<Vec<Currency>, CurrencyError> {
    let definitions = load_definitions(path)?;
    define_all(registry, &definitions)
}
