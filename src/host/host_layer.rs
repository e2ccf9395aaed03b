// Host layer - adapters driven by the game server runtime.

#[path = "session_lifecycle.rs"]
pub mod session;
