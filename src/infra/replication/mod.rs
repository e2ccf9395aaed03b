// Replication module - implementations of the VariableReplicator port

pub mod channel_replicator;
pub mod in_memory;

pub use channel_replicator::ChannelReplicator;
pub use in_memory::InMemoryReplicator;
