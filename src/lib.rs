pub mod config;
pub mod console;
pub mod peers;
pub mod shutdown;
pub mod sweeper;
pub mod types;

pub use peers::{new_store, PeerRecord, PeerRegistry, PeerStore, Snapshot};
