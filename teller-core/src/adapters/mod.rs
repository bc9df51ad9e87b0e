//! Adapter implementations (hexagonal architecture)
//!
//! Adapters implement the port traits with concrete backing stores.

pub mod flat_file;
pub mod memory;

pub use flat_file::FlatFileStorage;
pub use memory::MemoryStorage;
