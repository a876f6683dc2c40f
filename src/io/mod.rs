//! IO modules - adapters around the tracking engine
//!
//! This module contains the concrete collaborators and input parsers:
//! - `memory` - In-memory store catalog and visit store
//! - `visit_log` - Durable visit store (JSONL journal)
//! - `store_seed` - Store catalog bootstrap from a JSON seed file
//! - `ping_feed` - JSONL ping parsing and validation

pub mod memory;
pub mod ping_feed;
pub mod store_seed;
pub mod visit_log;

// Re-export commonly used types
pub use memory::{InMemoryVisitStore, StaticStoreCatalog};
pub use ping_feed::{parse_ping, parse_ping_bytes, PingError};
pub use store_seed::{load_stores, SeedError};
pub use visit_log::VisitLog;
