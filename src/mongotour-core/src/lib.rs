//! mongotour Core Library
//!
//! This crate provides the core functionality for mongotour, including:
//! - Connection configuration and service-binding resolution
//! - A document store seam with MongoDB and in-memory backends
//! - The sequential operation runner
//! - The operation log rendered by the server

pub mod config;
pub mod log;
pub mod memory;
pub mod models;
pub mod mongo;
pub mod runner;
pub mod store;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use log::OperationLog;
pub use memory::{MemoryConnector, MemoryStore};
pub use models::*;
pub use mongo::{MongoConnector, MongoStore};
pub use runner::{run_sequence, SequenceError, Step};
pub use store::{DocumentStore, QueryResults, StoreConnector};
