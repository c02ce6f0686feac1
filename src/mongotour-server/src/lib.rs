//! mongotour - a guided tour of document-store operations over HTTP
//!
//! This crate provides both a library and binary for running the sample.
//!
//! # Embedded Usage
//!
//! ```rust,no_run
//! use mongotour_core::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryStore::new();
//!     let log = run_sequence(&store).await?;
//!     log.print()?;
//!     Ok(())
//! }
//! ```
//!
//! # Server Usage
//!
//! Run the binary to start the web front end, then open `/databasetest`:
//! ```bash
//! VCAP_SERVICES='{"timeseriesdatabase":[{"credentials":{"mongodb_url":"mongodb://localhost/test"}}]}' \
//!     mongotour-server
//! ```

pub use mongotour_core;

pub mod api;
pub mod telemetry;
