//! # mysql-tpdump
//!
//! Extracts a referentially-consistent subset of a MySQL database and
//! emits it as a replayable SQL script.
//!
//! Starting from one table filtered by a user-supplied predicate, the
//! engine walks the foreign-key graph outward to every table that
//! transitively references already-selected rows:
//!
//! - the **graph builder** loads `information_schema` foreign keys and
//!   links tables through [`graph::Reference`]s,
//! - the **sequencer** orders tables so a table is never processed
//!   before the tables its filters depend on,
//! - the **filter synthesizer** turns already-observed key values into
//!   bounded `IN`/equality predicates,
//! - the **dump engine** streams rows, falls back to in-memory
//!   filtering when a predicate would be too large, and writes
//!   `LOCK TABLES` / `REPLACE INTO` blocks wrapped in a session
//!   preamble that disables constraint checking on replay.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mysql_tpdump::{Config, DumpEngine, MysqlSource};
//!
//! #[tokio::main]
//! async fn main() -> mysql_tpdump::Result<()> {
//!     let config = Config::load("tpdump.yaml")?;
//!     let source = MysqlSource::connect(&config.database).await?;
//!     let mut out = std::io::stdout().lock();
//!     let summary = DumpEngine::new(&source, &config, &mut out).run().await?;
//!     eprintln!("dumped {} rows", summary.rows_written);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dump;
pub mod error;
pub mod filter;
pub mod graph;
pub mod source;

// Re-exports for convenient access
pub use crate::core::value::ScalarValue;
pub use config::{Config, DatabaseConfig, DumpConfig, MatchMode};
pub use dump::{DumpEngine, DumpSummary, TableSummary};
pub use error::{DumpError, Result};
pub use filter::{synthesize, TableFilter};
pub use graph::{DependencyGraph, ForeignKeyRow, Reference, TableNode};
pub use source::memory::MemorySource;
pub use source::mysql::MysqlSource;
pub use source::{RowSource, ScanEvent};
