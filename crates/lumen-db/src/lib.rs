//! Persisted side of the Lumen daylight result store (SQLite via [`sqlx`]).
//!
//! A single database file holds the relational form of the data model --
//! grids, sensors, sources, visibility links, and one result table family
//! per recipe -- plus the machinery around it: a streaming matrix-file
//! parser, a chunked transactional bulk loader, and the read-side query
//! engine that recombines rows under a static or per-hour state
//! selection.
//!
//! ```text
//! renderer matrix files
//!     |
//!     +-- MatrixLoader (chunked transactions, relaxed durability)
//!         |
//!         v
//!     result tables --- finalize (combined recipes) ---> <recipe> table
//!         |
//!         +-- ResultQuery (static aggregation / dynamic streaming fold)
//!             |
//!             v
//!         per-sensor series -> lumen-metrics
//! ```
//!
//! # Modules
//!
//! - [`sqlite`] -- connection pool, configuration, whole-store reset
//! - [`schema`] -- static tables and per-recipe result tables
//! - [`catalog`] -- grid/sensor/source persistence and registry sync
//! - [`matrix`] -- streaming parser for renderer matrix output
//! - [`loader`] -- chunked bulk loads and the combined finalize pass
//! - [`query`] -- static/dynamic recombination queries
//! - [`error`] -- shared error types

pub mod catalog;
pub mod error;
pub mod loader;
pub mod matrix;
pub mod query;
pub mod schema;
pub mod sqlite;

// Re-export primary types for convenience.
pub use catalog::Catalog;
pub use error::DbError;
pub use loader::MatrixLoader;
pub use matrix::{MatrixFile, MatrixHeader};
pub use query::{GroupBy, ResultQuery, SeriesFrame, SeriesGroup};
pub use sqlite::{ResultDb, SqliteConfig};
