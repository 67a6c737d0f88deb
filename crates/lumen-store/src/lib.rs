//! In-memory side of the Lumen daylight result store.
//!
//! Two pieces live here. The [`SourceRegistry`] flattens the two-level
//! (source, state) key into the block-partitioned global-id space shared
//! with the persisted store. The [`SparsePointStore`] is the per-sensor
//! sparse annual store: nested source -> state -> minute-of-year, holding
//! a total and an optional direct-sun illuminance per minute, with the
//! greedy per-hour state search on top.
//!
//! Everything here is synchronous and single-threaded. There is no
//! interior concurrency control: workers wanting parallelism hold one
//! store instance each and merge afterwards.
//!
//! # Modules
//!
//! - [`registry`] -- (source, state) <-> global id bidirectional map
//! - [`point_store`] -- per-sensor sparse annual values
//! - [`search`] -- greedy per-hour state-combination search
//! - [`error`] -- shared error type

pub mod error;
pub mod point_store;
pub mod registry;
pub mod search;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use point_store::{SparsePointStore, ValueSample};
pub use registry::SourceRegistry;
pub use search::SelectedStates;
