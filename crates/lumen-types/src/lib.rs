//! Shared type definitions for the Lumen daylight result store.
//!
//! Every crate in the workspace speaks in terms of these types: strongly
//! typed identifiers, the immutable sensor/grid geometry carriers, the
//! recipe tag that fixes a study's record shape, state-selection vectors
//! for recombining dynamic sources, and the opaque occupancy schedule.
//!
//! # Modules
//!
//! - [`ids`] -- newtype identifier wrappers (`GlobalId`, `SensorId`, ...)
//! - [`grid`] -- immutable [`Sensor`] and [`Grid`] value types
//! - [`recipe`] -- the [`RecipeKind`] study-shape tag
//! - [`selection`] -- [`StateSelection`] and [`HourlySelection`] vectors
//! - [`schedule`] -- the [`OccupancySchedule`] admissible-hour set

pub mod grid;
pub mod ids;
pub mod recipe;
pub mod schedule;
pub mod selection;

// Re-export primary types for convenience.
pub use grid::{Grid, Sensor};
pub use ids::{GlobalId, GridId, SensorId, BASE_BLOCK};
pub use recipe::RecipeKind;
pub use schedule::OccupancySchedule;
pub use selection::{HourlySelection, StateSelection, EXCLUDED};
