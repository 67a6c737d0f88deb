//! Annual daylighting metrics.
//!
//! Pure, stateless functions over a recombined per-sensor illuminance
//! series plus an externally supplied [`lumen_types::OccupancySchedule`].
//! Nothing here decides what "useful" daylight is -- thresholds and bands
//! are caller-supplied parameters, and the functions only count, bucket,
//! and normalize.
//!
//! A series is a slice of `(hour_of_year, lux)` pairs, typically produced
//! by the query engine's per-sensor ordering. Hours outside the schedule
//! are excluded from every metric, never zero-filled.
//!
//! # Modules
//!
//! - [`annual`] -- daylight autonomy, UDI buckets, annual sunlight exposure
//! - [`series`] -- cumulative/average/peak/minimum helpers
//! - [`error`] -- shared error type

pub mod annual;
pub mod error;
pub mod series;

// Re-export primary types for convenience.
pub use annual::{
    annual_sunlight_exposure, daylight_autonomy, useful_daylight_illuminance, Autonomy,
    SunExposure, Udi,
};
pub use error::MetricError;
pub use series::{average, cumulative, minimum, peak};
