//! The recipe tag that fixes a study's result-record shape.

use serde::{Deserialize, Serialize};

/// Study-type tag determining the shape of persisted result records.
///
/// Set once when a result store is created and immutable afterwards: the
/// loader and query engine both derive their table layout from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeKind {
    /// One scalar per (sensor, source), no time axis.
    PointInTime,
    /// One scalar per (sensor, source, minute-of-year).
    TimeSeries,
    /// Three component scalars (sky-total, sky-direct, sun) per
    /// (sensor, source, minute-of-year), finalized into a derived total
    /// `sky_total - sky_direct + sun`.
    TimeSeriesCombined,
}

impl RecipeKind {
    /// Whether records of this shape carry a minute-of-year column.
    pub const fn has_time_axis(self) -> bool {
        matches!(self, Self::TimeSeries | Self::TimeSeriesCombined)
    }

    /// Whether this shape stores separate component tables that must be
    /// finalized into a derived total.
    pub const fn is_combined(self) -> bool {
        matches!(self, Self::TimeSeriesCombined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_predicates() {
        assert!(!RecipeKind::PointInTime.has_time_axis());
        assert!(RecipeKind::TimeSeries.has_time_axis());
        assert!(RecipeKind::TimeSeriesCombined.is_combined());
        assert!(!RecipeKind::TimeSeries.is_combined());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&RecipeKind::TimeSeriesCombined).unwrap_or_default();
        assert_eq!(json, "\"time_series_combined\"");
    }
}
