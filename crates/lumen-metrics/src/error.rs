//! Error types for the metrics layer.

/// Errors that can occur when computing an annual metric.
#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    /// The occupancy schedule admits no hour present in the series.
    #[error("no occupied hours to evaluate")]
    EmptySchedule,

    /// A direct-sun metric was requested but the study never recorded
    /// direct values.
    #[error("the recipe recorded no direct-sun values")]
    DirectUnavailable,
}
