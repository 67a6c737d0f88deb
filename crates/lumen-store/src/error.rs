//! Error types for the in-memory store.
//!
//! All errors here are recoverable by the caller and carry enough context
//! to name the offending lookup or length. Nothing is silently swallowed.

use lumen_types::GlobalId;

/// Errors that can occur in the registry or the sparse point store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A source, state, or (source, state) pair is not registered.
    ///
    /// The field is `source_name`, not `source`, matching the persisted
    /// schema's column and keeping it out of thiserror's implicit
    /// `source()` cause slot.
    #[error("unknown source/state: {source_name}:{state}")]
    NotFound {
        /// Source name as supplied by the caller.
        source_name: String,
        /// State name as supplied by the caller.
        state: String,
    },

    /// A global id has no entry in the reverse map.
    #[error("global id {0} is not registered")]
    UnknownId(GlobalId),

    /// A global id was supplied twice when rebuilding a registry.
    #[error("global id {0} registered twice")]
    DuplicateId(GlobalId),

    /// Two caller-supplied collections disagree in length.
    #[error("length mismatch: {values} values vs {moys} minutes")]
    LengthMismatch {
        /// Length of the value collection.
        values: usize,
        /// Length of the minute-of-year collection.
        moys: usize,
    },

    /// A state-selection vector's length does not equal the source count.
    #[error("selection names {got} sources but the store has {expected}")]
    SourceCountMismatch {
        /// Registered source count.
        expected: usize,
        /// Length of the supplied selection.
        got: usize,
    },

    /// No value was recorded at the requested minute for the pair.
    #[error("no value at minute {moy} for {source_name}:{state}")]
    MissingValue {
        /// Minute-of-year that was queried.
        moy: u32,
        /// Source name.
        source_name: String,
        /// State name.
        state: String,
    },

    /// A state search was asked to choose among zero candidates.
    #[error("state search needs at least one candidate combination")]
    NoCandidates,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_errors_render_the_pair() {
        let err = StoreError::NotFound {
            source_name: "north".to_owned(),
            state: "tinted".to_owned(),
        };
        assert_eq!(err.to_string(), "unknown source/state: north:tinted");

        let err = StoreError::MissingValue {
            moy: 480,
            source_name: "sky".to_owned(),
            state: "default".to_owned(),
        };
        assert_eq!(err.to_string(), "no value at minute 480 for sky:default");
    }

    #[test]
    fn lookup_errors_carry_no_cause() {
        // The source name is plain context; neither variant wraps an
        // underlying error.
        let err = StoreError::NotFound {
            source_name: "north".to_owned(),
            state: "tinted".to_owned(),
        };
        assert!(std::error::Error::source(&err).is_none());
    }
}
