//! State-selection vectors for recombining dynamic sources.
//!
//! A [`StateSelection`] names one state per registered source (or excludes
//! the source entirely). Selections are always passed as arguments to the
//! recombination APIs, never stored on the stores themselves, so every
//! caller supplies its own and the engines stay referentially transparent.

use serde::{Deserialize, Serialize};

/// Sentinel state index meaning "exclude this source from the sum".
///
/// Any negative index excludes; `-1` is the conventional spelling.
pub const EXCLUDED: i32 = -1;

/// One state index per registered source, in registry order.
///
/// Index `i` selects a state of source `i`; a negative entry (written as
/// [`EXCLUDED`]) drops the source's contribution entirely. The vector
/// length must equal the number of registered sources -- the consuming
/// engine checks this and fails with a source-count mismatch otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateSelection(pub Vec<i32>);

impl StateSelection {
    /// Selection that picks state 0 ("default") of every source.
    pub fn all_default(source_count: usize) -> Self {
        Self(vec![0; source_count])
    }

    /// Number of entries (must equal the registered source count).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the selection is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The state index selected for source `source_index`, if in range.
    pub fn state_for(&self, source_index: usize) -> Option<i32> {
        self.0.get(source_index).copied()
    }

    /// Iterate `(source_index, state_index)` pairs, skipping excluded
    /// sources. Every negative entry counts as excluded.
    pub fn active(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| u32::try_from(s).ok().map(|s| (i, s)))
    }
}

impl From<Vec<i32>> for StateSelection {
    fn from(states: Vec<i32>) -> Self {
        Self(states)
    }
}

/// A state selection for a whole set of requested hours.
///
/// The query engine dispatches on this: a [`Self::Static`] selection
/// translates to a single aggregation query, while a [`Self::PerHour`]
/// selection forces the row-level streaming reconstruction because the
/// per-hour filters are heterogeneous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HourlySelection {
    /// The same selection applies to every requested hour.
    Static(StateSelection),
    /// One selection per requested hour, aligned with the hour list.
    PerHour(Vec<StateSelection>),
}

impl HourlySelection {
    /// The selection in force for the `position`-th requested hour.
    pub fn for_hour(&self, position: usize) -> Option<&StateSelection> {
        match self {
            Self::Static(sel) => Some(sel),
            Self::PerHour(sels) => sels.get(position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_skips_excluded_sources() {
        let sel = StateSelection(vec![0, EXCLUDED, 2]);
        let active: Vec<(usize, u32)> = sel.active().collect();
        assert_eq!(active, vec![(0, 0), (2, 2)]);
    }

    #[test]
    fn any_negative_entry_excludes() {
        let sel = StateSelection(vec![-5, 1, EXCLUDED]);
        let active: Vec<(usize, u32)> = sel.active().collect();
        assert_eq!(active, vec![(1, 1)]);
    }

    #[test]
    fn all_default_selects_state_zero() {
        let sel = StateSelection::all_default(3);
        assert_eq!(sel.0, vec![0, 0, 0]);
    }

    #[test]
    fn static_selection_covers_every_hour() {
        let sel = HourlySelection::Static(StateSelection(vec![1]));
        assert!(sel.for_hour(0).is_some());
        assert!(sel.for_hour(8759).is_some());
    }

    #[test]
    fn per_hour_selection_is_positional() {
        let sel = HourlySelection::PerHour(vec![
            StateSelection(vec![0]),
            StateSelection(vec![1]),
        ]);
        assert_eq!(sel.for_hour(1), Some(&StateSelection(vec![1])));
        assert_eq!(sel.for_hour(2), None);
    }
}
