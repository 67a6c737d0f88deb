//! Greedy per-hour state-combination search.
//!
//! Given an ordered list of candidate state combinations -- by convention
//! most daylight-admitting first, most blocking last -- the search picks,
//! independently for every hour, the first combination the caller's
//! rejection predicate accepts. Hours where every candidate is rejected
//! fall back to the last (most blocking) combination and are flagged low
//! confidence.
//!
//! The search is greedy and stable: candidates are tried strictly in the
//! order given, hours never influence each other, and there is no
//! backtracking or global optimization across the year.

use lumen_types::{HourlySelection, StateSelection};

use crate::error::StoreError;
use crate::point_store::SparsePointStore;

/// Minutes per hour-of-year step; recorded minutes sit on hour boundaries.
const MINUTES_PER_HOUR: u32 = 60;

/// Outcome of a state search: one chosen combination per requested hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedStates {
    /// The requested hours, in the order given.
    pub hoys: Vec<u32>,
    /// The chosen combination for each hour, aligned with `hoys`.
    pub per_hour: Vec<StateSelection>,
    /// Hours where no candidate passed and the last one was used instead.
    pub low_confidence: Vec<u32>,
}

impl SelectedStates {
    /// View the result as a per-hour selection for the query engine.
    pub fn hourly(&self) -> HourlySelection {
        HourlySelection::PerHour(self.per_hour.clone())
    }

    /// Whether any hour fell back to the last candidate.
    pub fn has_low_confidence(&self) -> bool {
        !self.low_confidence.is_empty()
    }
}

impl SparsePointStore {
    /// Choose one state combination per hour with a greedy search.
    ///
    /// `predicate(total, direct, hoy)` returns `true` to *reject* a
    /// combination (typically "too bright"); the first non-rejected
    /// candidate wins the hour. When every candidate is rejected the last
    /// one in the list is chosen and the hour is flagged low confidence.
    ///
    /// Hours are converted to minutes at hour boundaries
    /// (`moy = hoy * 60`), matching how annual results are recorded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoCandidates`] for an empty candidate list,
    /// and propagates [`StoreError::SourceCountMismatch`] /
    /// [`StoreError::MissingValue`] from evaluating a candidate.
    pub fn select_states<F>(
        &self,
        hoys: &[u32],
        candidates: &[StateSelection],
        mut predicate: F,
    ) -> Result<SelectedStates, StoreError>
    where
        F: FnMut(f64, Option<f64>, u32) -> bool,
    {
        let fallback = candidates.last().ok_or(StoreError::NoCandidates)?;

        let mut per_hour = Vec::with_capacity(hoys.len());
        let mut low_confidence = Vec::new();
        for &hoy in hoys {
            let moy = hoy.saturating_mul(MINUTES_PER_HOUR);
            let mut chosen = None;
            for candidate in candidates {
                let sample = self.combined_sum(moy, candidate)?;
                if !predicate(sample.total, sample.direct, hoy) {
                    chosen = Some(candidate);
                    break;
                }
            }
            match chosen {
                Some(candidate) => per_hour.push(candidate.clone()),
                None => {
                    per_hour.push(fallback.clone());
                    low_confidence.push(hoy);
                }
            }
        }

        if !low_confidence.is_empty() {
            tracing::debug!(
                hours = low_confidence.len(),
                "State search fell back to the most blocking candidate"
            );
        }
        Ok(SelectedStates {
            hoys: hoys.to_vec(),
            per_hour,
            low_confidence,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    /// Two sources, the second with an open and a blinds state.
    fn store() -> SparsePointStore {
        let mut store = SparsePointStore::new();
        for hoy in [8u32, 9, 10] {
            let moy = hoy * 60;
            store.set("sky", "default", moy, 200.0, Some(20.0));
            store.set("window", "open", moy, f64::from(hoy) * 350.0, Some(50.0));
            store.set("window", "blinds", moy, 50.0, Some(0.0));
        }
        store
    }

    /// Candidates ordered most admitting -> most blocking.
    fn candidates() -> Vec<StateSelection> {
        vec![StateSelection(vec![0, 0]), StateSelection(vec![0, 1])]
    }

    #[test]
    fn picks_first_candidate_the_predicate_accepts() {
        let store = store();
        // Reject anything over 3000 lux: hour 8 passes open (3000 exactly),
        // hours 9 and 10 need blinds.
        let result = store
            .select_states(&[8, 9, 10], &candidates(), |total, _, _| total > 3000.0)
            .expect("search");
        assert_eq!(
            result.per_hour,
            vec![
                StateSelection(vec![0, 0]),
                StateSelection(vec![0, 1]),
                StateSelection(vec![0, 1]),
            ]
        );
        assert!(result.low_confidence.is_empty());
    }

    #[test]
    fn falls_back_to_last_candidate_and_flags_the_hour() {
        let store = store();
        // Reject everything: every hour falls back to blinds.
        let selected = store
            .select_states(&[8, 9], &candidates(), |_, _, _| true)
            .expect("search");
        assert_eq!(
            selected.per_hour,
            vec![StateSelection(vec![0, 1]), StateSelection(vec![0, 1])]
        );
        assert_eq!(selected.low_confidence, vec![8, 9]);
        assert!(selected.has_low_confidence());
    }

    #[test]
    fn candidates_are_tried_in_the_order_given() {
        let store = store();
        let mut seen = Vec::new();
        store
            .select_states(&[8], &candidates(), |total, _, _| {
                seen.push(total);
                true
            })
            .ok();
        // Open first (200 + 2800), blinds second (200 + 50).
        assert_eq!(seen, vec![3000.0, 250.0]);
    }

    #[test]
    fn empty_candidate_list_is_rejected() {
        let store = store();
        assert!(matches!(
            store.select_states(&[8], &[], |_, _, _| false),
            Err(StoreError::NoCandidates)
        ));
    }

    #[test]
    fn evaluation_errors_propagate() {
        let store = store();
        // Hour 11 was never recorded.
        assert!(matches!(
            store.select_states(&[11], &candidates(), |_, _, _| false),
            Err(StoreError::MissingValue { .. })
        ));
    }
}
