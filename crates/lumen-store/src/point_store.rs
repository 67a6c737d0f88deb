//! Per-sensor sparse annual store.
//!
//! One [`SparsePointStore`] holds the annual results of a single sensor,
//! nested source -> state -> minute-of-year. Each minute carries a total
//! illuminance and, when the study recorded it, a direct-sun-only
//! component. Minutes with no recorded entry simply do not exist -- the
//! store is sparse, and reading an absent minute is an error rather than
//! an implicit zero.
//!
//! Source and state bookkeeping is created lazily on first `set`, in
//! first-seen order; that order is the one state-selection vectors are
//! aligned with.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use lumen_types::StateSelection;

use crate::error::StoreError;

/// One recorded minute: total illuminance plus optional direct-sun part.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueSample {
    /// Total illuminance (lux).
    pub total: f64,
    /// Direct-sun-only illuminance (lux), when the study recorded it.
    pub direct: Option<f64>,
}

/// Sparse annual store for a single sensor.
///
/// No interior concurrency control -- single-threaded use only, one store
/// instance per worker when parallelizing across sensors.
#[derive(Debug, Clone, Default)]
pub struct SparsePointStore {
    /// Source names in first-seen (selection-vector) order.
    sources: Vec<String>,
    /// Per source, its state names in first-seen order.
    states: HashMap<String, Vec<String>>,
    /// source -> state -> minute-of-year -> sample.
    values: HashMap<String, HashMap<String, BTreeMap<u32, ValueSample>>>,
    /// Whether any source ever recorded a direct component.
    has_direct: bool,
}

impl SparsePointStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one minute, overwriting any existing entry.
    ///
    /// Creates the source/state bookkeeping on first use.
    pub fn set(&mut self, source: &str, state: &str, moy: u32, total: f64, direct: Option<f64>) {
        if direct.is_some() {
            self.has_direct = true;
        }
        self.minutes_mut(source, state)
            .insert(moy, ValueSample { total, direct });
    }

    /// Record many minutes for one (source, state) pair at once.
    ///
    /// With `direct` false the values land in the total component; with
    /// `direct` true they land in the direct component, creating entries
    /// with a zero total where the minute was not yet recorded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LengthMismatch`] when `values` and `moys`
    /// differ in length.
    pub fn set_many(
        &mut self,
        source: &str,
        state: &str,
        moys: &[u32],
        values: &[f64],
        direct: bool,
    ) -> Result<(), StoreError> {
        if values.len() != moys.len() {
            return Err(StoreError::LengthMismatch {
                values: values.len(),
                moys: moys.len(),
            });
        }
        if direct {
            self.has_direct = true;
        }
        let minutes = self.minutes_mut(source, state);
        for (&moy, &value) in moys.iter().zip(values) {
            let sample = minutes.entry(moy).or_default();
            if direct {
                sample.direct = Some(value);
            } else {
                sample.total = value;
            }
        }
        Ok(())
    }

    /// Total illuminance at one minute for one (source, state) pair.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown pair and
    /// [`StoreError::MissingValue`] for an unrecorded minute.
    pub fn value(&self, moy: u32, source: &str, state: &str) -> Result<f64, StoreError> {
        self.combined(moy, source, state).map(|sample| sample.total)
    }

    /// Total and direct components at one minute for one pair.
    ///
    /// # Errors
    ///
    /// Same as [`Self::value`].
    pub fn combined(&self, moy: u32, source: &str, state: &str) -> Result<ValueSample, StoreError> {
        let minutes = self.minutes(source, state)?;
        minutes
            .get(&moy)
            .copied()
            .ok_or_else(|| StoreError::MissingValue {
                moy,
                source_name: source.to_owned(),
                state: state.to_owned(),
            })
    }

    /// Sum the selected states' values across sources at one minute.
    ///
    /// `selection` holds one state index per source in first-seen order;
    /// `-1` excludes a source, contributing zero. The direct component of
    /// the result is `Some` whenever any source ever recorded direct
    /// values, with unrecorded directs contributing zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SourceCountMismatch`] when the selection
    /// length differs from the source count, [`StoreError::NotFound`] for
    /// a state index out of range, and [`StoreError::MissingValue`] when a
    /// selected pair has no entry at `moy`.
    pub fn combined_sum(
        &self,
        moy: u32,
        selection: &StateSelection,
    ) -> Result<ValueSample, StoreError> {
        if selection.len() != self.sources.len() {
            return Err(StoreError::SourceCountMismatch {
                expected: self.sources.len(),
                got: selection.len(),
            });
        }
        let mut total = 0.0;
        let mut direct = 0.0;
        for (source_pos, state_pos) in selection.active() {
            let source = self.sources.get(source_pos).map(String::as_str).ok_or(
                StoreError::SourceCountMismatch {
                    expected: self.sources.len(),
                    got: selection.len(),
                },
            )?;
            let state = self
                .states
                .get(source)
                .and_then(|names| names.get(state_pos as usize))
                .ok_or_else(|| StoreError::NotFound {
                    source_name: source.to_owned(),
                    state: format!("#{state_pos}"),
                })?;
            let sample = self.combined(moy, source, state)?;
            total += sample.total;
            direct += sample.direct.unwrap_or(0.0);
        }
        Ok(ValueSample {
            total,
            direct: self.has_direct.then_some(direct),
        })
    }

    /// Source names in first-seen (selection-vector) order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(String::as_str)
    }

    /// Number of sources seen so far.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Whether any source ever recorded a direct component.
    pub const fn has_direct(&self) -> bool {
        self.has_direct
    }

    /// State names of one source in first-seen order, if known.
    pub fn states_of(&self, source: &str) -> Option<impl Iterator<Item = &str>> {
        self.states
            .get(source)
            .map(|names| names.iter().map(String::as_str))
    }

    /// Recorded minutes for one (source, state) pair, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown pair.
    pub fn moys_for(
        &self,
        source: &str,
        state: &str,
    ) -> Result<impl Iterator<Item = u32> + '_, StoreError> {
        let minutes = self.minutes(source, state)?;
        Ok(minutes.keys().copied())
    }

    fn minutes(&self, source: &str, state: &str) -> Result<&BTreeMap<u32, ValueSample>, StoreError> {
        self.values
            .get(source)
            .and_then(|by_state| by_state.get(state))
            .ok_or_else(|| StoreError::NotFound {
                source_name: source.to_owned(),
                state: state.to_owned(),
            })
    }

    /// Fetch the minute map for a pair, creating the bookkeeping on first
    /// sight of the source or state.
    fn minutes_mut(&mut self, source: &str, state: &str) -> &mut BTreeMap<u32, ValueSample> {
        if !self.values.contains_key(source) {
            self.sources.push(source.to_owned());
        }
        let order = self.states.entry(source.to_owned()).or_default();
        if !order.iter().any(|name| name == state) {
            order.push(state.to_owned());
        }
        self.values
            .entry(source.to_owned())
            .or_default()
            .entry(state.to_owned())
            .or_default()
    }
}
