//! Bidirectional map between (source, state) pairs and global ids.
//!
//! The global-id space is partitioned into contiguous blocks of
//! [`BASE_BLOCK`] ids. A new source claims the next unused block boundary
//! above the highest id currently in use; each further state of an
//! existing source claims the next sequential id inside that source's
//! block. Id 0 is reserved for `("sky", "default")` and preregistered.
//!
//! Decoding always goes through the stored reverse map. Deriving the pair
//! from `id / BASE_BLOCK` only works while blocks happen to be dense from
//! zero, which this registry does not promise once registration order is
//! interleaved across sources -- so the arithmetic shortcut is never used.

use std::collections::HashMap;

use lumen_types::{GlobalId, BASE_BLOCK};

use crate::error::StoreError;

/// One registered source and its states, in registration order.
#[derive(Debug, Clone)]
struct SourceEntry {
    /// Source name.
    name: String,
    /// State names; index `i` owns global id `block + i`.
    states: Vec<String>,
    /// First id of this source's block.
    block: u64,
}

/// Registry of (source, state) pairs and their global ids.
///
/// Append-only: pairs are never removed. Registration is idempotent --
/// re-registering an existing pair returns its id without allocating.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    /// Sources in registration order; the position here is the source
    /// index that state-selection vectors are aligned with.
    sources: Vec<SourceEntry>,
    /// Source name -> position in `sources`.
    by_name: HashMap<String, usize>,
    /// Global id -> (source position, state position).
    by_id: HashMap<GlobalId, (usize, usize)>,
    /// Highest id allocated so far.
    max_id: u64,
}

impl SourceRegistry {
    /// Create a registry with `("sky", "default")` preregistered as id 0.
    pub fn new() -> Self {
        let mut registry = Self {
            sources: Vec::new(),
            by_name: HashMap::new(),
            by_id: HashMap::new(),
            max_id: 0,
        };
        registry.insert_entry(GlobalId(0), "sky", "default");
        registry
    }

    /// Rebuild a registry from persisted `(id, source, state)` rows.
    ///
    /// Rows may arrive in any order; sources are ordered by their lowest
    /// id and states by ascending id within the source, which reproduces
    /// the original registration order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if the same id appears twice.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (GlobalId, String, String)>,
    ) -> Result<Self, StoreError> {
        let mut rows: Vec<(GlobalId, String, String)> = entries.into_iter().collect();
        rows.sort_by_key(|(id, _, _)| *id);

        let mut registry = Self {
            sources: Vec::new(),
            by_name: HashMap::new(),
            by_id: HashMap::new(),
            max_id: 0,
        };
        for (id, source, state) in rows {
            if registry.by_id.contains_key(&id) {
                return Err(StoreError::DuplicateId(id));
            }
            registry.insert_entry(id, &source, &state);
        }
        if registry.sources.is_empty() {
            registry.insert_entry(GlobalId(0), "sky", "default");
        }
        Ok(registry)
    }

    /// Register a (source, state) pair, allocating an id on first sight.
    ///
    /// Idempotent: an already-registered pair returns its existing id and
    /// does not shift subsequent allocations.
    pub fn register(&mut self, source: &str, state: &str) -> GlobalId {
        if let Some(id) = self.lookup(source, state) {
            return id;
        }
        let id = match self.by_name.get(source).and_then(|&p| self.sources.get(p)) {
            // Existing source: next sequential id inside its block.
            Some(entry) => GlobalId(entry.block.saturating_add(entry.states.len() as u64)),
            // New source: next unused block boundary above all ids in use.
            None => {
                let block = self
                    .max_id
                    .saturating_add(1)
                    .div_ceil(BASE_BLOCK)
                    .saturating_mul(BASE_BLOCK);
                tracing::debug!(source, block, "Allocated source block");
                GlobalId(block)
            }
        };
        self.insert_entry(id, source, state);
        id
    }

    /// Resolve an already-registered pair to its global id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the pair is unregistered.
    pub fn resolve(&self, source: &str, state: &str) -> Result<GlobalId, StoreError> {
        self.lookup(source, state).ok_or_else(|| StoreError::NotFound {
            source_name: source.to_owned(),
            state: state.to_owned(),
        })
    }

    /// Decode a global id back to its `(source, state)` names.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownId`] if the id was never allocated.
    pub fn decode(&self, id: GlobalId) -> Result<(&str, &str), StoreError> {
        let &(source_pos, state_pos) = self.by_id.get(&id).ok_or(StoreError::UnknownId(id))?;
        let entry = self
            .sources
            .get(source_pos)
            .ok_or(StoreError::UnknownId(id))?;
        let state = entry
            .states
            .get(state_pos)
            .ok_or(StoreError::UnknownId(id))?;
        Ok((entry.name.as_str(), state.as_str()))
    }

    /// Number of registered sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Number of registered (source, state) pairs.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the registry holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Source names in registration order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|e| e.name.as_str())
    }

    /// State names of one source in registration order, if it exists.
    pub fn states_of(&self, source: &str) -> Option<impl Iterator<Item = &str>> {
        let &pos = self.by_name.get(source)?;
        let entry = self.sources.get(pos)?;
        Some(entry.states.iter().map(String::as_str))
    }

    /// Global ids selected by a state-selection entry, for source `pos`.
    ///
    /// Returns `None` when the source position or state index is out of
    /// range.
    pub fn id_at(&self, source_pos: usize, state_pos: usize) -> Option<GlobalId> {
        let entry = self.sources.get(source_pos)?;
        entry
            .states
            .get(state_pos)
            .map(|_| GlobalId(entry.block.saturating_add(state_pos as u64)))
    }

    /// Resolve a state selection to the global ids it names.
    ///
    /// The selection holds one state index per source in registration
    /// order; excluded sources (`-1`) contribute no id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SourceCountMismatch`] when the selection
    /// length differs from the source count, and [`StoreError::NotFound`]
    /// for a state index a source does not have.
    pub fn ids_for_selection(
        &self,
        selection: &lumen_types::StateSelection,
    ) -> Result<Vec<GlobalId>, StoreError> {
        if selection.len() != self.sources.len() {
            return Err(StoreError::SourceCountMismatch {
                expected: self.sources.len(),
                got: selection.len(),
            });
        }
        let mut ids = Vec::new();
        for (source_pos, state_pos) in selection.active() {
            let id = self
                .id_at(source_pos, state_pos as usize)
                .ok_or_else(|| StoreError::NotFound {
                    source_name: self
                        .sources
                        .get(source_pos)
                        .map_or_else(|| format!("#{source_pos}"), |e| e.name.clone()),
                    state: format!("#{state_pos}"),
                })?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Iterate every registered `(id, source, state)` triple, sources in
    /// registration order and states ascending within each source.
    pub fn entries(&self) -> impl Iterator<Item = (GlobalId, &str, &str)> {
        self.sources.iter().flat_map(|entry| {
            entry.states.iter().enumerate().map(|(i, state)| {
                (
                    GlobalId(entry.block.saturating_add(i as u64)),
                    entry.name.as_str(),
                    state.as_str(),
                )
            })
        })
    }

    fn lookup(&self, source: &str, state: &str) -> Option<GlobalId> {
        let &pos = self.by_name.get(source)?;
        let entry = self.sources.get(pos)?;
        let state_pos = entry.states.iter().position(|s| s == state)?;
        Some(GlobalId(entry.block.saturating_add(state_pos as u64)))
    }

    /// Insert a pair under a known id, updating all three indexes.
    fn insert_entry(&mut self, id: GlobalId, source: &str, state: &str) {
        let raw = id.into_inner();
        let source_pos = match self.by_name.get(source) {
            Some(&pos) => pos,
            None => {
                let pos = self.sources.len();
                self.sources.push(SourceEntry {
                    name: source.to_owned(),
                    states: Vec::new(),
                    // A source's block is the id of its first state.
                    block: raw,
                });
                self.by_name.insert(source.to_owned(), pos);
                pos
            }
        };
        if let Some(entry) = self.sources.get_mut(source_pos) {
            let state_pos = entry.states.len();
            entry.states.push(state.to_owned());
            self.by_id.insert(id, (source_pos, state_pos));
        }
        self.max_id = self.max_id.max(raw);
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sky_default_is_id_zero() {
        let mut registry = SourceRegistry::new();
        assert_eq!(registry.register("sky", "default"), GlobalId(0));
    }

    #[test]
    fn block_allocation_example() {
        let mut registry = SourceRegistry::new();
        assert_eq!(registry.register("sky", "default"), GlobalId(0));
        assert_eq!(registry.register("north", "default"), GlobalId(1_000_000));
        assert_eq!(registry.register("north", "tinted"), GlobalId(1_000_001));
        assert_eq!(registry.register("south", "default"), GlobalId(2_000_000));
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = SourceRegistry::new();
        let first = registry.register("north", "default");
        let second = registry.register("north", "default");
        assert_eq!(first, second);
        // Idempotent re-registration must not shift later allocations.
        assert_eq!(registry.register("north", "tinted"), GlobalId(1_000_001));
    }

    #[test]
    fn decode_inverts_register_for_every_pair() {
        let mut registry = SourceRegistry::new();
        let pairs = [
            ("sky", "default"),
            ("north", "default"),
            ("north", "tinted"),
            ("south", "default"),
            ("north", "closed"),
        ];
        for (source, state) in pairs {
            let id = registry.register(source, state);
            assert_eq!(registry.decode(id).ok(), Some((source, state)));
        }
        // Injectivity: five distinct pairs, five distinct ids.
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn late_states_stay_inside_their_source_block() {
        // Interleaved registration across sources: a state added after a
        // later source exists still lands in its own source's block.
        let mut registry = SourceRegistry::new();
        registry.register("north", "default");
        registry.register("south", "default");
        let late = registry.register("north", "open");
        assert_eq!(late, GlobalId(1_000_001));
        assert_eq!(registry.decode(late).ok(), Some(("north", "open")));
        // The next new source skips past every id in use.
        assert_eq!(registry.register("west", "default"), GlobalId(3_000_000));
    }

    #[test]
    fn resolve_unknown_pair_fails() {
        let registry = SourceRegistry::new();
        assert!(matches!(
            registry.resolve("west", "default"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn rebuild_from_rows_preserves_allocation_state() {
        let mut registry = SourceRegistry::new();
        registry.register("north", "default");
        registry.register("north", "tinted");
        let rows: Vec<(GlobalId, String, String)> = registry
            .entries()
            .map(|(id, s, st)| (id, s.to_owned(), st.to_owned()))
            .collect();

        let mut rebuilt = SourceRegistry::from_entries(rows).unwrap_or_default();
        assert_eq!(rebuilt.len(), 3);
        // Allocation continues where the persisted rows left off.
        assert_eq!(rebuilt.register("south", "default"), GlobalId(2_000_000));
    }

    #[test]
    fn selection_resolves_to_global_ids() {
        use lumen_types::StateSelection;

        let mut registry = SourceRegistry::new();
        registry.register("north", "default");
        registry.register("north", "tinted");
        registry.register("south", "default");
        // sky default, north tinted, south excluded.
        let ids = registry.ids_for_selection(&StateSelection(vec![0, 1, -1]));
        assert_eq!(ids.ok(), Some(vec![GlobalId(0), GlobalId(1_000_001)]));

        assert!(matches!(
            registry.ids_for_selection(&StateSelection(vec![0])),
            Err(StoreError::SourceCountMismatch { expected: 3, got: 1 })
        ));
        assert!(matches!(
            registry.ids_for_selection(&StateSelection(vec![0, 5, 0])),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn rebuild_rejects_duplicate_ids() {
        let rows = vec![
            (GlobalId(0), "sky".to_owned(), "default".to_owned()),
            (GlobalId(0), "sky".to_owned(), "other".to_owned()),
        ];
        assert!(matches!(
            SourceRegistry::from_entries(rows),
            Err(StoreError::DuplicateId(GlobalId(0)))
        ));
    }
}
