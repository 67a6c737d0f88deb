//! The occupancy schedule consumed by the metric functions.
//!
//! Schedules are produced elsewhere (typically from a building's operating
//! profile); this core only ever asks "is hour H admissible". The set is
//! therefore opaque: construction takes any iterator of hour-of-year
//! indices and membership is the whole interface.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The set of occupied (admissible) hours of the year.
///
/// Hours are 0-based hour-of-year indices (`0..8760` for a non-leap year,
/// though nothing here assumes a particular year length).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySchedule {
    hours: BTreeSet<u32>,
}

impl OccupancySchedule {
    /// Build a schedule from any collection of hour-of-year indices.
    pub fn new(hours: impl IntoIterator<Item = u32>) -> Self {
        Self {
            hours: hours.into_iter().collect(),
        }
    }

    /// Whether hour `hoy` is occupied.
    pub fn contains(&self, hoy: u32) -> bool {
        self.hours.contains(&hoy)
    }

    /// Number of occupied hours.
    pub fn len(&self) -> usize {
        self.hours.len()
    }

    /// Whether the schedule has no occupied hours.
    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    /// Iterate occupied hours in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.hours.iter().copied()
    }
}

impl FromIterator<u32> for OccupancySchedule {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Self::new(iter)
    }
}
