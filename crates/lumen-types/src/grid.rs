//! Immutable sensor and grid value types.
//!
//! A [`Grid`] is created once per analysis by the geometry/grid builder
//! (out of scope here) and owns its [`Sensor`]s for its whole lifetime.
//! Sensors are never mutated and never deleted individually; the only
//! destructive operation the store supports is a whole-store reset.

use serde::{Deserialize, Serialize};

use crate::ids::{GridId, SensorId};

/// A single measurement point: an immutable 3D location plus direction.
///
/// Sensors are identified by their 0-based index within the owning grid,
/// which is also their row index in every matrix file produced for that
/// grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    /// Position of the sensor in model units.
    pub location: [f64; 3],
    /// Direction the sensor faces (typically the surface normal).
    pub direction: [f64; 3],
}

impl Sensor {
    /// Create a sensor from a location and a direction.
    pub const fn new(location: [f64; 3], direction: [f64; 3]) -> Self {
        Self {
            location,
            direction,
        }
    }
}

/// A named, fixed-size collection of sensors.
///
/// Immutable after creation: the sensor count is fixed, sensors are owned
/// by exactly one grid, and grids are append-only at the store level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Store-unique grid identifier.
    pub id: GridId,
    /// Human-readable grid name (e.g. "ground_floor_office").
    pub name: String,
    /// The sensors, in matrix row order.
    sensors: Vec<Sensor>,
}

impl Grid {
    /// Create a grid from a name and its full sensor list.
    pub fn new(id: GridId, name: impl Into<String>, sensors: Vec<Sensor>) -> Self {
        Self {
            id,
            name: name.into(),
            sensors,
        }
    }

    /// Number of sensors in the grid.
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Whether the grid holds no sensors.
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Look up a sensor by its in-grid index.
    pub fn sensor(&self, id: SensorId) -> Option<&Sensor> {
        self.sensors.get(id.into_inner() as usize)
    }

    /// Iterate `(SensorId, &Sensor)` pairs in row order.
    pub fn sensors(&self) -> impl Iterator<Item = (SensorId, &Sensor)> {
        self.sensors
            .iter()
            .enumerate()
            .map(|(i, s)| (SensorId(u32::try_from(i).unwrap_or(u32::MAX)), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_grid() -> Grid {
        let sensors = vec![
            Sensor::new([0.0, 0.0, 0.8], [0.0, 0.0, 1.0]),
            Sensor::new([1.0, 0.0, 0.8], [0.0, 0.0, 1.0]),
        ];
        Grid::new(GridId(0), "office", sensors)
    }

    #[test]
    fn sensor_lookup_by_index() {
        let grid = make_grid();
        assert_eq!(grid.sensor_count(), 2);
        let second = grid.sensor(SensorId(1));
        assert!(second.is_some());
        assert!(grid.sensor(SensorId(2)).is_none());
    }

    #[test]
    fn sensors_iterate_in_row_order() {
        let grid = make_grid();
        let ids: Vec<SensorId> = grid.sensors().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![SensorId(0), SensorId(1)]);
    }
}
