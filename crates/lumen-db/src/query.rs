//! Read-side query engine: recombine persisted rows into per-sensor (or
//! per-hour) illuminance series.
//!
//! Two execution paths, picked from the shape of the caller's selection:
//!
//! - **Static** (one selection for every hour): a single aggregation
//!   query -- `SUM(value)` per (sensor, minute) across the selected
//!   global ids, grouped and ordered on the database side.
//! - **Dynamic** (selection varies by hour): heterogeneous per-hour
//!   filters cannot be one `IN` list, so the engine streams *all* rows
//!   for the requested grid/hours once, expands each hour's selection
//!   into a membership test per source id, and folds `value` into an
//!   accumulator keyed by (sensor, hour). One sequential scan instead of
//!   one query per hour.
//!
//! Both paths produce identical frames for a selection that happens to be
//! uniform across hours.

use std::collections::{BTreeMap, HashMap, HashSet};

use futures::TryStreamExt;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use lumen_store::SourceRegistry;
use lumen_types::{GridId, HourlySelection, StateSelection};

use crate::error::DbError;
use crate::schema;

/// Minutes per hour-of-year step; persisted rows sit on hour boundaries.
const MINUTES_PER_HOUR: u32 = 60;

/// Major grouping of a series frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    /// Sensor-major: one group per sensor, `(hoy, value)` entries.
    /// The shape annual metrics consume.
    Sensor,
    /// Hour-major: one group per hour, `(sensor, value)` entries.
    /// The shape whole-grid-at-one-hour views consume.
    Hour,
}

/// One group of a frame: a major key and its ordered series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesGroup {
    /// Sensor id or hour-of-year, per the frame's grouping.
    pub key: u32,
    /// `(minor key, value)` pairs, ascending by minor key.
    pub series: Vec<(u32, f64)>,
}

/// A recombined result set.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFrame {
    /// How the groups are keyed.
    pub group_by: GroupBy,
    /// Groups in ascending major-key order.
    pub groups: Vec<SeriesGroup>,
}

impl SeriesFrame {
    /// Per-group sum of values.
    pub fn cumulative(&self) -> Vec<(u32, f64)> {
        self.fold(|series| series.iter().map(|&(_, v)| v).sum())
    }

    /// Per-group maximum value (0 for an empty group).
    pub fn peak(&self) -> Vec<(u32, f64)> {
        self.fold(|series| {
            series
                .iter()
                .map(|&(_, v)| v)
                .reduce(f64::max)
                .unwrap_or(0.0)
        })
    }

    /// Per-group minimum value (0 for an empty group).
    pub fn minimum(&self) -> Vec<(u32, f64)> {
        self.fold(|series| {
            series
                .iter()
                .map(|&(_, v)| v)
                .reduce(f64::min)
                .unwrap_or(0.0)
        })
    }

    fn fold(&self, f: impl Fn(&[(u32, f64)]) -> f64) -> Vec<(u32, f64)> {
        self.groups
            .iter()
            .map(|group| (group.key, f(&group.series)))
            .collect()
    }
}

/// Query engine over one result table.
///
/// The table is either a recipe's finalized table or, for direct-sun
/// metrics on combined recipes, one of its component tables (e.g. the
/// recipe's `_sun` table).
pub struct ResultQuery<'a> {
    pool: &'a SqlitePool,
    table: String,
}

impl<'a> ResultQuery<'a> {
    /// Create a query engine over `table`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidName`] for an unsafe table name.
    pub fn new(pool: &'a SqlitePool, table: impl Into<String>) -> Result<Self, DbError> {
        let table = table.into();
        schema::ensure_identifier(&table)?;
        Ok(Self { pool, table })
    }

    /// Recombine values for the requested grid and hours.
    ///
    /// Dispatches to the static aggregation query or the dynamic
    /// streaming fold based on the selection shape.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::HourCountMismatch`] when a per-hour selection
    /// does not cover `hoys`, [`DbError::Store`] for a selection that
    /// does not match the registry, and [`DbError::Sqlite`] for query
    /// failures.
    pub async fn values(
        &self,
        registry: &SourceRegistry,
        grid: GridId,
        hoys: &[u32],
        selection: &HourlySelection,
        group_by: GroupBy,
    ) -> Result<SeriesFrame, DbError> {
        match selection {
            HourlySelection::Static(sel) => self.values_static(registry, grid, hoys, sel, group_by).await,
            HourlySelection::PerHour(sels) => {
                if sels.len() != hoys.len() {
                    return Err(DbError::HourCountMismatch {
                        expected: hoys.len(),
                        got: sels.len(),
                    });
                }
                self.values_dynamic(registry, grid, hoys, sels, group_by).await
            }
        }
    }

    /// Per-group cumulative sums of [`Self::values`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::values`].
    pub async fn values_cumulative(
        &self,
        registry: &SourceRegistry,
        grid: GridId,
        hoys: &[u32],
        selection: &HourlySelection,
        group_by: GroupBy,
    ) -> Result<Vec<(u32, f64)>, DbError> {
        Ok(self
            .values(registry, grid, hoys, selection, group_by)
            .await?
            .cumulative())
    }

    /// Per-group maxima of [`Self::values`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::values`].
    pub async fn values_max(
        &self,
        registry: &SourceRegistry,
        grid: GridId,
        hoys: &[u32],
        selection: &HourlySelection,
        group_by: GroupBy,
    ) -> Result<Vec<(u32, f64)>, DbError> {
        Ok(self
            .values(registry, grid, hoys, selection, group_by)
            .await?
            .peak())
    }

    /// Per-group minima of [`Self::values`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::values`].
    pub async fn values_min(
        &self,
        registry: &SourceRegistry,
        grid: GridId,
        hoys: &[u32],
        selection: &HourlySelection,
        group_by: GroupBy,
    ) -> Result<Vec<(u32, f64)>, DbError> {
        Ok(self
            .values(registry, grid, hoys, selection, group_by)
            .await?
            .minimum())
    }

    /// Recombine a point-in-time table: one summed value per sensor.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Store`] for a selection that does not match the
    /// registry and [`DbError::Sqlite`] for query failures.
    pub async fn point_values(
        &self,
        registry: &SourceRegistry,
        grid: GridId,
        selection: &StateSelection,
    ) -> Result<Vec<(u32, f64)>, DbError> {
        let ids = registry.ids_for_selection(selection)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT sensor_id, SUM(value) FROM \"{}\" WHERE grid_id = ",
            self.table
        ));
        qb.push_bind(i64::from(grid.into_inner()));
        qb.push(" AND source_id IN (");
        push_id_list(&mut qb, &ids);
        qb.push(") GROUP BY sensor_id ORDER BY sensor_id");

        let rows: Vec<(i64, f64)> = qb.build_query_as().fetch_all(self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(sensor, value)| (u32::try_from(sensor).unwrap_or(u32::MAX), value))
            .collect())
    }

    /// Static path: one aggregation query, grouped in SQL.
    async fn values_static(
        &self,
        registry: &SourceRegistry,
        grid: GridId,
        hoys: &[u32],
        selection: &StateSelection,
        group_by: GroupBy,
    ) -> Result<SeriesFrame, DbError> {
        let ids = registry.ids_for_selection(selection)?;
        if ids.is_empty() || hoys.is_empty() {
            return Ok(SeriesFrame {
                group_by,
                groups: Vec::new(),
            });
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT sensor_id, moy, SUM(value) FROM \"{}\" WHERE grid_id = ",
            self.table
        ));
        qb.push_bind(i64::from(grid.into_inner()));
        qb.push(" AND source_id IN (");
        push_id_list(&mut qb, &ids);
        qb.push(") AND moy IN (");
        {
            let mut sep = qb.separated(", ");
            for &hoy in hoys {
                sep.push_bind(i64::from(hoy.saturating_mul(MINUTES_PER_HOUR)));
            }
        }
        qb.push(") GROUP BY sensor_id, moy ORDER BY ");
        qb.push(match group_by {
            GroupBy::Sensor => "sensor_id, moy",
            GroupBy::Hour => "moy, sensor_id",
        });

        let rows: Vec<(i64, i64, f64)> = qb.build_query_as().fetch_all(self.pool).await?;
        let keyed = rows.into_iter().map(|(sensor, moy, value)| {
            let sensor = u32::try_from(sensor).unwrap_or(u32::MAX);
            let hoy = moy_to_hoy(moy);
            match group_by {
                GroupBy::Sensor => (sensor, hoy, value),
                GroupBy::Hour => (hoy, sensor, value),
            }
        });
        Ok(assemble(keyed, group_by))
    }

    /// Dynamic path: stream every candidate row once and fold it against
    /// an exploded 0/1 membership per (hour, source id).
    async fn values_dynamic(
        &self,
        registry: &SourceRegistry,
        grid: GridId,
        hoys: &[u32],
        selections: &[StateSelection],
        group_by: GroupBy,
    ) -> Result<SeriesFrame, DbError> {
        if hoys.is_empty() {
            return Ok(SeriesFrame {
                group_by,
                groups: Vec::new(),
            });
        }

        // Selected global ids per requested hour, keyed by minute.
        let mut selected: HashMap<i64, HashSet<i64>> = HashMap::with_capacity(hoys.len());
        for (&hoy, sel) in hoys.iter().zip(selections) {
            let ids = registry.ids_for_selection(sel)?;
            let moy = i64::from(hoy.saturating_mul(MINUTES_PER_HOUR));
            selected.insert(
                moy,
                ids.iter()
                    .map(|id| i64::try_from(id.into_inner()).unwrap_or(i64::MAX))
                    .collect(),
            );
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT sensor_id, source_id, moy, value FROM \"{}\" WHERE grid_id = ",
            self.table
        ));
        qb.push_bind(i64::from(grid.into_inner()));
        qb.push(" AND moy IN (");
        {
            let mut sep = qb.separated(", ");
            for moy in selected.keys() {
                sep.push_bind(*moy);
            }
        }
        qb.push(") ORDER BY sensor_id, moy");

        // Accumulate value * multiplier per (sensor, minute) in one pass.
        let mut acc: BTreeMap<(i64, i64), f64> = BTreeMap::new();
        let mut rows = qb.build_query_as::<(i64, i64, i64, f64)>().fetch(self.pool);
        while let Some((sensor, source_id, moy, value)) = rows.try_next().await? {
            let keep = selected
                .get(&moy)
                .is_some_and(|ids| ids.contains(&source_id));
            if keep {
                *acc.entry((sensor, moy)).or_insert(0.0) += value;
            }
        }

        let mut keyed: Vec<(u32, u32, f64)> = acc
            .into_iter()
            .map(|((sensor, moy), value)| {
                let sensor = u32::try_from(sensor).unwrap_or(u32::MAX);
                let hoy = moy_to_hoy(moy);
                match group_by {
                    GroupBy::Sensor => (sensor, hoy, value),
                    GroupBy::Hour => (hoy, sensor, value),
                }
            })
            .collect();
        keyed.sort_by_key(|&(major, minor, _)| (major, minor));
        Ok(assemble(keyed.into_iter(), group_by))
    }
}

/// Collect `(major, minor, value)` rows, already sorted by major then
/// minor, into a frame.
fn assemble(rows: impl Iterator<Item = (u32, u32, f64)>, group_by: GroupBy) -> SeriesFrame {
    let mut groups: Vec<SeriesGroup> = Vec::new();
    for (major, minor, value) in rows {
        match groups.last_mut() {
            Some(group) if group.key == major => group.series.push((minor, value)),
            _ => groups.push(SeriesGroup {
                key: major,
                series: vec![(minor, value)],
            }),
        }
    }
    SeriesFrame { group_by, groups }
}

fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[lumen_types::GlobalId]) {
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(i64::try_from(id.into_inner()).unwrap_or(i64::MAX));
    }
}

fn moy_to_hoy(moy: i64) -> u32 {
    u32::try_from(moy / i64::from(MINUTES_PER_HOUR)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_groups_consecutive_major_keys() {
        let rows = vec![(0, 0, 10.0), (0, 1, 20.0), (1, 0, 40.0)];
        let frame = assemble(rows.into_iter(), GroupBy::Sensor);
        assert_eq!(frame.groups.len(), 2);
        assert_eq!(
            frame.groups.first().map(|g| g.series.clone()),
            Some(vec![(0, 10.0), (1, 20.0)])
        );
    }

    #[test]
    fn frame_aggregates() {
        let frame = assemble(
            vec![(0, 0, 10.0), (0, 1, 30.0), (1, 0, 5.0)].into_iter(),
            GroupBy::Sensor,
        );
        assert_eq!(frame.cumulative(), vec![(0, 40.0), (1, 5.0)]);
        assert_eq!(frame.peak(), vec![(0, 30.0), (1, 5.0)]);
        assert_eq!(frame.minimum(), vec![(0, 10.0), (1, 5.0)]);
    }

    #[test]
    fn minute_to_hour_conversion() {
        assert_eq!(moy_to_hoy(0), 0);
        assert_eq!(moy_to_hoy(60), 1);
        assert_eq!(moy_to_hoy(525_540), 8759);
    }
}
