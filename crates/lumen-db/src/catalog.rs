//! Catalog operations: grids, sensors, sources, and source visibility.
//!
//! Grids and sensors are written once when an analysis is set up and
//! never mutated. The `sources` table is the durable form of the
//! [`SourceRegistry`]: registration goes through an in-process registry
//! (which owns the allocation algorithm) and persists each newly
//! allocated pair, while [`Catalog::load_registry`] rebuilds the registry
//! from the table on open so allocation continues where it left off.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use lumen_store::SourceRegistry;
use lumen_types::{GlobalId, Grid, GridId, Sensor};

use crate::error::DbError;

/// Operations on the `grids`, `sensors`, `sources`, and `source_grids`
/// tables.
pub struct Catalog<'a> {
    pool: &'a SqlitePool,
}

impl<'a> Catalog<'a> {
    /// Create a catalog bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a grid and all of its sensors in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if any insert fails (including an id
    /// collision with an existing grid).
    pub async fn insert_grid(&self, grid: &Grid) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO grids (id, name, sensor_count) VALUES (?, ?, ?)")
            .bind(i64::from(grid.id.into_inner()))
            .bind(grid.name.as_str())
            .bind(i64::try_from(grid.sensor_count()).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await?;

        if !grid.is_empty() {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO sensors (id, grid_id, loc_x, loc_y, loc_z, dir_x, dir_y, dir_z) ",
            );
            builder.push_values(grid.sensors(), |mut row, (id, sensor)| {
                let [lx, ly, lz] = sensor.location;
                let [dx, dy, dz] = sensor.direction;
                row.push_bind(i64::from(id.into_inner()))
                    .push_bind(i64::from(grid.id.into_inner()))
                    .push_bind(lx)
                    .push_bind(ly)
                    .push_bind(lz)
                    .push_bind(dx)
                    .push_bind(dy)
                    .push_bind(dz);
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        tracing::debug!(grid = %grid.id, sensors = grid.sensor_count(), "Inserted grid");
        Ok(())
    }

    /// Load a grid and its sensors back, in row order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown grid id.
    pub async fn load_grid(&self, id: GridId) -> Result<Grid, DbError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT name FROM grids WHERE id = ?")
            .bind(i64::from(id.into_inner()))
            .fetch_optional(self.pool)
            .await?;
        let Some((name,)) = row else {
            return Err(DbError::NotFound(format!("grid {id}")));
        };

        let sensors: Vec<SensorRow> = sqlx::query_as(
            "SELECT id, loc_x, loc_y, loc_z, dir_x, dir_y, dir_z
             FROM sensors WHERE grid_id = ? ORDER BY id",
        )
        .bind(i64::from(id.into_inner()))
        .fetch_all(self.pool)
        .await?;

        let sensors = sensors
            .into_iter()
            .map(|r| Sensor::new([r.loc_x, r.loc_y, r.loc_z], [r.dir_x, r.dir_y, r.dir_z]))
            .collect();
        Ok(Grid::new(id, name, sensors))
    }

    /// The persisted sensor count of a grid, if the grid exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn sensor_count(&self, id: GridId) -> Result<Option<usize>, DbError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT sensor_count FROM grids WHERE id = ?")
            .bind(i64::from(id.into_inner()))
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|(count,)| usize::try_from(count).unwrap_or(0)))
    }

    /// Rebuild a [`SourceRegistry`] from the `sources` table.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Store`] if the table holds duplicate ids.
    pub async fn load_registry(&self) -> Result<SourceRegistry, DbError> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, source_name, state_name FROM sources ORDER BY id")
                .fetch_all(self.pool)
                .await?;
        let entries = rows.into_iter().map(|(id, source, state)| {
            (GlobalId(u64::try_from(id).unwrap_or(0)), source, state)
        });
        Ok(SourceRegistry::from_entries(entries)?)
    }

    /// Register a (source, state) pair in the registry and persist it.
    ///
    /// Idempotent like the registry itself: an existing pair returns its
    /// id and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the insert fails.
    pub async fn register_source(
        &self,
        registry: &mut SourceRegistry,
        source: &str,
        state: &str,
    ) -> Result<GlobalId, DbError> {
        let id = registry.register(source, state);
        sqlx::query(
            "INSERT OR IGNORE INTO sources (id, source_name, state_name) VALUES (?, ?, ?)",
        )
        .bind(i64::try_from(id.into_inner()).unwrap_or(i64::MAX))
        .bind(source)
        .bind(state)
        .execute(self.pool)
        .await?;
        Ok(id)
    }

    /// Mark a source as visible from a grid.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the insert fails (e.g. an unknown
    /// grid or source id rejected by a foreign key).
    pub async fn link_source_to_grid(
        &self,
        source_id: GlobalId,
        grid_id: GridId,
    ) -> Result<(), DbError> {
        sqlx::query("INSERT OR IGNORE INTO source_grids (source_id, grid_id) VALUES (?, ?)")
            .bind(i64::try_from(source_id.into_inner()).unwrap_or(i64::MAX))
            .bind(i64::from(grid_id.into_inner()))
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// The (id, source, state) triples visible from a grid, ascending by
    /// id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn sources_for_grid(
        &self,
        grid_id: GridId,
    ) -> Result<Vec<(GlobalId, String, String)>, DbError> {
        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT s.id, s.source_name, s.state_name
             FROM sources s
             JOIN source_grids sg ON sg.source_id = s.id
             WHERE sg.grid_id = ?
             ORDER BY s.id",
        )
        .bind(i64::from(grid_id.into_inner()))
        .fetch_all(self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, source, state)| (GlobalId(u64::try_from(id).unwrap_or(0)), source, state))
            .collect())
    }
}

/// Row shape for sensor reads.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SensorRow {
    #[allow(dead_code)]
    id: i64,
    loc_x: f64,
    loc_y: f64,
    loc_z: f64,
    dir_x: f64,
    dir_y: f64,
    dir_z: f64,
}
