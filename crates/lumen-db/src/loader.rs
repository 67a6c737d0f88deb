//! Chunked transactional bulk loading of matrix files.
//!
//! A load streams one matrix file -- one sensor per row, one timestep per
//! column -- into a result table as `(sensor_id, grid_id, source_id, moy,
//! value)` tuples. Writes are buffered into fixed-size chunks and each
//! chunk commits as one transaction: memory stays bounded, and a crash
//! mid-load loses at most the in-flight chunk while every committed chunk
//! stays durable. Callers treat a failed load as possibly partially
//! loaded and either resume or wipe and restart; inserts use
//! `INSERT OR REPLACE` so a resumed load may safely re-cover the boundary
//! chunk.
//!
//! For the duration of a load the connection runs with
//! `PRAGMA synchronous = OFF` on top of WAL journaling, restoring
//! `NORMAL` afterwards. The whole load happens on a single pooled
//! connection so the pragma and the transactions agree.

use sqlx::{Acquire, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use lumen_types::{GlobalId, GridId};

use crate::catalog::Catalog;
use crate::error::DbError;
use crate::matrix::MatrixFile;
use crate::schema;

/// Default result rows per transaction.
const DEFAULT_CHUNK_ROWS: usize = 250_000;

/// Result rows per multi-row INSERT statement. Five binds per row keeps
/// a statement well under SQLite's bind-variable limit.
const STATEMENT_ROWS: usize = 5_000;

/// One buffered result row.
type Row = (i64, i64, f64);

/// Bulk loader for renderer matrix files.
pub struct MatrixLoader<'a> {
    pool: &'a SqlitePool,
    chunk_rows: usize,
}

impl<'a> MatrixLoader<'a> {
    /// Create a loader bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            chunk_rows: DEFAULT_CHUNK_ROWS,
        }
    }

    /// Set the number of result rows per chunk transaction.
    #[must_use]
    pub const fn with_chunk_rows(mut self, rows: usize) -> Self {
        self.chunk_rows = rows;
        self
    }

    /// Stream a time-series matrix file into `table`.
    ///
    /// `moys` names the minute-of-year of each column, in column order;
    /// matrix rows are consumed in sensor order starting at sensor 0.
    /// Returns the number of result rows written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ShapeMismatch`] when the declared column count
    /// differs from `len(moys)` or the declared row count differs from
    /// the grid's persisted sensor count, [`DbError::MalformedInput`] for
    /// a bad file, and [`DbError::Sqlite`] for a failed chunk. Committed
    /// chunks survive a failure.
    pub async fn load_matrix(
        &self,
        path: impl AsRef<std::path::Path>,
        table: &str,
        grid: GridId,
        source: GlobalId,
        moys: &[u32],
    ) -> Result<u64, DbError> {
        schema::ensure_identifier(table)?;
        let mut file = MatrixFile::open(path).await?;
        if file.header().ncols != moys.len() {
            return Err(DbError::ShapeMismatch {
                expected: moys.len(),
                declared: file.header().ncols,
            });
        }
        self.check_sensor_count(grid, file.header().nrows).await?;

        let mut conn = self.pool.acquire().await?;
        sqlx::query("PRAGMA synchronous = OFF")
            .execute(&mut *conn)
            .await?;

        let result = async {
            let mut buffer: Vec<Row> = Vec::with_capacity(self.chunk_rows.min(1 << 20));
            let mut written = 0_u64;
            let mut sensor: i64 = 0;
            while let Some(values) = file.next_row().await? {
                for (&moy, value) in moys.iter().zip(values) {
                    buffer.push((sensor, i64::from(moy), value));
                }
                sensor = sensor.saturating_add(1);
                if buffer.len() >= self.chunk_rows {
                    written =
                        written.saturating_add(commit_chunk(&mut conn, table, grid, source, &buffer, true).await?);
                    buffer.clear();
                }
            }
            if !buffer.is_empty() {
                written =
                    written.saturating_add(commit_chunk(&mut conn, table, grid, source, &buffer, true).await?);
            }
            Ok(written)
        }
        .await;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&mut *conn)
            .await?;

        if let Ok(rows) = &result {
            tracing::info!(table, %grid, %source, rows, "Loaded matrix");
        }
        result
    }

    /// Stream a single-column (point-in-time) matrix file into `table`.
    ///
    /// Returns the number of result rows written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ShapeMismatch`] when the file declares more
    /// than one column or the row count differs from the grid's sensor
    /// count; otherwise as [`Self::load_matrix`].
    pub async fn load_point_matrix(
        &self,
        path: impl AsRef<std::path::Path>,
        table: &str,
        grid: GridId,
        source: GlobalId,
    ) -> Result<u64, DbError> {
        schema::ensure_identifier(table)?;
        let mut file = MatrixFile::open(path).await?;
        if file.header().ncols != 1 {
            return Err(DbError::ShapeMismatch {
                expected: 1,
                declared: file.header().ncols,
            });
        }
        self.check_sensor_count(grid, file.header().nrows).await?;

        let mut conn = self.pool.acquire().await?;
        sqlx::query("PRAGMA synchronous = OFF")
            .execute(&mut *conn)
            .await?;

        let result = async {
            let mut buffer: Vec<Row> = Vec::new();
            let mut written = 0_u64;
            let mut sensor: i64 = 0;
            while let Some(values) = file.next_row().await? {
                if let Some(&value) = values.first() {
                    buffer.push((sensor, 0, value));
                }
                sensor = sensor.saturating_add(1);
                if buffer.len() >= self.chunk_rows {
                    written =
                        written.saturating_add(commit_chunk(&mut conn, table, grid, source, &buffer, false).await?);
                    buffer.clear();
                }
            }
            if !buffer.is_empty() {
                written =
                    written.saturating_add(commit_chunk(&mut conn, table, grid, source, &buffer, false).await?);
            }
            Ok(written)
        }
        .await;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&mut *conn)
            .await?;

        if let Ok(rows) = &result {
            tracing::info!(table, %grid, %source, rows, "Loaded point matrix");
        }
        result
    }

    /// Derive the finalized table of a combined recipe in one bulk pass:
    /// `value = sky_total - sky_direct + sun` per keyed row, with missing
    /// component rows contributing zero.
    ///
    /// Returns the number of finalized rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidName`] for an unsafe recipe name and
    /// [`DbError::Sqlite`] if the update fails.
    pub async fn finalize_combined(&self, recipe: &str) -> Result<u64, DbError> {
        schema::ensure_identifier(recipe)?;
        let total = schema::sky_total_table(recipe);
        let direct = schema::sky_direct_table(recipe);
        let sun = schema::sun_table(recipe);
        let sql = format!(
            "INSERT OR REPLACE INTO \"{recipe}\"
               (sensor_id, grid_id, source_id, moy, value)
             SELECT t.sensor_id, t.grid_id, t.source_id, t.moy,
                    t.value - COALESCE(d.value, 0) + COALESCE(s.value, 0)
             FROM \"{total}\" t
             LEFT JOIN \"{direct}\" d
               ON d.sensor_id = t.sensor_id AND d.grid_id = t.grid_id
              AND d.source_id = t.source_id AND d.moy = t.moy
             LEFT JOIN \"{sun}\" s
               ON s.sensor_id = t.sensor_id AND s.grid_id = t.grid_id
              AND s.source_id = t.source_id AND s.moy = t.moy"
        );
        let rows = sqlx::query(&sql).execute(self.pool).await?.rows_affected();
        tracing::info!(recipe, rows, "Finalized combined recipe");
        Ok(rows)
    }

    /// Fail fast when the grid's persisted sensor count disagrees with
    /// the file's declared row count. Grids the catalog has never seen
    /// pass through unchecked.
    async fn check_sensor_count(&self, grid: GridId, nrows: usize) -> Result<(), DbError> {
        if let Some(count) = Catalog::new(self.pool).sensor_count(grid).await? {
            if count != nrows {
                return Err(DbError::ShapeMismatch {
                    expected: count,
                    declared: nrows,
                });
            }
        }
        Ok(())
    }
}

/// Write one chunk of buffered rows as a single transaction.
async fn commit_chunk(
    conn: &mut SqliteConnection,
    table: &str,
    grid: GridId,
    source: GlobalId,
    rows: &[Row],
    with_moy: bool,
) -> Result<u64, DbError> {
    let grid_id = i64::from(grid.into_inner());
    let source_id = i64::try_from(source.into_inner()).unwrap_or(i64::MAX);

    let mut tx = conn.begin().await?;
    for batch in rows.chunks(STATEMENT_ROWS) {
        let mut builder: QueryBuilder<Sqlite> = if with_moy {
            QueryBuilder::new(format!(
                "INSERT OR REPLACE INTO \"{table}\" (sensor_id, grid_id, source_id, moy, value) "
            ))
        } else {
            QueryBuilder::new(format!(
                "INSERT OR REPLACE INTO \"{table}\" (sensor_id, grid_id, source_id, value) "
            ))
        };
        builder.push_values(batch, |mut row, &(sensor, moy, value)| {
            row.push_bind(sensor).push_bind(grid_id).push_bind(source_id);
            if with_moy {
                row.push_bind(moy);
            }
            row.push_bind(value);
        });
        builder.build().execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::debug!(table, rows = rows.len(), "Committed chunk");
    Ok(u64::try_from(rows.len()).unwrap_or(u64::MAX))
}
