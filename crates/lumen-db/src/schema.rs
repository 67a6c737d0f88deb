//! Persisted schema: static tables, per-recipe result tables, and reset.
//!
//! Four static tables mirror the data model -- `grids`, `sensors`,
//! `sources`, `source_grids` -- plus a `recipes` meta table recording
//! which result tables exist and with which record shape. Result tables
//! are created per recipe because their column set depends on the recipe
//! kind: point-in-time rows have no time axis, time-series rows key on
//! the minute-of-year, and combined recipes keep three component tables
//! next to the finalized one.
//!
//! Recipe names become table names, so they are restricted to safe SQL
//! identifiers and rejected otherwise -- the name is the only piece of
//! SQL here that cannot be a bind parameter.

use sqlx::SqlitePool;

use lumen_types::RecipeKind;

use crate::error::DbError;

/// DDL for the static tables, executed on open.
const CREATE_STATIC: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS grids (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        sensor_count INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sensors (
        id INTEGER NOT NULL,
        grid_id INTEGER NOT NULL REFERENCES grids(id),
        loc_x REAL NOT NULL,
        loc_y REAL NOT NULL,
        loc_z REAL NOT NULL,
        dir_x REAL NOT NULL,
        dir_y REAL NOT NULL,
        dir_z REAL NOT NULL,
        PRIMARY KEY (id, grid_id)
    )",
    "CREATE TABLE IF NOT EXISTS sources (
        id INTEGER PRIMARY KEY,
        source_name TEXT NOT NULL,
        state_name TEXT NOT NULL,
        UNIQUE (source_name, state_name)
    )",
    "CREATE TABLE IF NOT EXISTS source_grids (
        source_id INTEGER NOT NULL REFERENCES sources(id),
        grid_id INTEGER NOT NULL REFERENCES grids(id),
        PRIMARY KEY (source_id, grid_id)
    )",
    "CREATE TABLE IF NOT EXISTS recipes (
        name TEXT PRIMARY KEY,
        kind TEXT NOT NULL
    )",
];

/// Create the static tables and seed the reserved sky source (id 0).
pub(crate) async fn init(pool: &SqlitePool) -> Result<(), DbError> {
    for ddl in CREATE_STATIC {
        sqlx::query(ddl).execute(pool).await?;
    }
    sqlx::query(
        "INSERT OR IGNORE INTO sources (id, source_name, state_name) VALUES (0, 'sky', 'default')",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Register a recipe and create its result table(s). Idempotent.
///
/// # Errors
///
/// Returns [`DbError::InvalidName`] for a name that is not a safe SQL
/// identifier and [`DbError::Sqlite`] if the DDL fails.
pub async fn create_recipe(
    pool: &SqlitePool,
    name: &str,
    kind: RecipeKind,
) -> Result<(), DbError> {
    ensure_identifier(name)?;
    sqlx::query("INSERT OR IGNORE INTO recipes (name, kind) VALUES (?, ?)")
        .bind(name)
        .bind(kind_to_db(kind))
        .execute(pool)
        .await?;

    match kind {
        RecipeKind::PointInTime => {
            sqlx::query(&point_table_ddl(name)).execute(pool).await?;
        }
        RecipeKind::TimeSeries => {
            sqlx::query(&series_table_ddl(name)).execute(pool).await?;
        }
        RecipeKind::TimeSeriesCombined => {
            for table in [
                name.to_owned(),
                sky_total_table(name),
                sky_direct_table(name),
                sun_table(name),
            ] {
                sqlx::query(&series_table_ddl(&table)).execute(pool).await?;
            }
        }
    }
    tracing::debug!(recipe = name, ?kind, "Created recipe tables");
    Ok(())
}

/// Look up the shape a recipe was created with.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unregistered recipe.
pub async fn recipe_kind(pool: &SqlitePool, name: &str) -> Result<RecipeKind, DbError> {
    let kind: Option<(String,)> = sqlx::query_as("SELECT kind FROM recipes WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    match kind {
        Some((kind,)) => kind_from_db(&kind),
        None => Err(DbError::NotFound(format!("recipe {name}"))),
    }
}

/// Drop every recipe's tables and empty the static ones.
pub(crate) async fn reset(pool: &SqlitePool) -> Result<(), DbError> {
    let recipes: Vec<(String,)> = sqlx::query_as("SELECT name FROM recipes")
        .fetch_all(pool)
        .await?;
    for (name,) in recipes {
        // Component tables only exist for combined recipes; DROP IF EXISTS
        // covers both shapes.
        for table in [
            name.clone(),
            sky_total_table(&name),
            sky_direct_table(&name),
            sun_table(&name),
        ] {
            sqlx::query(&format!("DROP TABLE IF EXISTS \"{table}\""))
                .execute(pool)
                .await?;
        }
    }
    for table in ["recipes", "source_grids", "sensors", "grids", "sources"] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(pool)
            .await?;
    }
    sqlx::query(
        "INSERT OR IGNORE INTO sources (id, source_name, state_name) VALUES (0, 'sky', 'default')",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Sky-total component table of a combined recipe.
pub fn sky_total_table(recipe: &str) -> String {
    format!("{recipe}_sky_total")
}

/// Sky-direct component table of a combined recipe.
pub fn sky_direct_table(recipe: &str) -> String {
    format!("{recipe}_sky_direct")
}

/// Sun component table of a combined recipe.
pub fn sun_table(recipe: &str) -> String {
    format!("{recipe}_sun")
}

/// Reject names that cannot be spliced into DDL as identifiers.
pub(crate) fn ensure_identifier(name: &str) -> Result<(), DbError> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(DbError::InvalidName(name.to_owned()))
    }
}

fn point_table_ddl(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (
            sensor_id INTEGER NOT NULL,
            grid_id INTEGER NOT NULL,
            source_id INTEGER NOT NULL,
            value REAL NOT NULL,
            PRIMARY KEY (sensor_id, grid_id, source_id)
        )"
    )
}

fn series_table_ddl(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (
            sensor_id INTEGER NOT NULL,
            grid_id INTEGER NOT NULL,
            source_id INTEGER NOT NULL,
            moy INTEGER NOT NULL,
            value REAL NOT NULL,
            PRIMARY KEY (sensor_id, grid_id, source_id, moy)
        )"
    )
}

const fn kind_to_db(kind: RecipeKind) -> &'static str {
    match kind {
        RecipeKind::PointInTime => "point_in_time",
        RecipeKind::TimeSeries => "time_series",
        RecipeKind::TimeSeriesCombined => "time_series_combined",
    }
}

fn kind_from_db(kind: &str) -> Result<RecipeKind, DbError> {
    match kind {
        "point_in_time" => Ok(RecipeKind::PointInTime),
        "time_series" => Ok(RecipeKind::TimeSeries),
        "time_series_combined" => Ok(RecipeKind::TimeSeriesCombined),
        other => Err(DbError::MalformedInput(format!("unknown recipe kind {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(ensure_identifier("annual_daylight").is_ok());
        assert!(ensure_identifier("_tmp2").is_ok());
        assert!(ensure_identifier("").is_err());
        assert!(ensure_identifier("2fast").is_err());
        assert!(ensure_identifier("drop table;--").is_err());
    }

    #[test]
    fn component_table_names() {
        assert_eq!(sky_total_table("annual"), "annual_sky_total");
        assert_eq!(sky_direct_table("annual"), "annual_sky_direct");
        assert_eq!(sun_table("annual"), "annual_sun");
    }

    #[test]
    fn kind_round_trips_through_db_strings() {
        for kind in [
            RecipeKind::PointInTime,
            RecipeKind::TimeSeries,
            RecipeKind::TimeSeriesCombined,
        ] {
            assert_eq!(kind_from_db(kind_to_db(kind)).ok(), Some(kind));
        }
    }
}
