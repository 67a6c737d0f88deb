//! Streaming parser for renderer matrix output files.
//!
//! The consumed format is a text stream: header lines of the form
//! `KEY=value` (`FORMAT`, `NROWS`, `NCOLS`, `NCOMP`), a blank separator
//! line, then `NROWS` data lines of `NCOLS` tab-separated numeric fields
//! -- one sensor per line, one timestep per column. Renderers commonly
//! emit a trailing tab per line, producing one empty trailing field; that
//! field is tolerated and ignored.
//!
//! Rows are streamed one at a time so a year-long matrix for thousands of
//! sensors never sits in memory at once.

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::error::DbError;

/// Parsed matrix header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixHeader {
    /// Declared payload format (e.g. `ascii`), if present.
    pub format: Option<String>,
    /// Declared row count (= sensor count).
    pub nrows: usize,
    /// Declared column count (= timestep count).
    pub ncols: usize,
    /// Declared component count per value.
    pub ncomp: usize,
}

/// A matrix file opened for streaming row reads.
pub struct MatrixFile<R> {
    header: MatrixHeader,
    lines: Lines<R>,
    rows_read: usize,
}

impl MatrixFile<BufReader<File>> {
    /// Open a matrix file from disk and parse its header.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the file cannot be read and
    /// [`DbError::MalformedInput`] for a bad header.
    pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self, DbError> {
        let file = File::open(path).await?;
        Self::from_reader(BufReader::new(file)).await
    }
}

impl<R: AsyncBufRead + Unpin> MatrixFile<R> {
    /// Parse the header from any buffered reader.
    ///
    /// # Errors
    ///
    /// Same as [`MatrixFile::open`].
    pub async fn from_reader(reader: R) -> Result<Self, DbError> {
        let mut lines = reader.lines();
        let mut format = None;
        let mut nrows = None;
        let mut ncols = None;
        let mut ncomp = None;

        loop {
            let Some(line) = lines.next_line().await? else {
                return Err(DbError::MalformedInput(
                    "header ended without a blank separator line".to_owned(),
                ));
            };
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "FORMAT" => format = Some(value.trim().to_owned()),
                    "NROWS" => nrows = Some(parse_count("NROWS", value)?),
                    "NCOLS" => ncols = Some(parse_count("NCOLS", value)?),
                    "NCOMP" => ncomp = Some(parse_count("NCOMP", value)?),
                    // Unknown header keys pass through untouched.
                    _ => {}
                }
            }
        }

        let header = MatrixHeader {
            format,
            nrows: nrows
                .ok_or_else(|| DbError::MalformedInput("header is missing NROWS".to_owned()))?,
            ncols: ncols
                .ok_or_else(|| DbError::MalformedInput("header is missing NCOLS".to_owned()))?,
            ncomp: ncomp
                .ok_or_else(|| DbError::MalformedInput("header is missing NCOMP".to_owned()))?,
        };
        Ok(Self {
            header,
            lines,
            rows_read: 0,
        })
    }

    /// The parsed header.
    pub const fn header(&self) -> &MatrixHeader {
        &self.header
    }

    /// Read the next data row, or `None` after `NROWS` rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::MalformedInput`] when the stream ends early,
    /// a field fails to parse, or a row has the wrong column count.
    pub async fn next_row(&mut self) -> Result<Option<Vec<f64>>, DbError> {
        if self.rows_read >= self.header.nrows {
            return Ok(None);
        }
        let row_no = self.rows_read;
        let Some(line) = self.lines.next_line().await? else {
            return Err(DbError::MalformedInput(format!(
                "file ended at row {row_no} of {}",
                self.header.nrows
            )));
        };
        let line = line.trim_end_matches('\r');

        let mut fields: Vec<&str> = line.split('\t').collect();
        // Tolerate one empty trailing field from a trailing tab.
        if fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        if fields.len() != self.header.ncols {
            return Err(DbError::MalformedInput(format!(
                "row {row_no} has {} fields, header declares NCOLS={}",
                fields.len(),
                self.header.ncols
            )));
        }

        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            let value: f64 = field.trim().parse().map_err(|_| {
                DbError::MalformedInput(format!("row {row_no}: non-numeric field {field:?}"))
            })?;
            values.push(value);
        }
        self.rows_read = self.rows_read.saturating_add(1);
        Ok(Some(values))
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, DbError> {
    value
        .trim()
        .parse()
        .map_err(|_| DbError::MalformedInput(format!("{key} is not a count: {value:?}")))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    async fn open(text: &str) -> Result<MatrixFile<BufReader<&[u8]>>, DbError> {
        MatrixFile::from_reader(BufReader::new(text.as_bytes())).await
    }

    const SMALL: &str = "FORMAT=ascii\nNROWS=2\nNCOLS=3\nNCOMP=1\n\n10\t20\t30\t\n40\t50\t60\t\n";

    #[tokio::test]
    async fn parses_header_and_rows() {
        let mut file = open(SMALL).await.expect("open");
        assert_eq!(
            file.header(),
            &MatrixHeader {
                format: Some("ascii".to_owned()),
                nrows: 2,
                ncols: 3,
                ncomp: 1,
            }
        );
        assert_eq!(file.next_row().await.expect("row"), Some(vec![10.0, 20.0, 30.0]));
        assert_eq!(file.next_row().await.expect("row"), Some(vec![40.0, 50.0, 60.0]));
        assert_eq!(file.next_row().await.expect("row"), None);
    }

    #[tokio::test]
    async fn missing_header_field_is_malformed() {
        let result = open("FORMAT=ascii\nNROWS=2\nNCOLS=3\n\n").await;
        assert!(matches!(result, Err(DbError::MalformedInput(msg)) if msg.contains("NCOMP")));
    }

    #[tokio::test]
    async fn wrong_column_count_is_malformed() {
        let mut file = open("NROWS=1\nNCOLS=3\nNCOMP=1\n\n10\t20\n")
            .await
            .expect("open");
        assert!(matches!(
            file.next_row().await,
            Err(DbError::MalformedInput(_))
        ));
    }

    #[tokio::test]
    async fn truncated_file_is_malformed() {
        let mut file = open("NROWS=2\nNCOLS=1\nNCOMP=1\n\n10\n").await.expect("open");
        assert!(file.next_row().await.expect("row").is_some());
        assert!(matches!(
            file.next_row().await,
            Err(DbError::MalformedInput(_))
        ));
    }

    #[tokio::test]
    async fn non_numeric_field_is_malformed() {
        let mut file = open("NROWS=1\nNCOLS=1\nNCOMP=1\n\nabc\n").await.expect("open");
        assert!(matches!(
            file.next_row().await,
            Err(DbError::MalformedInput(_))
        ));
    }
}
