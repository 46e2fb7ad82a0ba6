use anyhow::{Result, bail};

use crate::models::Value;

/// Decoded tabular data for one table, as produced by a format-specific
/// loader. The engine never parses raw files; this is its input boundary.
///
/// Loaders may supply values row-major (delimited text, spreadsheets) or
/// column-major (relational result sets); both normalize to the columnar
/// store on `put`.
#[derive(Debug, Clone)]
pub struct TablePayload {
    pub name: String,
    pub columns: Vec<String>,
    pub values: TableValues,
}

#[derive(Debug, Clone)]
pub enum TableValues {
    RowMajor(Vec<Vec<Value>>),
    ColumnMajor(Vec<Vec<Value>>),
}

impl TablePayload {
    pub fn from_rows(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values: TableValues::RowMajor(rows),
        }
    }

    pub fn from_columns(name: &str, columns: &[&str], values: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values: TableValues::ColumnMajor(values),
        }
    }

    pub fn row_count(&self) -> usize {
        match &self.values {
            TableValues::RowMajor(rows) => rows.len(),
            TableValues::ColumnMajor(cols) => cols.first().map_or(0, |c| c.len()),
        }
    }

    /// Normalize to column-major vectors, one per declared column.
    ///
    /// Row-major input degrades gracefully the way the loaders do: short rows
    /// are padded with nulls, oversized rows lose their trailing cells.
    /// Column-major input must match the declared shape exactly.
    pub(crate) fn into_columns(self) -> Result<Vec<Vec<Value>>> {
        let ncols = self.columns.len();
        match self.values {
            TableValues::RowMajor(rows) => {
                let mut cols: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); ncols];
                for mut row in rows {
                    row.resize(ncols, Value::Null);
                    for (i, value) in row.into_iter().take(ncols).enumerate() {
                        cols[i].push(value);
                    }
                }
                Ok(cols)
            }
            TableValues::ColumnMajor(cols) => {
                if cols.len() != ncols {
                    bail!(
                        "table '{}' supplied {} columns of values but declared {}",
                        self.name,
                        cols.len(),
                        ncols
                    );
                }
                let expected = cols.first().map_or(0, |c| c.len());
                for (i, col) in cols.iter().enumerate() {
                    if col.len() != expected {
                        bail!(
                            "table '{}' column '{}' has {} values, expected {}",
                            self.name,
                            self.columns[i],
                            col.len(),
                            expected
                        );
                    }
                }
                Ok(cols)
            }
        }
    }
}
