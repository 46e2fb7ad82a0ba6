//! Immutable columnar table snapshots.

use std::mem;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::cache::infer::{
    IntWidth, coerce_bool, coerce_float, coerce_int, coerce_temporal, fits_f32, infer_kind,
    narrow_int_width,
};
use crate::models::{ScalarKind, TablePayload, Value};

/// One column's name and inferred scalar kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ScalarKind,
}

/// Typed columnar storage for one column. Integer columns are narrowed to
/// the smallest width that exactly fits, float columns to f32 when lossless.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int8(Vec<Option<i8>>),
    Int16(Vec<Option<i16>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    Float32(Vec<Option<f32>>),
    Float64(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Bool(Vec<Option<bool>>),
    Temporal(Vec<Option<DateTime<Utc>>>),
    /// All-null column; only the length is kept
    Null(usize),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Temporal(v) => v.len(),
            ColumnData::Null(len) => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reconstruct the dynamic value at `idx`. Narrowed integers widen back
    /// to `Value::Int`; lossless f32 storage widens back to the original f64.
    pub fn value_at(&self, idx: usize) -> Value {
        match self {
            ColumnData::Int8(v) => v[idx].map_or(Value::Null, |i| Value::Int(i as i64)),
            ColumnData::Int16(v) => v[idx].map_or(Value::Null, |i| Value::Int(i as i64)),
            ColumnData::Int32(v) => v[idx].map_or(Value::Null, |i| Value::Int(i as i64)),
            ColumnData::Int64(v) => v[idx].map_or(Value::Null, Value::Int),
            ColumnData::Float32(v) => v[idx].map_or(Value::Null, |f| Value::Float(f as f64)),
            ColumnData::Float64(v) => v[idx].map_or(Value::Null, Value::Float),
            ColumnData::Text(v) => {
                v[idx].as_ref().map_or(Value::Null, |s| Value::Text(s.clone()))
            }
            ColumnData::Bool(v) => v[idx].map_or(Value::Null, Value::Bool),
            ColumnData::Temporal(v) => v[idx].map_or(Value::Null, Value::Temporal),
            ColumnData::Null(_) => Value::Null,
        }
    }

    /// Best-effort heap + inline size, used for eviction heuristics only
    fn byte_estimate(&self) -> usize {
        let vec_overhead = mem::size_of::<Vec<u8>>();
        vec_overhead
            + match self {
                ColumnData::Int8(v) => v.len() * mem::size_of::<Option<i8>>(),
                ColumnData::Int16(v) => v.len() * mem::size_of::<Option<i16>>(),
                ColumnData::Int32(v) => v.len() * mem::size_of::<Option<i32>>(),
                ColumnData::Int64(v) => v.len() * mem::size_of::<Option<i64>>(),
                ColumnData::Float32(v) => v.len() * mem::size_of::<Option<f32>>(),
                ColumnData::Float64(v) => v.len() * mem::size_of::<Option<f64>>(),
                ColumnData::Text(v) => {
                    v.len() * mem::size_of::<Option<String>>()
                        + v.iter().flatten().map(|s| s.len()).sum::<usize>()
                }
                ColumnData::Bool(v) => v.len() * mem::size_of::<Option<bool>>(),
                ColumnData::Temporal(v) => v.len() * mem::size_of::<Option<DateTime<Utc>>>(),
                ColumnData::Null(_) => 0,
            }
    }
}

/// Immutable in-memory snapshot of one table belonging to one source.
///
/// Exclusively owned by the [`crate::cache::TableCache`]; searches hold a
/// read-only `Arc` for the duration of one pass. All columns have equal
/// length. The version counter increases on every replacing `put` and is
/// used to flag results computed against an older snapshot as stale.
#[derive(Debug)]
pub struct CachedTable {
    pub source_id: String,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub data: Vec<ColumnData>,
    pub row_count: usize,
    /// Monotonic per-(source, table) counter, assigned by the cache
    pub version: u64,
    /// Byte estimate computed once at build time
    pub(crate) bytes: usize,
}

impl CachedTable {
    /// Build a snapshot from a decoded payload: infer each column's kind,
    /// coerce cells, and narrow numeric storage. The version is assigned by
    /// the cache on insert.
    pub(crate) fn build(source_id: &str, payload: TablePayload) -> Result<Self> {
        let name = payload.name.clone();
        let column_names = payload.columns.clone();
        let raw_columns = payload.into_columns()?;
        let row_count = raw_columns.first().map_or(0, |c| c.len());

        let mut columns = Vec::with_capacity(column_names.len());
        let mut data = Vec::with_capacity(column_names.len());
        for (col_name, raw) in column_names.into_iter().zip(raw_columns) {
            let kind = infer_kind(&raw);
            columns.push(ColumnDef { name: col_name, kind });
            data.push(build_column(raw, kind));
        }

        let bytes: usize = data.iter().map(|c| c.byte_estimate()).sum();
        Ok(Self {
            source_id: source_id.to_string(),
            name,
            columns,
            data,
            row_count,
            version: 0,
            bytes,
        })
    }

    /// Owned snapshot of one full row
    pub fn row(&self, idx: usize) -> Vec<Value> {
        self.data.iter().map(|col| col.value_at(idx)).collect()
    }

    pub fn byte_estimate(&self) -> usize {
        self.bytes
    }
}

fn build_column(raw: Vec<Value>, kind: ScalarKind) -> ColumnData {
    match kind {
        ScalarKind::Integer => {
            let values: Vec<Option<i64>> = raw.iter().map(coerce_int).collect();
            match narrow_int_width(&values) {
                IntWidth::W8 => {
                    ColumnData::Int8(values.into_iter().map(|v| v.map(|i| i as i8)).collect())
                }
                IntWidth::W16 => {
                    ColumnData::Int16(values.into_iter().map(|v| v.map(|i| i as i16)).collect())
                }
                IntWidth::W32 => {
                    ColumnData::Int32(values.into_iter().map(|v| v.map(|i| i as i32)).collect())
                }
                IntWidth::W64 => ColumnData::Int64(values),
            }
        }
        ScalarKind::Float => {
            let values: Vec<Option<f64>> = raw.iter().map(coerce_float).collect();
            if fits_f32(&values) {
                ColumnData::Float32(values.into_iter().map(|v| v.map(|f| f as f32)).collect())
            } else {
                ColumnData::Float64(values)
            }
        }
        ScalarKind::Text => {
            ColumnData::Text(raw.iter().map(|v| v.canonical_text()).collect())
        }
        ScalarKind::Boolean => ColumnData::Bool(raw.iter().map(coerce_bool).collect()),
        ScalarKind::Temporal => ColumnData::Temporal(raw.iter().map(coerce_temporal).collect()),
        ScalarKind::Null => ColumnData::Null(raw.len()),
    }
}
