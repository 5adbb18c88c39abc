//! Column and keyword value containers for the in-memory model.
//!
//! Columns are shared (`Arc`) so filters can hold on to a resolved column for
//! the duration of one table without copying it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::range::Range;

/// Row-major 2D array (`rows × cols`).
#[derive(Debug, Clone, PartialEq)]
pub struct Array2<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone> Array2<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Build from rows; `None` if rows have different lengths.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Option<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let nb_rows = rows.len();
        let data = rows.into_iter().flatten().collect();
        Some(Self {
            rows: nb_rows,
            cols,
            data,
        })
    }
}

impl<T> Array2<T> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> &[T] {
        let start = (row * self.cols).min(self.data.len());
        let end = (start + self.cols).min(self.data.len());
        &self.data[start..end]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
        }
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }
}

/// Station tuple (STA_INDEX of one measurement, or a station configuration),
/// kept sorted so that equal station sets compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StaTuple(Vec<i16>);

impl StaTuple {
    pub fn new(mut stations: Vec<i16>) -> Self {
        stations.sort_unstable();
        stations.dedup();
        Self(stations)
    }

    pub fn stations(&self) -> &[i16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StaTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        f.write_str(&parts.join("-"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KeywordValue {
    Str(String),
    Int(i64),
    F64(f64),
    Bool(bool),
}

impl KeywordValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            KeywordValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            KeywordValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for KeywordValue {
    fn from(s: &str) -> Self {
        KeywordValue::Str(s.to_string())
    }
}

impl From<String> for KeywordValue {
    fn from(s: String) -> Self {
        KeywordValue::Str(s)
    }
}

impl From<i64> for KeywordValue {
    fn from(v: i64) -> Self {
        KeywordValue::Int(v)
    }
}

/// One stored column.
#[derive(Debug, Clone)]
pub enum ColumnData {
    I16(Arc<[i16]>),
    I32(Arc<[i32]>),
    F64(Arc<[f64]>),
    Str(Arc<[String]>),
    I16Array(Arc<Array2<i16>>),
    F64Array(Arc<Array2<f64>>),
    BoolArray(Arc<Array2<bool>>),
}

impl ColumnData {
    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::I16(v) => v.len(),
            ColumnData::I32(v) => v.len(),
            ColumnData::F64(v) => v.len(),
            ColumnData::Str(v) => v.len(),
            ColumnData::I16Array(a) => a.rows(),
            ColumnData::F64Array(a) => a.rows(),
            ColumnData::BoolArray(a) => a.rows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_2d(&self) -> bool {
        matches!(
            self,
            ColumnData::I16Array(_) | ColumnData::F64Array(_) | ColumnData::BoolArray(_)
        )
    }

    /// Min/max over finite values; `UNDEFINED` for non-numeric or empty columns.
    pub fn range(&self) -> Range {
        let mut out = Range::UNDEFINED;
        match self {
            ColumnData::I16(v) => v.iter().for_each(|x| out.include(f64::from(*x))),
            ColumnData::I32(v) => v.iter().for_each(|x| out.include(f64::from(*x))),
            ColumnData::F64(v) => finite_range(v, &mut out),
            ColumnData::I16Array(a) => a.values().iter().for_each(|x| out.include(f64::from(*x))),
            ColumnData::F64Array(a) => finite_range(a.values(), &mut out),
            ColumnData::Str(_) | ColumnData::BoolArray(_) => {}
        }
        out
    }
}

fn finite_range(values: &[f64], out: &mut Range) {
    for v in values.iter().filter(|v| v.is_finite()) {
        out.include(*v);
    }
}
