//! Tabular source data: explicit, schema-checked tables of typed scalars.
//!
//! Tables are loaded once per run (see `loader`) and never mutated afterwards.
//! Every narrowing operation (`filter_eq`, `without_columns`) returns a new table.

use std::borrow::Cow;

use serde_json::{Number, Value};

use crate::pipeline::errors::PipelineError;

pub mod loader;

/// Cell spellings the loader treats as a missing value.
const NULL_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

// ────────────────────────────────────────────────────────────────────────────
// Scalar
// ────────────────────────────────────────────────────────────────────────────

/// A single typed cell value.
///
/// `Decimal` keeps the exact source text so that projection never loses precision.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(String),
    Text(String),
}

impl Scalar {
    /// Infers a scalar from a raw CSV cell.
    ///
    /// Integers must be canonical (`"42"`, `"-7"`): values with a leading zero or an
    /// explicit `+` stay text so identifiers like `"00123"` survive unchanged.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();

        if NULL_MARKERS.contains(&trimmed) {
            return Scalar::Null;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Scalar::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Scalar::Bool(false);
        }
        if is_canonical_integer(trimmed) {
            if let Ok(n) = trimmed.parse::<i64>() {
                return Scalar::Integer(n);
            }
        }
        if looks_decimal(trimmed) {
            if let Ok(f) = trimmed.parse::<f64>() {
                if f.is_finite() {
                    return Scalar::Decimal(trimmed.to_string());
                }
            }
        }

        Scalar::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Textual rendering used for key comparison and for CSV export.
    /// `None` for null.
    pub fn render(&self) -> Option<Cow<'_, str>> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
            Scalar::Integer(n) => Some(Cow::Owned(n.to_string())),
            Scalar::Decimal(s) | Scalar::Text(s) => Some(Cow::Borrowed(s.as_str())),
        }
    }

    /// JSON projection of a single value.
    ///
    /// Integers become JSON numbers; decimals are emitted as strings holding the
    /// source text so no float rounding is introduced.
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Integer(n) => Value::Number(Number::from(*n)),
            Scalar::Decimal(s) | Scalar::Text(s) => Value::String(s.clone()),
        }
    }

    /// True if this value's rendering equals `key`. Null never matches.
    pub fn matches_key(&self, key: &str) -> bool {
        self.render().is_some_and(|r| r == key)
    }
}

fn is_canonical_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
}

fn looks_decimal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    // "00123" or "0042.5" is an identifier, not a number.
    let leading_zero_run = body.len() > 1
        && body.starts_with('0')
        && body[1..].starts_with(|c: char| c.is_ascii_digit());
    !leading_zero_run
        && body.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
}

// ────────────────────────────────────────────────────────────────────────────
// Table
// ────────────────────────────────────────────────────────────────────────────

/// An ordered set of named columns and rows of scalars.
///
/// Invariant: every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
}

/// A borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a [String],
    cells: &'a [Scalar],
}

impl<'a> RowRef<'a> {
    /// Value of the first column named `column`.
    pub fn get(&self, column: &str) -> Option<&'a Scalar> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.cells[i])
    }

    /// `(column, value)` pairs in column order.
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, &'a Scalar)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter())
    }
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Scalar>>,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(PipelineError::MalformedRow {
                table: name,
                row: index + 1,
                expected: columns.len(),
                found: row.len(),
            });
        }
        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(|cells| RowRef {
            columns: &self.columns,
            cells,
        })
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows.get(index).map(|cells| RowRef {
            columns: &self.columns,
            cells,
        })
    }

    /// Fails with `MissingColumn` for the first required column not present.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), PipelineError> {
        match required.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(PipelineError::MissingColumn {
                table: self.name.clone(),
                column: (*missing).to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Rows whose `column` renders to `key`, in table order.
    pub fn filter_eq(&self, column: &str, key: &str) -> Result<Table, PipelineError> {
        let index = self.column_index(column)?;
        let rows = self
            .rows
            .iter()
            .filter(|r| r[index].matches_key(key))
            .cloned()
            .collect();
        Ok(Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows,
        })
    }

    /// A copy of this table without the named columns. Absent names are ignored.
    pub fn without_columns(&self, dropped: &[&str]) -> Table {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !dropped.contains(&c.as_str()))
            .map(|(i, _)| i)
            .collect();

        Table {
            name: self.name.clone(),
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        }
    }

    fn column_index(&self, column: &str) -> Result<usize, PipelineError> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| PipelineError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }
}

/// Builds a table from string literals, inferring scalars the way the loader does.
#[cfg(test)]
pub(crate) fn table_from_strs(name: &str, columns: &[&str], rows: &[&[&str]]) -> Table {
    Table::new(
        name,
        columns.iter().map(|c| c.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|cell| Scalar::infer(cell)).collect())
            .collect(),
    )
    .expect("test table rows must match columns")
}
