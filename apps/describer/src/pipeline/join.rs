//! Attribute Join Engine: one normalized record per article code.
//!
//! Algorithm:
//! 1. Narrow the product table to the article code (NotFound if empty, then
//!    `ProductMatchPolicy` if more than one row matched).
//! 2. Narrow the attribute table to the article code and drop rows with a null
//!    `VALUE` or `ATTRIBUTENAME`.
//! 3. Pivot the surviving `(ATTRIBUTENAME, VALUE)` pairs into columns
//!    (`DuplicateAttributePolicy` for repeated names).
//! 4. Append pivoted columns after the product columns (`ColumnCollisionPolicy`).
//!    With nothing to pivot, append null `ATTRIBUTENAME` / `VALUE` placeholders
//!    so the record shape stays the same.

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::debug;

use crate::pipeline::columns::{ARTICLECODE, ATTRIBUTENAME, VALUE};
use crate::pipeline::errors::PipelineError;
use crate::pipeline::policy::{
    ColumnCollisionPolicy, DuplicateAttributePolicy, JoinPolicy, ProductMatchPolicy,
};
use crate::table::{RowRef, Scalar, Table};

/// A single flat record: product columns followed by pivoted attribute columns.
///
/// Column names are unique; order is product columns first, then attributes in
/// attribute-table order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    article_code: String,
    fields: IndexMap<String, Scalar>,
}

impl NormalizedRecord {
    pub fn article_code(&self) -> &str {
        &self.article_code
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.fields.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Base record from a product row. Repeated header names keep their first value.
    fn from_product_row(article_code: &str, row: RowRef<'_>) -> Self {
        let mut fields = IndexMap::new();
        for (name, value) in row.fields() {
            fields
                .entry(name.to_string())
                .or_insert_with(|| value.clone());
        }
        Self {
            article_code: article_code.to_string(),
            fields,
        }
    }

    fn push_attribute(
        &mut self,
        name: String,
        value: Scalar,
        policy: ColumnCollisionPolicy,
    ) -> Result<(), PipelineError> {
        match self.fields.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
            Entry::Occupied(slot) => match policy {
                ColumnCollisionPolicy::FirstWins => {
                    debug!(
                        "Attribute '{}' of article {} shadows an existing column; keeping the first",
                        slot.key(),
                        self.article_code
                    );
                    Ok(())
                }
                ColumnCollisionPolicy::Reject => Err(PipelineError::ColumnCollision {
                    article_code: self.article_code.clone(),
                    column: slot.key().clone(),
                }),
            },
        }
    }

    fn push_placeholder(&mut self, name: &str) {
        self.fields
            .entry(name.to_string())
            .or_insert(Scalar::Null);
    }
}

/// Joins one article code's product row with its attribute rows.
///
/// Pure: the same inputs always produce the same record.
pub fn join(
    article_code: &str,
    products: &Table,
    attributes: &Table,
    policy: &JoinPolicy,
) -> Result<NormalizedRecord, PipelineError> {
    let matches = products.filter_eq(ARTICLECODE, article_code)?;

    let product = match (matches.row(0), matches.len(), policy.product_match) {
        (None, _, _) => {
            return Err(PipelineError::NotFound {
                article_code: article_code.to_string(),
                table: products.name().to_string(),
            })
        }
        (Some(_), count, ProductMatchPolicy::Unique) if count > 1 => {
            return Err(PipelineError::AmbiguousProduct {
                article_code: article_code.to_string(),
                table: products.name().to_string(),
                count,
            })
        }
        (Some(row), _, _) => row,
    };

    let mut record = NormalizedRecord::from_product_row(article_code, product);

    let attribute_rows = attributes.filter_eq(ARTICLECODE, article_code)?;
    let pivoted = pivot(article_code, &attribute_rows, policy.duplicate_attribute)?;

    if pivoted.is_empty() {
        record.push_placeholder(ATTRIBUTENAME);
        record.push_placeholder(VALUE);
        return Ok(record);
    }

    for (name, value) in pivoted {
        record.push_attribute(name, value, policy.column_collision)?;
    }

    Ok(record)
}

/// Turns `(ATTRIBUTENAME, VALUE)` rows into an ordered name → value map.
/// Rows with a null name or value are skipped.
fn pivot(
    article_code: &str,
    rows: &Table,
    policy: DuplicateAttributePolicy,
) -> Result<IndexMap<String, Scalar>, PipelineError> {
    let mut pivoted: IndexMap<String, Scalar> = IndexMap::new();

    for row in rows.rows() {
        let value = match row.get(VALUE) {
            Some(v) if !v.is_null() => v,
            _ => continue,
        };
        let name = match row.get(ATTRIBUTENAME).and_then(Scalar::render) {
            Some(n) => n.into_owned(),
            None => continue,
        };

        match pivoted.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(value.clone());
            }
            Entry::Occupied(mut slot) => match policy {
                DuplicateAttributePolicy::FirstWins => {}
                DuplicateAttributePolicy::LastWins => {
                    slot.insert(value.clone());
                }
                DuplicateAttributePolicy::Reject => {
                    return Err(PipelineError::AmbiguousAttribute {
                        article_code: article_code.to_string(),
                        attribute: slot.key().clone(),
                    })
                }
            },
        }
    }

    Ok(pivoted)
}
