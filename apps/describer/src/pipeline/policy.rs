//! Named policies for the ambiguous cases of the attribute join.
//!
//! The defaults reproduce the behaviour product owners currently rely on:
//! first matching product row, first column on a name collision, and first
//! attribute row on a duplicated attribute name. The duplicate-attribute
//! default is pending product-owner review.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which product row to use when an article code matches more than one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductMatchPolicy {
    /// Use the first matching row in table order.
    #[default]
    First,
    /// Fail with `AmbiguousProduct`.
    Unique,
}

/// What to do when a pivoted attribute name equals an existing column name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnCollisionPolicy {
    /// Keep the first occurrence (product columns precede attributes).
    #[default]
    FirstWins,
    /// Fail with `ColumnCollision`.
    Reject,
}

/// What to do when one article code has several rows with the same `ATTRIBUTENAME`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateAttributePolicy {
    #[default]
    FirstWins,
    LastWins,
    /// Fail with `AmbiguousAttribute`.
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPolicy {
    pub product_match: ProductMatchPolicy,
    pub column_collision: ColumnCollisionPolicy,
    pub duplicate_attribute: DuplicateAttributePolicy,
}

impl FromStr for ProductMatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "unique" => Ok(Self::Unique),
            other => Err(format!(
                "unknown product match policy '{other}' (expected 'first' or 'unique')"
            )),
        }
    }
}

impl FromStr for ColumnCollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_wins" => Ok(Self::FirstWins),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown column collision policy '{other}' (expected 'first' or 'reject')"
            )),
        }
    }
}

impl FromStr for DuplicateAttributePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_wins" => Ok(Self::FirstWins),
            "last" | "last_wins" => Ok(Self::LastWins),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown duplicate attribute policy '{other}' (expected 'first', 'last' or 'reject')"
            )),
        }
    }
}
