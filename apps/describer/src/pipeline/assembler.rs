//! Input Assembler: one `InputEntry` per product row.
//!
//! Flow: check required columns → for each product row: join → project →
//! attach group examples → insert under the article code.
//!
//! Structural problems fail the whole call before any row is touched.
//! Per-product problems are stored as that article code's outcome so the
//! rest of the batch still goes out.

use std::borrow::Cow;
use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::pipeline::columns::{
    ARTICLECODE, ATTRIBUTE_COLUMNS, EXAMPLE_ONLY_COLUMNS, GROUPNAME, PRODUCT_COLUMNS,
};
use crate::pipeline::errors::PipelineError;
use crate::pipeline::examples::{examples_for, ExamplePair};
use crate::pipeline::join::join;
use crate::pipeline::policy::JoinPolicy;
use crate::pipeline::projection::{project, JsonRecord};
use crate::table::{RowRef, Scalar, Table};

/// Everything the model needs for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEntry {
    pub request: JsonRecord,
    pub examples: Vec<ExamplePair>,
}

/// The example dataset used for few-shot prompting.
#[derive(Debug, Clone)]
pub struct ExampleTables {
    pub products: Table,
    pub attributes: Table,
}

/// The tables one run reads from. Borrowed; nothing here is mutated.
#[derive(Debug, Clone, Copy)]
pub struct SourceTables<'a> {
    pub products: &'a Table,
    pub attributes: &'a Table,
    pub examples: Option<&'a ExampleTables>,
}

impl SourceTables<'_> {
    /// Checks every table the run will read for its required columns.
    pub fn validate(&self, include_examples: bool) -> Result<(), PipelineError> {
        self.products.require_columns(PRODUCT_COLUMNS)?;
        self.attributes.require_columns(ATTRIBUTE_COLUMNS)?;

        if include_examples {
            let examples = self.example_tables()?;
            examples.products.require_columns(PRODUCT_COLUMNS)?;
            examples.products.require_columns(EXAMPLE_ONLY_COLUMNS)?;
            examples.attributes.require_columns(ATTRIBUTE_COLUMNS)?;
        }

        Ok(())
    }

    fn example_tables(&self) -> Result<&ExampleTables, PipelineError> {
        self.examples
            .ok_or_else(|| PipelineError::MissingTable("example products".to_string()))
    }
}

/// Per-article outcomes in product-table order.
#[derive(Debug, Clone, Default)]
pub struct AssembledInputs {
    entries: IndexMap<String, Result<InputEntry, PipelineError>>,
}

impl AssembledInputs {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, article_code: &str) -> Option<&Result<InputEntry, PipelineError>> {
        self.entries.get(article_code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Result<InputEntry, PipelineError>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn ready(&self) -> impl Iterator<Item = (&str, &InputEntry)> {
        self.iter()
            .filter_map(|(code, outcome)| outcome.as_ref().ok().map(|entry| (code, entry)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &PipelineError)> {
        self.iter()
            .filter_map(|(code, outcome)| outcome.as_ref().err().map(|err| (code, err)))
    }

    pub fn ready_count(&self) -> usize {
        self.ready().count()
    }
}

/// Builds the input entries for every product row.
///
/// Output size equals the number of distinct article codes. A repeated article
/// code replaces the earlier entry (keeping its position).
pub fn assemble(
    tables: &SourceTables<'_>,
    include_examples: bool,
    policy: &JoinPolicy,
) -> Result<AssembledInputs, PipelineError> {
    tables.validate(include_examples)?;

    let mut example_cache: HashMap<String, Result<Vec<ExamplePair>, PipelineError>> =
        HashMap::new();
    let mut entries = IndexMap::with_capacity(tables.products.len());

    for row in tables.products.rows() {
        let article_code = render_owned(row.get(ARTICLECODE));

        let outcome = build_entry(
            &article_code,
            row,
            tables,
            include_examples,
            policy,
            &mut example_cache,
        );

        if let Err(e) = &outcome {
            warn!("Article {}: {}", article_code, e);
        }

        if entries.insert(article_code.clone(), outcome).is_some() {
            debug!(
                "Article code '{}' appears more than once; later row replaces the earlier entry",
                article_code
            );
        }
    }

    let assembled = AssembledInputs { entries };
    info!(
        "Assembled {} inputs ({} ready, {} failed) from {} product rows",
        assembled.len(),
        assembled.ready_count(),
        assembled.len() - assembled.ready_count(),
        tables.products.len()
    );

    Ok(assembled)
}

fn build_entry(
    article_code: &str,
    row: RowRef<'_>,
    tables: &SourceTables<'_>,
    include_examples: bool,
    policy: &JoinPolicy,
    example_cache: &mut HashMap<String, Result<Vec<ExamplePair>, PipelineError>>,
) -> Result<InputEntry, PipelineError> {
    let record = join(article_code, tables.products, tables.attributes, policy)?;
    debug!(
        "Joined article {} into {} columns",
        record.article_code(),
        record.len()
    );
    let request = project(&record);

    let examples = match (include_examples, row.get(GROUPNAME).and_then(Scalar::render)) {
        (true, Some(group)) => {
            let example_tables = tables.example_tables()?;
            example_cache
                .entry(group.into_owned())
                .or_insert_with_key(|group| {
                    examples_for(
                        group,
                        &example_tables.products,
                        &example_tables.attributes,
                        policy,
                    )
                })
                .clone()?
        }
        _ => Vec::new(),
    };

    Ok(InputEntry { request, examples })
}

fn render_owned(value: Option<&Scalar>) -> String {
    value
        .and_then(Scalar::render)
        .map(Cow::into_owned)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::policy::DuplicateAttributePolicy;
    use crate::table::table_from_strs;
    use serde_json::json;

    const PRODUCT_HEADER: &[&str] = &[
        "ARTICLECODE",
        "GROUPNAME",
        "TITLE",
        "SHORTDESCRIPTION",
        "KEY_SELLING_POINTS",
    ];

    fn products(rows: &[&[&str]]) -> Table {
        table_from_strs("products", PRODUCT_HEADER, rows)
    }

    fn attributes(rows: &[&[&str]]) -> Table {
        table_from_strs("attributes", &["ARTICLECODE", "ATTRIBUTENAME", "VALUE"], rows)
    }

    fn example_tables() -> ExampleTables {
        ExampleTables {
            products: table_from_strs(
                "example products",
                &[
                    "ARTICLECODE",
                    "GROUPNAME",
                    "TITLE",
                    "SHORTDESCRIPTION",
                    "KEY_SELLING_POINTS",
                    "LONGDESCRIPTION",
                    "language",
                ],
                &[
                    &["E1", "TV", "OLED 65", "Big", "Blacks", "<b>OLED</b>", "en"],
                    &["E2", "TV", "QLED 55", "Bright", "Colour", "<b>QLED</b>", "en"],
                    &["E3", "Phone", "Phone Z", "Small", "Battery", "<b>Z</b>", "en"],
                ],
            ),
            attributes: attributes(&[&["E1", "PANEL", "OLED"], &["E2", "PANEL", "QLED"]]),
        }
    }

    fn sample_products() -> Table {
        products(&[
            &["A1", "TV", "Smart TV", "A TV", "4K"],
            &["A2", "Radio", "DAB+", "A radio", "Clear"],
        ])
    }

    fn sample_attributes() -> Table {
        attributes(&[
            &["A1", "SCREEN_SIZE", "55in"],
            &["A1", "RESOLUTION", "4K"],
        ])
    }

    #[test]
    fn test_one_entry_per_product_in_order() {
        let p = sample_products();
        let a = sample_attributes();
        let tables = SourceTables {
            products: &p,
            attributes: &a,
            examples: None,
        };
        let assembled = assemble(&tables, false, &JoinPolicy::default()).unwrap();

        assert_eq!(assembled.len(), 2);
        let codes: Vec<_> = assembled.iter().map(|(c, _)| c.to_string()).collect();
        assert_eq!(codes, vec!["A1", "A2"]);

        let entry = assembled.get("A1").unwrap().as_ref().unwrap();
        assert_eq!(entry.request.get("SCREEN_SIZE"), Some(&json!("55in")));
        assert!(entry.examples.is_empty());
    }

    #[test]
    fn test_examples_attached_by_group() {
        let p = sample_products();
        let a = sample_attributes();
        let ex = example_tables();
        let tables = SourceTables {
            products: &p,
            attributes: &a,
            examples: Some(&ex),
        };
        let assembled = assemble(&tables, true, &JoinPolicy::default()).unwrap();

        let tv = assembled.get("A1").unwrap().as_ref().unwrap();
        assert_eq!(tv.examples.len(), 2);
        assert_eq!(tv.examples[0].output, "<b>OLED</b>");
        assert_eq!(tv.examples[1].input.get("PANEL"), Some(&json!("QLED")));
        // The request is built from the request tables only.
        assert!(!tv.request.contains_key("PANEL"));
        assert_eq!(tv.request.get("TITLE"), Some(&json!("Smart TV")));

        let radio = assembled.get("A2").unwrap().as_ref().unwrap();
        assert!(radio.examples.is_empty());
    }

    #[test]
    fn test_example_inputs_never_carry_target_fields() {
        let p = sample_products();
        let a = sample_attributes();
        let ex = example_tables();
        let tables = SourceTables {
            products: &p,
            attributes: &a,
            examples: Some(&ex),
        };
        let assembled = assemble(&tables, true, &JoinPolicy::default()).unwrap();

        for (_, entry) in assembled.ready() {
            for pair in &entry.examples {
                assert!(!pair.input.contains_key("LONGDESCRIPTION"));
                assert!(!pair.input.contains_key("language"));
            }
        }
    }

    #[test]
    fn test_duplicate_article_codes_overwrite() {
        let p = products(&[
            &["A1", "TV", "First", "x", "y"],
            &["A2", "TV", "Other", "x", "y"],
            &["A1", "Phone", "Second", "x", "y"],
        ]);
        let a = attributes(&[]);
        let ex = example_tables();
        let tables = SourceTables {
            products: &p,
            attributes: &a,
            examples: Some(&ex),
        };
        let assembled = assemble(&tables, true, &JoinPolicy::default()).unwrap();

        assert_eq!(assembled.len(), 2);
        let codes: Vec<_> = assembled.iter().map(|(c, _)| c.to_string()).collect();
        assert_eq!(codes, vec!["A1", "A2"]);

        // The join always picks the first matching product row, while the
        // examples follow the group of the row that wrote the entry last.
        let a1 = assembled.get("A1").unwrap().as_ref().unwrap();
        assert_eq!(a1.request.get("TITLE"), Some(&json!("First")));
        assert_eq!(a1.request.get("GROUPNAME"), Some(&json!("TV")));
        let outputs: Vec<_> = a1.examples.iter().map(|e| e.output.as_str()).collect();
        assert_eq!(outputs, vec!["<b>Z</b>"]);
    }

    #[test]
    fn test_bad_example_row_does_not_fail_group_requests() {
        let p = sample_products();
        let a = sample_attributes();
        let mut ex = example_tables();
        ex.attributes = attributes(&[
            &["E1", "PANEL", "OLED"],
            &["E1", "PANEL", "WOLED"],
            &["E2", "PANEL", "QLED"],
        ]);
        let tables = SourceTables {
            products: &p,
            attributes: &a,
            examples: Some(&ex),
        };
        let policy = JoinPolicy {
            duplicate_attribute: DuplicateAttributePolicy::Reject,
            ..JoinPolicy::default()
        };

        let assembled = assemble(&tables, true, &policy).unwrap();

        let tv = assembled.get("A1").unwrap().as_ref().unwrap();
        assert_eq!(tv.request.get("TITLE"), Some(&json!("Smart TV")));
        assert_eq!(tv.examples.len(), 1);
        assert_eq!(tv.examples[0].output, "<b>QLED</b>");
        assert_eq!(assembled.failures().count(), 0);
    }

    #[test]
    fn test_missing_column_fails_before_processing() {
        let p = table_from_strs(
            "products",
            &["ARTICLECODE", "GROUPNAME", "TITLE"],
            &[&["A1", "TV", "Smart TV"]],
        );
        let a = attributes(&[]);
        let tables = SourceTables {
            products: &p,
            attributes: &a,
            examples: None,
        };
        let err = assemble(&tables, false, &JoinPolicy::default()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingColumn {
                table: "products".to_string(),
                column: "SHORTDESCRIPTION".to_string()
            }
        );
    }

    #[test]
    fn test_example_table_columns_checked_only_when_used() {
        let p = sample_products();
        let a = sample_attributes();
        let ex = ExampleTables {
            products: table_from_strs("example products", PRODUCT_HEADER, &[]),
            attributes: attributes(&[]),
        };
        let tables = SourceTables {
            products: &p,
            attributes: &a,
            examples: Some(&ex),
        };

        assert!(assemble(&tables, false, &JoinPolicy::default()).is_ok());
        let err = assemble(&tables, true, &JoinPolicy::default()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingColumn {
                table: "example products".to_string(),
                column: "LONGDESCRIPTION".to_string()
            }
        );
    }

    #[test]
    fn test_examples_requested_without_example_tables() {
        let p = sample_products();
        let a = sample_attributes();
        let tables = SourceTables {
            products: &p,
            attributes: &a,
            examples: None,
        };
        let err = assemble(&tables, true, &JoinPolicy::default()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingTable(_)));
    }

    #[test]
    fn test_per_product_failure_is_isolated() {
        let p = sample_products();
        let a = attributes(&[&["A1", "COLOR", "Black"], &["A1", "COLOR", "White"]]);
        let tables = SourceTables {
            products: &p,
            attributes: &a,
            examples: None,
        };
        let policy = JoinPolicy {
            duplicate_attribute: DuplicateAttributePolicy::Reject,
            ..JoinPolicy::default()
        };
        let assembled = assemble(&tables, false, &policy).unwrap();

        assert_eq!(assembled.len(), 2);
        let failures: Vec<_> = assembled.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "A1");
        assert_eq!(failures[0].1.article_code(), Some("A1"));
        assert!(assembled.get("A2").unwrap().is_ok());
    }

    #[test]
    fn test_null_article_code_is_reported_not_found() {
        let p = products(&[&["", "TV", "Nameless", "x", "y"], &["A2", "TV", "Named", "x", "y"]]);
        let a = attributes(&[]);
        let tables = SourceTables {
            products: &p,
            attributes: &a,
            examples: None,
        };
        let assembled = assemble(&tables, false, &JoinPolicy::default()).unwrap();

        assert!(matches!(
            assembled.get(""),
            Some(Err(PipelineError::NotFound { .. }))
        ));
        assert_eq!(assembled.ready_count(), 1);
    }
}
