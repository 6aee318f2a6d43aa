//! Example Generator: few-shot input/output pairs for a product group.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::pipeline::columns::{ARTICLECODE, EXAMPLE_ONLY_COLUMNS, GROUPNAME, LONGDESCRIPTION};
use crate::pipeline::errors::PipelineError;
use crate::pipeline::join::join;
use crate::pipeline::policy::JoinPolicy;
use crate::pipeline::projection::{project, JsonRecord};
use crate::table::{Scalar, Table};

/// One few-shot example: the product as the model sees it, and the description
/// a human wrote for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamplePair {
    pub input: JsonRecord,
    pub output: String,
}

/// Builds the examples for `groupname`, in example-table order.
///
/// The join runs against the group-filtered table with `LONGDESCRIPTION` and
/// `language` removed, so neither can leak into an example's input. A group
/// with no example rows yields an empty list. Rows without a description or an
/// article code, and rows whose join fails under the active policy, are skipped
/// with a warning so one bad example never blocks the group's requests.
pub fn examples_for(
    groupname: &str,
    example_products: &Table,
    example_attributes: &Table,
    policy: &JoinPolicy,
) -> Result<Vec<ExamplePair>, PipelineError> {
    let group = example_products.filter_eq(GROUPNAME, groupname)?;
    let reduced = group.without_columns(EXAMPLE_ONLY_COLUMNS);

    let mut pairs = Vec::with_capacity(group.len());
    for (index, row) in group.rows().enumerate() {
        let Some(output) = row.get(LONGDESCRIPTION).and_then(Scalar::render) else {
            warn!(
                "Example row {} of group '{}' has no {}; skipping",
                index + 1,
                groupname,
                LONGDESCRIPTION
            );
            continue;
        };
        let Some(article_code) = row.get(ARTICLECODE).and_then(Scalar::render) else {
            warn!(
                "Example row {} of group '{}' has no {}; skipping",
                index + 1,
                groupname,
                ARTICLECODE
            );
            continue;
        };

        let record = match join(&article_code, &reduced, example_attributes, policy) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "Example {} of group '{}' cannot be joined: {}; skipping",
                    article_code, groupname, e
                );
                continue;
            }
        };
        pairs.push(ExamplePair {
            input: project(&record),
            output: output.into_owned(),
        });
    }

    Ok(pairs)
}
