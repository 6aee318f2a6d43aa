//! CSV export of generated descriptions.

use crate::errors::AppError;
use crate::generation::runner::DescriptionResult;
use crate::pipeline::columns::{ARTICLECODE, LONGDESCRIPTION, TITLE};

pub const EXPORT_FILENAME: &str = "product-descriptions.csv";

/// Writes results as `ARTICLECODE,TITLE,LONGDESCRIPTION`, in run order.
pub fn results_to_csv(results: &[DescriptionResult]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| AppError::Internal(anyhow::anyhow!("Failed to write CSV: {e}"));

    writer
        .write_record([ARTICLECODE, TITLE, LONGDESCRIPTION])
        .map_err(csv_err)?;
    for result in results {
        writer
            .write_record([
                result.article_code.as_str(),
                result.title.as_str(),
                result.description.as_str(),
            ])
            .map_err(csv_err)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to flush CSV: {e}")))
}
