//! Task variants built on the pipeline.
//!
//! * [`summary`]: recursive reduction into one [`crate::output::Summary`]
//! * [`questions`]: single-pass exam question generation with de-duplication
//! * [`academic`]: question-paper parsing and per-question model answers

pub mod academic;
pub mod questions;
pub mod summary;

use crate::error::{DistillError, TransformError};
use tracing::warn;

/// Resolve independent per-item results.
///
/// Failed items are replaced by `degrade(error)`. When every item failed
/// and at least one failure is a backend outage, the request fails with
/// that outage instead.
pub(crate) fn settle<T>(
    results: Vec<Result<T, TransformError>>,
    degrade: impl Fn(&TransformError) -> T,
) -> Result<Vec<T>, DistillError> {
    if !results.is_empty() && results.iter().all(Result::is_err) {
        if let Some(Err(first)) = results.iter().find(|r| matches!(r, Err(e) if e.is_fatal())) {
            return Err(first.clone().into_fatal());
        }
    }

    Ok(results
        .into_iter()
        .enumerate()
        .map(|(idx, result)| match result {
            Ok(item) => item,
            Err(e) => {
                warn!("Item {}: degraded: {}", idx + 1, e);
                degrade(&e)
            }
        })
        .collect())
}
