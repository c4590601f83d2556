// ========================================================================================
//
//                              Parallel multi-gene scoring
//
// ========================================================================================
//
// Genes are independent: each call reads its own immutable inputs and allocates its
// own weight vector, so the batch is a plain data-parallel map. Output order always
// matches input order.

use crate::calculation::{ZScoreError, compute_zscore};
use crate::scheme::SchemeConfig;
use crate::types::{GeneInput, ReferenceVariances, ZScoreResult};
use rayon::prelude::*;

/// One scored gene, ready to be written as a result row.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneRecord {
    pub gene: String,
    pub result: ZScoreResult,
}

/// Counts describing a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub scored: usize,
    pub not_available: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[Result<GeneRecord, ZScoreError>]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                match outcome {
                    Ok(record) if record.result.zscore.is_some() => summary.scored += 1,
                    Ok(_) => summary.not_available += 1,
                    Err(_) => summary.failed += 1,
                }
                summary
            })
    }
}

/// Scores every gene in `genes` on the current rayon pool.
///
/// A fatal error only aborts the gene it belongs to; its slot holds the error.
pub fn score_genes(
    config: SchemeConfig,
    genes: &[GeneInput],
    reference: Option<&ReferenceVariances>,
) -> Vec<Result<GeneRecord, ZScoreError>> {
    let outcomes: Vec<_> = genes
        .par_iter()
        .map(|input| {
            compute_zscore(config, input, reference).map(|result| GeneRecord {
                gene: input.gene.clone(),
                result,
            })
        })
        .collect();

    let summary = BatchSummary::from_outcomes(&outcomes);
    log::info!(
        "Scored {} genes: {} with a z-score, {} NA, {} failed.",
        outcomes.len(),
        summary.scored,
        summary.not_available,
        summary.failed
    );
    outcomes
}
