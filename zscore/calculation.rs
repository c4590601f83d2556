// ========================================================================================
//
//                          The gene-level z-score calculation
//
// ========================================================================================
//
// Every scheme runs the same skeleton:
//
//   1. Preprocess the weights into a vector aligned with the covariance matrix.
//   2. `Var(g) = wᵀ Σ w`. A non-positive value means the covariance data is
//      degenerate for this gene and no z-score exists.
//   3. Sum one numerator term per SNP that has both a beta and a non-zero sigma.
//   4. `z = Σ terms / sqrt(Var(g))`.
//
// The numerator uses the model weight, not the effective (possibly zeroed) weight
// from step 1.

use crate::preprocess::{PreprocessError, Preprocessed, preprocess};
use crate::scheme::{Scheme, SchemeConfig, VarianceSource};
use crate::types::{GeneInput, ReferenceVariances, SIGMA_L_SET, StatisticSet, ZScoreResult};
use crate::value::{ValueError, get_value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZScoreError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error("Gene {gene}: {source}")]
    Value { gene: String, source: ValueError },
    #[error("Gene {gene}: statistic set '{set}' is required by the selected scheme but was not supplied.")]
    MissingStatisticSet { gene: String, set: String },
    #[error("Scheme {scheme} reads reference variances, but none were supplied.")]
    ReferenceVariancesRequired { scheme: Scheme },
    #[error("Gene {gene}: reference variance {value} for rsid {rsid} is negative.")]
    NegativeReferenceVariance { gene: String, rsid: String, value: f64 },
}

/// Where per-SNP standard deviations are read from for one gene.
enum SigmaLookup<'a> {
    Local(Option<&'a StatisticSet>),
    Reference(&'a ReferenceVariances),
}

impl SigmaLookup<'_> {
    fn sigma(&self, gene: &str, rsid: &str) -> Result<Option<f64>, ZScoreError> {
        match self {
            Self::Local(set) => {
                let set = require_set(gene, *set, SIGMA_L_SET)?;
                get_value(set, rsid).map_err(|source| ZScoreError::Value {
                    gene: gene.to_string(),
                    source,
                })
            }
            Self::Reference(variances) => {
                let Some(&variance) = variances.get(rsid) else {
                    log::trace!("rsid {rsid} not in variances");
                    return Ok(None);
                };
                if variance < 0.0 {
                    return Err(ZScoreError::NegativeReferenceVariance {
                        gene: gene.to_string(),
                        rsid: rsid.to_string(),
                        value: variance,
                    });
                }
                Ok(Some(variance.sqrt()))
            }
        }
    }
}

fn require_set<'a>(
    gene: &str,
    set: Option<&'a StatisticSet>,
    name: &str,
) -> Result<&'a StatisticSet, ZScoreError> {
    set.ok_or_else(|| ZScoreError::MissingStatisticSet {
        gene: gene.to_string(),
        set: name.to_string(),
    })
}

/// Computes the association z-score of one gene under `config`.
///
/// `reference` is only consulted by schemes whose variance source is
/// `VarianceSource::Reference`, and must be present for them.
pub fn compute_zscore(
    config: SchemeConfig,
    input: &GeneInput,
    reference: Option<&ReferenceVariances>,
) -> Result<ZScoreResult, ZScoreError> {
    let gene = input.gene.as_str();

    let sigma_lookup = match config.variance_source {
        VarianceSource::LocalSigma => SigmaLookup::Local(input.beta_sets.get(SIGMA_L_SET)),
        VarianceSource::Reference => SigmaLookup::Reference(reference.ok_or_else(|| {
            ZScoreError::ReferenceVariancesRequired {
                scheme: Scheme::from_config(config),
            }
        })?),
    };

    let Preprocessed {
        weight_vector,
        model_weights,
        ..
    } = preprocess(
        gene,
        &input.covariance,
        &input.valid_rsids,
        &input.weights,
        &input.beta_sets,
    )?;

    // Var(g)
    let dot_product = input.covariance.quadratic_form(&weight_vector);
    let denominator = if dot_product > 0.0 {
        dot_product.sqrt()
    } else {
        log::debug!("Gene {gene}: non-positive Var(g) = {dot_product}");
        return Ok(ZScoreResult::not_available(dot_product));
    };

    let beta_name = config.beta_source.set_name();
    let beta_set = input.beta_sets.get(beta_name);

    let mut numerator = 0.0;
    let mut n = 0usize;
    for (rsid, &weight) in input.valid_rsids.iter().zip(&model_weights) {
        let set = require_set(gene, beta_set, beta_name)?;
        let beta = get_value(set, rsid).map_err(|source| ZScoreError::Value {
            gene: gene.to_string(),
            source,
        })?;
        let Some(beta) = beta else {
            continue;
        };

        let sigma = match sigma_lookup.sigma(gene, rsid)? {
            Some(sigma) if sigma != 0.0 => sigma,
            _ => continue,
        };

        numerator += config.beta_source.term(weight, beta, sigma);
        n += 1;
    }

    if n == 0 {
        log::debug!("No terms for {gene}");
        return Ok(ZScoreResult::not_available(dot_product));
    }

    Ok(ZScoreResult {
        zscore: Some(numerator / denominator),
        n,
        dot_product,
    })
}
