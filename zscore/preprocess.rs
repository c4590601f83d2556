// ========================================================================================
//
//                       Weight vector & variance preparation
//
// ========================================================================================
//
// Builds the per-SNP weight vector that feeds `wᵀ Σ w`, aligned to the covariance
// matrix, together with each SNP's variance. A SNP without a usable primary beta
// keeps its slot with a zero weight, so it drops out of the quadratic form
// (including its cross-covariance terms) without shifting the matrix alignment.

use crate::types::{BETA_SET, BETA_Z_SET, BetaSets, CovarianceMatrix, StatisticSet, WeightMap};
use ndarray::Array1;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreprocessError {
    #[error(
        "Gene {gene}: RSID {rsid} can't be found in the weights database. Are you sure your covariance data matches the weights database you are using?"
    )]
    WeightMissing { gene: String, rsid: String },
    #[error(
        "Gene {gene}: covariance matrix is {rows}x{cols}, but {rsids} valid rsids were supplied."
    )]
    DimensionMismatch {
        gene: String,
        rsids: usize,
        rows: usize,
        cols: usize,
    },
    #[error("Gene {gene}: a scalar covariance describes exactly one SNP, but {rsids} valid rsids were supplied.")]
    ScalarCovarianceNeedsOneSnp { gene: String, rsids: usize },
}

/// The aligned inputs shared by every scoring scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessed {
    /// Effective weights used in the quadratic form, zeroed where the primary beta is missing.
    pub weight_vector: Array1<f64>,
    /// Unmodified model weights in the same order, used by the numerator.
    pub model_weights: Vec<f64>,
    /// Diagonal variance of each valid SNP.
    pub variances: HashMap<String, f64>,
}

/// Prefers raw betas, falling back to z-transformed betas.
pub fn primary_beta_set(beta_sets: &BetaSets) -> Option<&StatisticSet> {
    beta_sets
        .get(BETA_SET)
        .or_else(|| beta_sets.get(BETA_Z_SET))
}

pub fn preprocess(
    gene: &str,
    covariance: &CovarianceMatrix,
    valid_rsids: &[String],
    weights: &WeightMap,
    beta_sets: &BetaSets,
) -> Result<Preprocessed, PreprocessError> {
    check_alignment(gene, covariance, valid_rsids.len())?;

    let primary = primary_beta_set(beta_sets);

    let mut weight_vector = Vec::with_capacity(valid_rsids.len());
    let mut model_weights = Vec::with_capacity(valid_rsids.len());
    let mut variances = HashMap::with_capacity(valid_rsids.len());

    for (i, rsid) in valid_rsids.iter().enumerate() {
        let entry = weights
            .get(rsid)
            .ok_or_else(|| PreprocessError::WeightMissing {
                gene: gene.to_string(),
                rsid: rsid.clone(),
            })?;

        let effective = match primary {
            Some(set) if !set.has_value(rsid) => {
                log::debug!(
                    "Gene {gene}: snp {rsid} not present in {}, skipping weight",
                    set.label()
                );
                0.0
            }
            _ => entry.weight,
        };

        weight_vector.push(effective);
        model_weights.push(entry.weight);
        variances.insert(rsid.clone(), covariance.variance_at(i));
    }

    Ok(Preprocessed {
        weight_vector: Array1::from(weight_vector),
        model_weights,
        variances,
    })
}

fn check_alignment(
    gene: &str,
    covariance: &CovarianceMatrix,
    rsids: usize,
) -> Result<(), PreprocessError> {
    match covariance {
        CovarianceMatrix::Scalar(_) if rsids != 1 => {
            Err(PreprocessError::ScalarCovarianceNeedsOneSnp {
                gene: gene.to_string(),
                rsids,
            })
        }
        CovarianceMatrix::Dense(matrix) if matrix.nrows() != rsids || matrix.ncols() != rsids => {
            Err(PreprocessError::DimensionMismatch {
                gene: gene.to_string(),
                rsids,
                rows: matrix.nrows(),
                cols: matrix.ncols(),
            })
        }
        _ => Ok(()),
    }
}
