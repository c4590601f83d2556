// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are used in one file.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The literal stored in a statistic set when a SNP has no usable value.
pub const MISSING_VALUE: &str = "NA";

/// Statistic set holding raw GWAS effect sizes.
pub const BETA_SET: &str = "beta";
/// Statistic set holding z-transformed effect sizes.
pub const BETA_Z_SET: &str = "beta_z";
/// Statistic set holding the local standard deviation of each SNP's dosage.
pub const SIGMA_L_SET: &str = "sigma_l";

/// One SNP's coefficient in a gene's expression prediction model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub rsid: String,
    pub weight: f64,
}

/// The weight model of one gene, keyed by rsid.
pub type WeightMap = HashMap<String, WeightEntry>;

/// A named mapping from rsid to a numeric string or the `MISSING_VALUE` sentinel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticSet {
    /// Display name, only used in diagnostics.
    #[serde(default)]
    pub name: Option<String>,
    pub values_by_key: HashMap<String, String>,
}

impl StatisticSet {
    pub fn new(name: Option<String>, values_by_key: HashMap<String, String>) -> Self {
        Self {
            name,
            values_by_key,
        }
    }

    /// The label used when this set shows up in a log line or an error.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("set")
    }

    /// True when the set stores something other than the missing sentinel for `rsid`.
    /// The stored text is not parsed here.
    pub fn has_value(&self, rsid: &str) -> bool {
        self.values_by_key
            .get(rsid)
            .is_some_and(|value| value != MISSING_VALUE)
    }
}

/// All statistic sets available for a gene, keyed by set name.
pub type BetaSets = HashMap<String, StatisticSet>;

/// Raw (non-rooted) SNP variances from an external reference panel.
pub type ReferenceVariances = HashMap<String, f64>;

/// The SNP covariance (LD) matrix of one gene, aligned to its valid rsids.
///
/// When exactly one SNP survives matching, upstream loaders hand over the bare
/// variance instead of a 1x1 matrix; `Scalar` keeps that shape explicit.
#[derive(Debug, Clone, PartialEq)]
pub enum CovarianceMatrix {
    Scalar(f64),
    Dense(Array2<f64>),
}

impl CovarianceMatrix {
    /// The variance of the SNP at `index`. The scalar form has the same variance
    /// at every index.
    pub fn variance_at(&self, index: usize) -> f64 {
        match self {
            Self::Scalar(value) => *value,
            Self::Dense(matrix) => matrix[[index, index]],
        }
    }

    /// Computes `wᵀ Σ w`, the variance of predicted expression.
    pub fn quadratic_form(&self, weights: &Array1<f64>) -> f64 {
        match self {
            Self::Scalar(value) => (weights * *value).dot(weights),
            Self::Dense(matrix) => weights.dot(matrix).dot(weights),
        }
    }
}

/// Everything the calculation needs about one gene, already aligned on `valid_rsids`.
#[derive(Debug, Clone)]
pub struct GeneInput {
    pub gene: String,
    pub weights: WeightMap,
    pub beta_sets: BetaSets,
    pub covariance: CovarianceMatrix,
    pub valid_rsids: Vec<String>,
}

/// The outcome of scoring one gene.
///
/// `zscore` is `None` whenever no meaningful statistic exists; the `"NA"` text only
/// appears once the result is turned into a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreResult {
    pub zscore: Option<f64>,
    /// Number of SNPs that contributed a numerator term.
    pub n: usize,
    /// `wᵀ Σ w`, reported even when the z-score is unavailable.
    pub dot_product: f64,
}

impl ZScoreResult {
    pub fn not_available(dot_product: f64) -> Self {
        Self {
            zscore: None,
            n: 0,
            dot_product,
        }
    }

    /// Serializes to the `(zscore, n, var_g)` string triple consumed by result writers.
    pub fn to_record(&self) -> (String, String, String) {
        let zscore = match self.zscore {
            Some(value) => format_float(value),
            None => MISSING_VALUE.to_string(),
        };
        (zscore, self.n.to_string(), format_float(self.dot_product))
    }
}

/// Shortest round-trip text for a float.
///
/// Positional notation for decimal exponents in `-4..16`, otherwise scientific with a
/// signed, at least two-digit exponent (`2e-05`, `1e+16`).
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // `{:e}` yields the shortest round-trip digits with the decimal exponent split out.
    let scientific = format!("{value:e}");
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..16).contains(&exponent) {
        let mut buffer = ryu::Buffer::new();
        buffer.format_finite(value).to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}
