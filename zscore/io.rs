// ========================================================================================
//
//                           Gene bundle input & result output
//
// ========================================================================================
//
// A gene bundle is a TOML document holding genes whose weights, statistics and
// covariance have already been matched to a common SNP order upstream:
//
//   [reference_variances]
//   rs1 = 0.81
//
//   [[genes]]
//   gene = "ENSG00000000001"
//   valid_rsids = ["rs1", "rs2"]
//   covariance = [[1.0, 0.2], [0.2, 1.0]]    # or a single number for one SNP
//   weights = { rs1 = 0.5, rs2 = 0.3 }
//   beta_sets.beta_z.values_by_key = { rs1 = "1.0", rs2 = "NA" }
//
// Results go out as tab-separated `gene zscore n var_g` rows.

use crate::batch::GeneRecord;
use crate::calculation::ZScoreError;
use crate::scheme::Scheme;
use crate::types::{
    BetaSets, CovarianceMatrix, GeneInput, ReferenceVariances, WeightEntry, WeightMap,
};
use ndarray::Array2;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Failed to read gene bundle: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML gene bundle: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Gene {gene}: covariance row {row} has {found} columns, expected {expected}.")]
    RaggedCovariance {
        gene: String,
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("Covariance matrix has an invalid shape: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
    #[error("Failed to write results: {0}")]
    CsvError(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CovarianceSpec {
    Scalar(f64),
    Rows(Vec<Vec<f64>>),
}

#[derive(Debug, Deserialize)]
struct GeneSpec {
    gene: String,
    valid_rsids: Vec<String>,
    covariance: CovarianceSpec,
    weights: HashMap<String, f64>,
    #[serde(default)]
    beta_sets: BetaSets,
}

#[derive(Debug, Deserialize)]
struct BundleSpec {
    #[serde(default)]
    reference_variances: Option<ReferenceVariances>,
    #[serde(default)]
    genes: Vec<GeneSpec>,
}

/// The in-memory inputs of a scoring run.
#[derive(Debug, Clone)]
pub struct GeneBundle {
    pub genes: Vec<GeneInput>,
    pub reference_variances: Option<ReferenceVariances>,
}

impl GeneBundle {
    pub fn from_toml_str(text: &str) -> Result<Self, BundleError> {
        let spec: BundleSpec = toml::from_str(text)?;
        let genes = spec
            .genes
            .into_iter()
            .map(GeneSpec::into_input)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            genes,
            reference_variances: spec.reference_variances,
        })
    }

    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Fails once for the whole run when `scheme` reads reference variances the bundle lacks.
    pub fn check_scheme(&self, scheme: Scheme) -> Result<(), ZScoreError> {
        if scheme.needs_reference() && self.reference_variances.is_none() {
            return Err(ZScoreError::ReferenceVariancesRequired { scheme });
        }
        Ok(())
    }
}

impl GeneSpec {
    fn into_input(self) -> Result<GeneInput, BundleError> {
        let covariance = match self.covariance {
            CovarianceSpec::Scalar(value) => CovarianceMatrix::Scalar(value),
            CovarianceSpec::Rows(rows) => {
                CovarianceMatrix::Dense(rows_to_array(&self.gene, rows)?)
            }
        };
        let weights: WeightMap = self
            .weights
            .into_iter()
            .map(|(rsid, weight)| (rsid.clone(), WeightEntry { rsid, weight }))
            .collect();
        Ok(GeneInput {
            gene: self.gene,
            weights,
            beta_sets: self.beta_sets,
            covariance,
            valid_rsids: self.valid_rsids,
        })
    }
}

fn rows_to_array(gene: &str, rows: Vec<Vec<f64>>) -> Result<Array2<f64>, BundleError> {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, Vec::len);
    let mut data = Vec::with_capacity(nrows * ncols);
    for (row, values) in rows.into_iter().enumerate() {
        if values.len() != ncols {
            return Err(BundleError::RaggedCovariance {
                gene: gene.to_string(),
                row,
                found: values.len(),
                expected: ncols,
            });
        }
        data.extend(values);
    }
    Ok(Array2::from_shape_vec((nrows, ncols), data)?)
}

/// Writes one tab-separated row per record, preceded by a header.
pub fn write_results<W: Write>(writer: W, records: &[GeneRecord]) -> Result<(), BundleError> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    out.write_record(["gene", "zscore", "n", "var_g"])?;
    for record in records {
        let (zscore, n, var_g) = record.result.to_record();
        out.write_record([
            record.gene.as_str(),
            zscore.as_str(),
            n.as_str(),
            var_g.as_str(),
        ])?;
    }
    out.flush()?;
    Ok(())
}
