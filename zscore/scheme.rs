// ========================================================================================
//
//                              Z-score scheme selection
//
// ========================================================================================
//
// The four schemes differ along two independent axes: which beta statistic feeds the
// numerator, and where each SNP's standard deviation comes from. `Scheme` is the closed
// set of named combinations; `SchemeConfig` is what the calculation actually consumes.

use crate::types::{BETA_SET, BETA_Z_SET};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemeError {
    #[error("Unknown zscore scheme '{0}'. Expected one of: beta_z, beta_z_and_ref, metaxcan, metaxcan_from_reference.")]
    Unknown(String),
}

/// Which beta statistic a scheme reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetaSource {
    /// Raw effect sizes; the numerator scales them by the SNP variance.
    Raw,
    /// Z-transformed effect sizes; the numerator scales them by the standard deviation.
    ZTransformed,
}

impl BetaSource {
    pub fn set_name(self) -> &'static str {
        match self {
            Self::Raw => BETA_SET,
            Self::ZTransformed => BETA_Z_SET,
        }
    }

    /// The numerator contribution of one SNP with model weight `weight`, beta `beta`
    /// and standard deviation `sigma`.
    #[inline]
    pub fn term(self, weight: f64, beta: f64, sigma: f64) -> f64 {
        match self {
            Self::Raw => weight * beta * sigma.powi(2),
            Self::ZTransformed => weight * beta * sigma,
        }
    }
}

/// Where a scheme takes each SNP's standard deviation from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarianceSource {
    /// The `sigma_l` statistic set carried with the betas.
    LocalSigma,
    /// The square root of an external reference-panel variance.
    Reference,
}

/// The configuration record driving the shared scoring algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeConfig {
    pub beta_source: BetaSource,
    pub variance_source: VarianceSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scheme {
    BetaZ,
    BetaZAndRef,
    MetaXcan,
    MetaXcanFromReference,
}

impl Scheme {
    pub const ALL: [Scheme; 4] = [
        Scheme::BetaZ,
        Scheme::BetaZAndRef,
        Scheme::MetaXcan,
        Scheme::MetaXcanFromReference,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::BetaZ => "beta_z",
            Self::BetaZAndRef => "beta_z_and_ref",
            Self::MetaXcan => "metaxcan",
            Self::MetaXcanFromReference => "metaxcan_from_reference",
        }
    }

    pub fn config(self) -> SchemeConfig {
        let (beta_source, variance_source) = match self {
            Self::BetaZ => (BetaSource::ZTransformed, VarianceSource::LocalSigma),
            Self::BetaZAndRef => (BetaSource::ZTransformed, VarianceSource::Reference),
            Self::MetaXcan => (BetaSource::Raw, VarianceSource::LocalSigma),
            Self::MetaXcanFromReference => (BetaSource::Raw, VarianceSource::Reference),
        };
        SchemeConfig {
            beta_source,
            variance_source,
        }
    }

    /// The named scheme behind a configuration record. Every axis combination has one.
    pub fn from_config(config: SchemeConfig) -> Self {
        match (config.beta_source, config.variance_source) {
            (BetaSource::ZTransformed, VarianceSource::LocalSigma) => Self::BetaZ,
            (BetaSource::ZTransformed, VarianceSource::Reference) => Self::BetaZAndRef,
            (BetaSource::Raw, VarianceSource::LocalSigma) => Self::MetaXcan,
            (BetaSource::Raw, VarianceSource::Reference) => Self::MetaXcanFromReference,
        }
    }

    pub fn needs_reference(self) -> bool {
        self.config().variance_source == VarianceSource::Reference
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scheme {
    type Err = SchemeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Scheme::ALL
            .into_iter()
            .find(|scheme| scheme.name() == name)
            .ok_or_else(|| SchemeError::Unknown(name.to_string()))
    }
}

impl TryFrom<String> for Scheme {
    type Error = SchemeError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<Scheme> for String {
    fn from(scheme: Scheme) -> Self {
        scheme.name().to_string()
    }
}

/// Resolves a scheme name into the configuration record used by the calculation.
pub fn resolve_scheme(name: &str) -> Result<SchemeConfig, SchemeError> {
    name.parse::<Scheme>().map(Scheme::config)
}
