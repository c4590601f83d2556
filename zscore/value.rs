// ========================================================================================
//
//                              Statistic value access
//
// ========================================================================================

use crate::types::{MISSING_VALUE, StatisticSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("Value '{value}' for rsid {rsid} in {set} is neither 'NA' nor a number.")]
    Malformed {
        set: String,
        rsid: String,
        value: String,
    },
}

/// Reads the numeric value of `rsid` from `set`.
///
/// Absent SNPs and the missing sentinel are ordinary coverage gaps and yield `Ok(None)`.
pub fn get_value(set: &StatisticSet, rsid: &str) -> Result<Option<f64>, ValueError> {
    let Some(raw) = set.values_by_key.get(rsid) else {
        log::trace!("rsid {rsid} not in {}", set.label());
        return Ok(None);
    };
    if raw == MISSING_VALUE {
        log::trace!("rsid {rsid} doesn't have a value for {}", set.label());
        return Ok(None);
    }
    raw.trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ValueError::Malformed {
            set: set.label().to_string(),
            rsid: rsid.to_string(),
            value: raw.clone(),
        })
}
