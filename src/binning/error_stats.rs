//! UMI mapping error filter: computes mean and standard deviation of the
//! combined edit distance across a UMI's orientation survivors, and
//! classifies whether they are within the allowed thresholds.

use std::collections::HashMap;

use foldhash::fast::FixedState;

use super::interner::{CanonUmiSym, ReadSym};

type FoldMap<K, V> = HashMap<K, V, FixedState>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UmeState {
    UmeOk,
    UmeFail,
}

#[derive(Debug, Clone, Copy)]
pub struct ErrorStats {
    pub n: u64,
    pub mean: f64,
    pub sd: f64,
    pub state: UmeState,
}

/// Computes per-canonical-UMI error stats from the orientation survivors.
/// UMIs with zero survivors (e.g. `rof_fail`) are absent from the result, so
/// the report writer renders their stats columns empty.
pub fn filter(survivors: &FoldMap<CanonUmiSym, Vec<(ReadSym, u32)>>, ume_mean_max: f64, ume_sd_max: f64) -> FoldMap<CanonUmiSym, ErrorStats> {
    let mut out = FoldMap::default();

    for (&canon, reads) in survivors {
        if reads.is_empty() {
            continue;
        }

        let n = reads.len() as u64;
        let sum: f64 = reads.iter().map(|(_, err)| *err as f64).sum();
        let sq: f64 = reads.iter().map(|(_, err)| (*err as f64).powi(2)).sum();

        let mean = sum / n as f64;
        let variance = (sq - sum * sum / n as f64) / n as f64;
        let sd = variance.max(0.0).sqrt();

        let state = if mean <= ume_mean_max && sd <= ume_sd_max {
            UmeState::UmeOk
        } else {
            UmeState::UmeFail
        };

        out.insert(canon, ErrorStats { n, mean, sd, state });
    }

    out
}
