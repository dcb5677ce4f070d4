//! Bin/cluster size ratio filter: compares the raw (pre-subsample) read
//! count assigned to a UMI against the cluster size encoded in its UmiId
//! string, to catch bins that absorbed far more reads than their originating
//! cluster could plausibly have produced.

use std::collections::HashMap;

use foldhash::fast::FixedState;

use super::interner::{CanonUmiSym, UmiInterner};
use super::orientation::OrientationStats;

type FoldMap<K, V> = HashMap<K, V, FixedState>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcrState {
    BcrOk,
    BcrFail,
}

#[derive(Debug, Clone, Copy)]
pub struct ClusterRatioStats {
    pub cluster_size: Option<u64>,
    pub bcr: Option<f64>,
    pub state: BcrState,
}

/// Classifies every canonical UMI present in `orientation_stats` (i.e. every
/// UMI that reached the orientation stage, regardless of its `ror_state`)
/// against the bin/cluster ratio threshold. `raw_n` is `plus_count +
/// neg_count`, the pre-subsample read total (§4.5: BCR uses raw counts, not
/// orientation survivors).
pub fn filter(orientation_stats: &FoldMap<CanonUmiSym, OrientationStats>, umi_interner: &UmiInterner, bin_cluster_ratio: f64) -> FoldMap<CanonUmiSym, ClusterRatioStats> {
    let mut out = FoldMap::default();

    for (&canon, stats) in orientation_stats {
        let raw_n = stats.plus_count + stats.neg_count;
        let cluster_size = parse_cluster_size(umi_interner.canon_str(canon));

        let (bcr, state) = match cluster_size {
            Some(size) if size > 0 => {
                let bcr = raw_n as f64 / size as f64;
                let state = if bcr <= bin_cluster_ratio { BcrState::BcrOk } else { BcrState::BcrFail };
                (Some(bcr), state)
            }
            _ => (None, BcrState::BcrFail),
        };

        out.insert(
            canon,
            ClusterRatioStats {
                cluster_size,
                bcr,
                state,
            },
        );
    }

    out
}

/// Extracts the cluster size from a UmiId string of the form
/// `<seq>;size=<N>;`, scanning for the `size=` marker rather than assuming a
/// fixed field position so trailing semicolons or extra annotations don't
/// break parsing.
fn parse_cluster_size(umi_id: &str) -> Option<u64> {
    let after = umi_id.split("size=").nth(1)?;
    let digits: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
