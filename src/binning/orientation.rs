//! Orientation balance filter: groups resolved assignments by canonical
//! UmiId, classifies each UMI's plus/minus strand balance, and subsamples
//! survivors down to the computed per-strand caps.

use std::collections::HashMap;

use foldhash::fast::FixedState;
use string_interner::Symbol;

use super::interner::{CanonUmiSym, ReadSym, Strand, UmiInterner};
use super::resolver::Assignment;

type FoldMap<K, V> = HashMap<K, V, FixedState>;

/// A canonical UMI's orientation classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RorState {
    /// Balanced enough that every read is kept.
    RofOk,
    /// Imbalanced but within the allowed ratio; both strands are capped.
    RofSubset,
    /// Too imbalanced (one strand has zero or one read); no reads survive.
    RofFail,
}

/// Orientation stats for one canonical UMI, computed before any subsampling.
#[derive(Debug, Clone, Copy)]
pub struct OrientationStats {
    pub plus_count: u64,
    pub neg_count: u64,
    pub plus_cap: u64,
    pub neg_cap: u64,
    pub state: RorState,
}

impl OrientationStats {
    /// `read_max_plus` as defined in the report format: the cap plus the raw
    /// count observed on that same strand before subsampling.
    pub fn read_max_plus(&self) -> u64 {
        self.plus_cap + self.plus_count
    }
}

/// Classifies and subsamples assignments. Returns, per canonical UMI, its
/// [`OrientationStats`] and the surviving (read, raw umi err) pairs in
/// ascending ReadSym order (the iteration order used for deterministic
/// subsampling, preserved here since downstream stages also want it fixed).
pub fn filter(
    assignments: &FoldMap<ReadSym, Assignment>, umi_interner: &UmiInterner, ro_frac: f64, max_bin_size: u64,
) -> (FoldMap<CanonUmiSym, OrientationStats>, FoldMap<CanonUmiSym, Vec<(ReadSym, u32)>>) {
    let mut by_canon: FoldMap<CanonUmiSym, Vec<(ReadSym, Strand, u32)>> = FoldMap::default();

    let mut reads_in_order: Vec<ReadSym> = assignments.keys().copied().collect();
    reads_in_order.sort_by_key(|r| r.to_usize());

    for read in reads_in_order {
        let assignment = assignments[&read];
        let (canon, strand) = umi_interner.canonical(assignment.umi);
        by_canon.entry(canon).or_default().push((read, strand, assignment.combined_err));
    }

    let mut stats: FoldMap<CanonUmiSym, OrientationStats> = FoldMap::default();
    let mut survivors: FoldMap<CanonUmiSym, Vec<(ReadSym, u32)>> = FoldMap::default();

    for (canon, reads) in by_canon {
        let plus_count = reads.iter().filter(|(_, s, _)| *s == Strand::Plus).count() as u64;
        let neg_count = reads.iter().filter(|(_, s, _)| *s == Strand::Minus).count() as u64;

        let (state, plus_cap, neg_cap) = classify(plus_count, neg_count, ro_frac, max_bin_size);

        let mut plus_budget = plus_cap;
        let mut neg_budget = neg_cap;
        let mut kept = Vec::new();
        for (read, strand, err) in &reads {
            match strand {
                Strand::Plus => {
                    if plus_budget == 0 {
                        continue;
                    }
                    plus_budget -= 1;
                }
                Strand::Minus => {
                    if neg_budget == 0 {
                        continue;
                    }
                    neg_budget -= 1;
                }
            }
            kept.push((*read, *err));
        }

        stats.insert(
            canon,
            OrientationStats {
                plus_count,
                neg_count,
                plus_cap,
                neg_cap,
                state,
            },
        );
        survivors.insert(canon, kept);
    }

    (stats, survivors)
}

/// Classifies a UMI's balance and computes its per-strand caps.
///
/// - Fails if either strand has 0 or 1 reads.
/// - Otherwise: `rof_ok` if the minor strand's fraction of the total is at
///   least `ro_frac`, with both caps set to `max_bin_size`.
/// - Else `rof_subset`, with `cap = major * (1/ro_frac - 1)`, truncated
///   toward zero, applied to both strands.
fn classify(plus_count: u64, neg_count: u64, ro_frac: f64, max_bin_size: u64) -> (RorState, u64, u64) {
    if plus_count <= 1 || neg_count <= 1 {
        return (RorState::RofFail, 0, 0);
    }

    let total = (plus_count + neg_count) as f64;
    let minor = plus_count.min(neg_count) as f64;
    let minor_frac = minor / total;

    if minor_frac >= ro_frac {
        (RorState::RofOk, max_bin_size, max_bin_size)
    } else {
        let major = plus_count.max(neg_count) as f64;
        let cap = (major * (1.0 / ro_frac - 1.0)) as u64;
        (RorState::RofSubset, cap, cap)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::binning::interner::{RawUmiSym, ReadInterner};

    fn syms(umi_interner: &mut UmiInterner, raws: &[&str]) -> Vec<RawUmiSym> {
        raws.iter().map(|r| umi_interner.intern_raw(r)).collect()
    }

    #[test]
    fn balanced_umi_is_rof_ok_and_keeps_all_reads() {
        let mut umi_interner = UmiInterner::new();
        let raws = syms(&mut umi_interner, &["umi1;size=1;", "umi1;size=1;_rc"]);
        let (plus_umi, minus_umi) = (raws[0], raws[1]);

        let mut assignments: FoldMap<ReadSym, Assignment> = FoldMap::default();
        let mut read_interner = ReadInterner::new();
        for i in 0..3 {
            let read = read_interner.intern(&format!("read_p{i}"));
            assignments.insert(
                read,
                Assignment {
                    umi: plus_umi,
                    combined_err: 1,
                },
            );
        }
        for i in 0..3 {
            let read = read_interner.intern(&format!("read_n{i}"));
            assignments.insert(
                read,
                Assignment {
                    umi: minus_umi,
                    combined_err: 1,
                },
            );
        }

        let (stats, survivors) = filter(&assignments, &umi_interner, 0.5, 10_000);
        let (canon, _) = umi_interner.canonical(plus_umi);
        let s = stats[&canon];
        assert_eq!(s.state, RorState::RofOk);
        assert_eq!(s.plus_count, 3);
        assert_eq!(s.neg_count, 3);
        assert_eq!(survivors[&canon].len(), 6);
    }

    #[test]
    fn singleton_strand_fails_orientation() {
        let mut umi_interner = UmiInterner::new();
        let raws = syms(&mut umi_interner, &["umi1;size=1;", "umi1;size=1;_rc"]);
        let (plus_umi, minus_umi) = (raws[0], raws[1]);

        let mut assignments: FoldMap<ReadSym, Assignment> = FoldMap::default();
        let mut read_interner = ReadInterner::new();
        for i in 0..5 {
            let read = read_interner.intern(&format!("read_p{i}"));
            assignments.insert(
                read,
                Assignment {
                    umi: plus_umi,
                    combined_err: 1,
                },
            );
        }
        let read = read_interner.intern("read_n0");
        assignments.insert(
            read,
            Assignment {
                umi: minus_umi,
                combined_err: 1,
            },
        );

        let (stats, survivors) = filter(&assignments, &umi_interner, 0.5, 10_000);
        let (canon, _) = umi_interner.canonical(plus_umi);
        assert_eq!(stats[&canon].state, RorState::RofFail);
        assert!(survivors[&canon].is_empty());
    }

    #[test]
    fn imbalanced_umi_is_capped_not_failed() {
        let mut umi_interner = UmiInterner::new();
        let raws = syms(&mut umi_interner, &["umi1;size=1;", "umi1;size=1;_rc"]);
        let (plus_umi, minus_umi) = (raws[0], raws[1]);

        let mut assignments: FoldMap<ReadSym, Assignment> = FoldMap::default();
        let mut read_interner = ReadInterner::new();
        for i in 0..18 {
            let read = read_interner.intern(&format!("read_p{i}"));
            assignments.insert(
                read,
                Assignment {
                    umi: plus_umi,
                    combined_err: 1,
                },
            );
        }
        for i in 0..2 {
            let read = read_interner.intern(&format!("read_n{i}"));
            assignments.insert(
                read,
                Assignment {
                    umi: minus_umi,
                    combined_err: 1,
                },
            );
        }

        // minor_frac = 2/20 = 0.1 < ro_frac(0.3) -> rof_subset
        // cap = 18 * (1/0.3 - 1) = 18 * 2.3333... = 42 (u64 truncation)
        let (stats, _survivors) = filter(&assignments, &umi_interner, 0.3, 10_000);
        let (canon, _) = umi_interner.canonical(plus_umi);
        let s = stats[&canon];
        assert_eq!(s.state, RorState::RofSubset);
        assert_eq!(s.plus_cap, 42);
        assert_eq!(s.neg_cap, 42);
    }
}
