//! Intersects the two candidate indices and resolves, per read, the UmiId
//! with the lowest combined edit distance.

use std::collections::HashMap;

use foldhash::fast::FixedState;

use super::index::CandidateIndex;
use super::interner::{RawUmiSym, ReadSym, UmiInterner};

type FoldMap<K, V> = HashMap<K, V, FixedState>;

/// A read's surviving (umi, combined edit distance) proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub umi: RawUmiSym,
    pub combined_err: u32,
}

/// For each UmiId in `index1` and each of its reads with matching evidence in
/// `index2`, proposes an assignment and keeps the best (lowest combined
/// error) per read. Ties keep the first proposal seen, where "first" is
/// defined by iterating UmiIds in ascending, first-appearance symbol order
/// (see [`UmiInterner::raw_syms_in_order`]) so the outcome is reproducible
/// across runs regardless of hash map iteration order.
pub fn resolve(
    index1: &CandidateIndex, index2: &CandidateIndex, umi_interner: &UmiInterner, per_umi_max: u32, combined_max: u32,
) -> FoldMap<ReadSym, Assignment> {
    let mut best: FoldMap<ReadSym, Assignment> = FoldMap::default();

    for umi in umi_interner.raw_syms_in_order() {
        let Some(reads1) = index1.reads_for(umi) else { continue };

        for (&read, &e1) in reads1 {
            if e1 > per_umi_max {
                continue;
            }
            let Some(e2) = index2.get(umi, read) else { continue };
            if e2 > per_umi_max {
                continue;
            }
            let combined_err = e1 + e2;
            if combined_err > combined_max {
                continue;
            }

            best.entry(read)
                .and_modify(|cur| {
                    if combined_err < cur.combined_err {
                        *cur = Assignment { umi, combined_err };
                    }
                })
                .or_insert(Assignment { umi, combined_err });
        }
    }

    best
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::binning::interner::ReadInterner;
    use crate::binning::sam::HitRecord;

    fn build(hits: Vec<HitRecord>, umi_interner: &mut UmiInterner, read_interner: &mut ReadInterner) -> CandidateIndex {
        CandidateIndex::from_hits(hits, umi_interner, read_interner)
    }

    #[test]
    fn admits_read_with_evidence_on_both_ends() {
        let mut umi_interner = UmiInterner::new();
        let mut read_interner = ReadInterner::new();

        let idx1 = build(
            vec![HitRecord {
                umi: "umi1;size=1;".into(),
                read: "read_A".into(),
                err: 1,
            }],
            &mut umi_interner,
            &mut read_interner,
        );
        let idx2 = build(
            vec![HitRecord {
                umi: "umi1;size=1;".into(),
                read: "read_A".into(),
                err: 2,
            }],
            &mut umi_interner,
            &mut read_interner,
        );

        let assignments = resolve(&idx1, &idx2, &umi_interner, 3, 6);
        let read = read_interner.intern("read_A");
        assert_eq!(assignments.get(&read).unwrap().combined_err, 3);
    }

    #[test]
    fn skips_read_with_no_cross_end_evidence() {
        let mut umi_interner = UmiInterner::new();
        let mut read_interner = ReadInterner::new();

        let idx1 = build(
            vec![HitRecord {
                umi: "umi1;size=1;".into(),
                read: "read_A".into(),
                err: 1,
            }],
            &mut umi_interner,
            &mut read_interner,
        );
        let idx2 = build(Vec::new(), &mut umi_interner, &mut read_interner);

        let assignments = resolve(&idx1, &idx2, &umi_interner, 3, 6);
        assert!(assignments.is_empty());
    }

    #[test]
    fn rejects_over_threshold_reads() {
        let mut umi_interner = UmiInterner::new();
        let mut read_interner = ReadInterner::new();

        let idx1 = build(
            vec![HitRecord {
                umi: "umi1;size=1;".into(),
                read: "read_A".into(),
                err: 4,
            }],
            &mut umi_interner,
            &mut read_interner,
        );
        let idx2 = build(
            vec![HitRecord {
                umi: "umi1;size=1;".into(),
                read: "read_A".into(),
                err: 1,
            }],
            &mut umi_interner,
            &mut read_interner,
        );

        // e1=4 exceeds per_umi_max=3
        let assignments = resolve(&idx1, &idx2, &umi_interner, 3, 6);
        assert!(assignments.is_empty());
    }

    #[test]
    fn keeps_lowest_combined_error_across_conflicting_umis() {
        let mut umi_interner = UmiInterner::new();
        let mut read_interner = ReadInterner::new();

        let idx1 = build(
            vec![
                HitRecord {
                    umi: "umi_A;size=1;".into(),
                    read: "read_X".into(),
                    err: 1,
                },
                HitRecord {
                    umi: "umi_B;size=1;".into(),
                    read: "read_X".into(),
                    err: 2,
                },
            ],
            &mut umi_interner,
            &mut read_interner,
        );
        let idx2 = build(
            vec![
                HitRecord {
                    umi: "umi_A;size=1;".into(),
                    read: "read_X".into(),
                    err: 2,
                },
                HitRecord {
                    umi: "umi_B;size=1;".into(),
                    read: "read_X".into(),
                    err: 2,
                },
            ],
            &mut umi_interner,
            &mut read_interner,
        );

        let assignments = resolve(&idx1, &idx2, &umi_interner, 5, 10);
        let umi_a = umi_interner.intern_raw("umi_A;size=1;");
        let read = read_interner.intern("read_X");
        let won = assignments.get(&read).unwrap();
        assert_eq!(won.combined_err, 3);
        assert_eq!(won.umi, umi_a);
    }
}
