//! Two-sided candidate index: per UmiId, the set of ReadIds that aligned to
//! it on one end, each with its retained edit distance.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use foldhash::fast::FixedState;

use super::interner::{RawUmiSym, ReadInterner, ReadSym, UmiInterner};
use super::sam::SamHitReader;

type FoldMap<K, V> = HashMap<K, V, FixedState>;

/// Mapping from UmiId symbol to a mapping from ReadId symbol to the retained
/// edit distance, built from one SAM file.
pub struct CandidateIndex {
    by_umi: FoldMap<RawUmiSym, FoldMap<ReadSym, u32>>,
}

impl CandidateIndex {
    /// Streams `path` through a [`SamHitReader`], interning UmiIds and
    /// ReadIds and applying the retention rule: the first err recorded for a
    /// given (umi, read) pair wins. Since `SamHitReader` always yields a
    /// record's primary hit before its own secondary hits, and `entry(..).or_insert(..)`
    /// never overwrites an existing value, this single pass implements that
    /// rule exactly, regardless of how records or secondary hits are ordered
    /// relative to each other.
    pub fn build(path: &Path, umi_interner: &mut UmiInterner, read_interner: &mut ReadInterner) -> Result<Self> {
        let reader = SamHitReader::open(path)?;
        let mut by_umi: FoldMap<RawUmiSym, FoldMap<ReadSym, u32>> = FoldMap::default();

        for hit in reader {
            let umi_sym = umi_interner.intern_raw(&hit.umi);
            let read_sym = read_interner.intern(&hit.read);

            by_umi
                .entry(umi_sym)
                .or_insert_with(FoldMap::default)
                .entry(read_sym)
                .or_insert(hit.err);
        }

        Ok(CandidateIndex { by_umi })
    }

    /// Builds an index directly from already-parsed hits, applying the same
    /// first-err-wins retention rule as [`CandidateIndex::build`]. Used by
    /// tests elsewhere in this module that exercise downstream stages without
    /// going through the filesystem.
    #[cfg(test)]
    pub fn from_hits(hits: Vec<super::sam::HitRecord>, umi_interner: &mut UmiInterner, read_interner: &mut ReadInterner) -> Self {
        let mut by_umi: FoldMap<RawUmiSym, FoldMap<ReadSym, u32>> = FoldMap::default();
        for hit in hits {
            let umi_sym = umi_interner.intern_raw(&hit.umi);
            let read_sym = read_interner.intern(&hit.read);
            by_umi
                .entry(umi_sym)
                .or_insert_with(FoldMap::default)
                .entry(read_sym)
                .or_insert(hit.err);
        }
        CandidateIndex { by_umi }
    }

    pub fn get(&self, umi: RawUmiSym, read: ReadSym) -> Option<u32> {
        self.by_umi.get(&umi)?.get(&read).copied()
    }

    pub fn reads_for(&self, umi: RawUmiSym) -> Option<&FoldMap<ReadSym, u32>> {
        self.by_umi.get(&umi)
    }
}
