//! Compact integer symbols for the UmiId/ReadId strings streamed out of the
//! two SAM files, per the "string-keyed multi-maps" design note: candidate
//! maps are keyed by symbol, not by `String`, to avoid quadratic allocation
//! across tens of millions of hit records.

use foldhash::fast::FixedState;
use string_interner::{backend::StringBackend, StringInterner, Symbol};

type Backend = StringBackend<string_interner::symbol::SymbolU32>;

/// Symbol for a raw UmiId string, `_rc` suffix included if present.
pub type RawUmiSym = string_interner::symbol::SymbolU32;
/// Symbol for a canonical UmiId string (trailing `_rc` stripped).
pub type CanonUmiSym = string_interner::symbol::SymbolU32;
/// Symbol for a ReadId string.
pub type ReadSym = string_interner::symbol::SymbolU32;

/// Which strand a raw UmiId's `_rc` suffix implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    pub fn as_char(self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
        }
    }
}

/// Interns raw UmiId strings, splitting off the canonical form and strand
/// once per distinct raw string and caching the result.
pub struct UmiInterner {
    raw: StringInterner<Backend, FixedState>,
    canon: StringInterner<Backend, FixedState>,
    canon_of: Vec<(CanonUmiSym, Strand)>,
}

const RC_SUFFIX: &str = "_rc";

impl UmiInterner {
    pub fn new() -> Self {
        UmiInterner {
            raw: StringInterner::new(),
            canon: StringInterner::new(),
            canon_of: Vec::new(),
        }
    }

    /// Interns a raw UmiId, computing and caching its canonical form and
    /// strand the first time it is seen.
    pub fn intern_raw(&mut self, raw: &str) -> RawUmiSym {
        if let Some(sym) = self.raw.get(raw) {
            return sym;
        }

        let (canonical, strand) = split_canonical(raw);
        let canon_sym = self.canon.get_or_intern(canonical);
        let sym = self.raw.get_or_intern(raw);

        let index = sym.to_usize();
        if index >= self.canon_of.len() {
            self.canon_of.resize(index + 1, (canon_sym, Strand::Plus));
        }
        self.canon_of[index] = (canon_sym, strand);

        sym
    }

    /// Returns the canonical symbol and strand for a raw UmiId symbol.
    pub fn canonical(&self, raw: RawUmiSym) -> (CanonUmiSym, Strand) {
        self.canon_of[raw.to_usize()]
    }

    pub fn canon_str(&self, canon: CanonUmiSym) -> &str {
        self.canon.resolve(canon).expect("canonical symbol always resolves")
    }

    /// Iterates raw UmiId symbols in ascending, first-appearance order. This
    /// is the implementation's chosen deterministic total order over UMIs
    /// (see DESIGN.md), used to break resolver ties reproducibly.
    pub fn raw_syms_in_order(&self) -> impl Iterator<Item = RawUmiSym> + '_ {
        (0..self.raw.len()).map(|i| RawUmiSym::try_from_usize(i).expect("valid symbol index"))
    }
}

fn split_canonical(raw: &str) -> (&str, Strand) {
    match raw.strip_suffix(RC_SUFFIX) {
        Some(canonical) => (canonical, Strand::Minus),
        None => (raw, Strand::Plus),
    }
}

/// Interns ReadId strings. Shared across both SAM files so a read appearing
/// under the same id in both files resolves to the same symbol.
pub struct ReadInterner {
    inner: StringInterner<Backend, FixedState>,
}

impl ReadInterner {
    pub fn new() -> Self {
        ReadInterner {
            inner: StringInterner::new(),
        }
    }

    pub fn intern(&mut self, read: &str) -> ReadSym {
        self.inner.get_or_intern(read)
    }

    pub fn resolve(&self, sym: ReadSym) -> &str {
        self.inner.resolve(sym).expect("read symbol always resolves")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn canonicalizes_rc_suffix() {
        let mut interner = UmiInterner::new();
        let fwd = interner.intern_raw("umi1;size=4;");
        let rc = interner.intern_raw("umi1;size=4;_rc");

        let (canon_fwd, strand_fwd) = interner.canonical(fwd);
        let (canon_rc, strand_rc) = interner.canonical(rc);

        assert_eq!(canon_fwd, canon_rc);
        assert_eq!(strand_fwd, Strand::Plus);
        assert_eq!(strand_rc, Strand::Minus);
        assert_eq!(interner.canon_str(canon_fwd), "umi1;size=4;");
    }

    #[test]
    fn distinct_umis_get_distinct_canonical_symbols() {
        let mut interner = UmiInterner::new();
        let a = interner.intern_raw("umi1;size=1;");
        let b = interner.intern_raw("umi2;size=1;");
        assert_ne!(interner.canonical(a).0, interner.canonical(b).0);
    }

    #[test]
    fn reinterning_is_idempotent() {
        let mut interner = UmiInterner::new();
        let a = interner.intern_raw("umi1;size=1;");
        let b = interner.intern_raw("umi1;size=1;");
        assert_eq!(a, b);
    }
}
