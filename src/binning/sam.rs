//! Streaming reader over one UMI-reference SAM file, grounded on the
//! tab-split-and-scan-tags parsing style used elsewhere in this ecosystem for
//! hand-rolled SAM records (see e.g. Polypolish's `Alignment::new`): split on
//! tabs, take the fixed columns positionally, then scan the optional `TAG:TYPE:VALUE`
//! fields for the two tags this pipeline stage cares about.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// One (umi, read, edit distance) observation, either a record's primary
/// alignment or one of its forward-strand secondary hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitRecord {
    pub umi: String,
    pub read: String,
    pub err: u32,
}

/// Iterates the primary and qualifying secondary hits of a SAM file, skipping
/// header lines and malformed records. See §4.1: a record with fewer than 11
/// tab-separated fields, or with no `NM:i:` tag, is dropped silently (a
/// `warn!` is logged with the file and line number, but the run continues).
pub struct SamHitReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    pending: VecDeque<HitRecord>,
}

impl SamHitReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("cannot open SAM file '{}'", path.display()))?;
        Ok(SamHitReader {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
            pending: VecDeque::new(),
        })
    }
}

impl Iterator for SamHitReader {
    type Item = HitRecord;

    fn next(&mut self) -> Option<HitRecord> {
        if let Some(hit) = self.pending.pop_front() {
            return Some(hit);
        }

        loop {
            let line = self.lines.next()?;
            self.line_no += 1;

            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("{}:{}: failed to read line: {e}", self.path.display(), self.line_no);
                    continue;
                }
            };

            if line.is_empty() || line.starts_with('@') {
                continue;
            }

            match parse_record(&line) {
                Some((primary, secondaries)) => {
                    self.pending.extend(secondaries);
                    return Some(primary);
                }
                None => {
                    log::warn!("{}:{}: skipping malformed SAM record", self.path.display(), self.line_no);
                    continue;
                }
            }
        }
    }
}

/// Parses one data line into its primary hit plus any forward-strand
/// secondary hits from `XA:Z:`. Returns `None` if the record is malformed
/// (too few columns or no `NM:i:` tag).
fn parse_record(line: &str) -> Option<(HitRecord, Vec<HitRecord>)> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 11 {
        return None;
    }

    let qname = fields[0];
    let rname = fields[2];

    let mut nm = None;
    let mut xa = None;
    for tag in &fields[11..] {
        if let Some(value) = tag.strip_prefix("NM:i:") {
            nm = value.parse::<u32>().ok();
        } else if let Some(value) = tag.strip_prefix("XA:Z:") {
            xa = Some(value);
        }
    }

    let err = nm?;
    let primary = HitRecord {
        umi: qname.to_string(),
        read: rname.to_string(),
        err,
    };

    let secondaries = xa.map(|xa| parse_secondary_hits(qname, xa)).unwrap_or_default();

    Some((primary, secondaries))
}

/// Parses an `XA:Z:` value into forward-strand secondary `HitRecord`s. Each
/// `;`-terminated item is `ref,pos,cigar,nm`; only items whose `pos` begins
/// with `'+'` are kept (§9: this encodes "forward-strand mapping of UMI onto
/// read", preserved exactly rather than reinterpreted).
fn parse_secondary_hits(umi: &str, xa: &str) -> Vec<HitRecord> {
    let mut hits = Vec::new();
    for item in xa.split(';') {
        if item.is_empty() {
            continue;
        }
        let parts: Vec<&str> = item.split(',').collect();
        if parts.len() < 4 {
            continue;
        }
        let (ref_name, pos, _cigar, nm) = (parts[0], parts[1], parts[2], parts[3]);
        let Some(strand) = pos.chars().next() else { continue };
        if strand != '+' {
            continue;
        }
        let Ok(err) = nm.parse::<u32>() else { continue };
        hits.push(HitRecord {
            umi: umi.to_string(),
            read: ref_name.to_string(),
            err,
        });
    }
    hits
}
