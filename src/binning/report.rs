//! Combines the three filter stages' outputs into one row per canonical
//! UmiId and writes the two output tables.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use foldhash::fast::FixedState;

use super::cluster_ratio::{BcrState, ClusterRatioStats};
use super::error_stats::{ErrorStats, UmeState};
use super::interner::{CanonUmiSym, ReadInterner, ReadSym, UmiInterner};
use super::orientation::{OrientationStats, RorState};

type FoldMap<K, V> = HashMap<K, V, FixedState>;

/// One row's worth of aggregated per-UMI statistics, per the data model's
/// `BinStats` entity. Fields absent because a stage was never reached (e.g.
/// `error` for a `rof_fail` UMI) are `None` and rendered as empty columns.
pub struct BinStats {
    pub orientation: OrientationStats,
    pub error: Option<ErrorStats>,
    pub cluster_ratio: ClusterRatioStats,
}

impl BinStats {
    fn emits(&self) -> bool {
        self.orientation.state == RorState::RofOk
            && self.error.map(|e| e.state == UmeState::UmeOk).unwrap_or(false)
            && self.cluster_ratio.state == BcrState::BcrOk
    }
}

/// Assembles one `BinStats` per canonical UMI that reached the orientation
/// stage (i.e. has at least one row in `orientation_stats`).
pub fn assemble(
    orientation_stats: &FoldMap<CanonUmiSym, OrientationStats>, error_stats: &FoldMap<CanonUmiSym, ErrorStats>,
    cluster_ratio_stats: &FoldMap<CanonUmiSym, ClusterRatioStats>,
) -> FoldMap<CanonUmiSym, BinStats> {
    let mut out = FoldMap::default();
    for (&canon, &orientation) in orientation_stats {
        let error = error_stats.get(&canon).copied();
        let cluster_ratio = cluster_ratio_stats[&canon];
        out.insert(
            canon,
            BinStats {
                orientation,
                error,
                cluster_ratio,
            },
        );
    }
    out
}

/// Writes `umi_binning_stats.txt` and `umi_bin_map.txt` into `output_dir`.
/// Rows in both files are ordered by ascending lexicographic canonical UmiId,
/// and within a UMI's bin-map rows, by ascending ReadId symbol — the fixed
/// determinism convention documented in DESIGN.md.
pub fn write_reports(
    output_dir: &Path, stats: &FoldMap<CanonUmiSym, BinStats>, survivors: &FoldMap<CanonUmiSym, Vec<(ReadSym, u32)>>, umi_interner: &UmiInterner,
    read_interner: &ReadInterner,
) -> Result<()> {
    let mut ordered: Vec<(&str, CanonUmiSym)> = stats.keys().map(|&canon| (umi_interner.canon_str(canon), canon)).collect();
    ordered.sort_by_key(|(name, _)| name.to_string());

    write_stats_table(output_dir, &ordered, stats, survivors)?;
    write_bin_map(output_dir, &ordered, stats, survivors, read_interner)?;
    Ok(())
}

fn write_stats_table(output_dir: &Path, ordered: &[(&str, CanonUmiSym)], stats: &FoldMap<CanonUmiSym, BinStats>, survivors: &FoldMap<CanonUmiSym, Vec<(ReadSym, u32)>>) -> Result<()> {
    let path = output_dir.join("umi_binning_stats.txt");
    let file = File::create(&path).with_context(|| format!("cannot create '{}'", path.display()))?;
    let mut w = BufWriter::new(file);

    writeln!(
        w,
        "umi_name read_n_raw read_n_filt read_n_plus read_n_neg read_max_plus read_max_neg read_orientation_ratio ror_filter umi_match_error_mean umi_match_error_sd ume_filter bin_cluster_ratio bcr_filter"
    )?;

    for &(name, canon) in ordered {
        let s = &stats[&canon];
        let o = &s.orientation;
        let read_n_raw = o.plus_count + o.neg_count;
        let read_n_filt = survivors.get(&canon).map(|v| v.len() as u64).unwrap_or(0);
        let total = read_n_raw as f64;
        let orientation_ratio = if total > 0.0 { (o.plus_count.min(o.neg_count) as f64) / total } else { 0.0 };

        let (ume_mean, ume_sd, ume_filter) = match s.error {
            Some(e) => (fmt_f64(e.mean), fmt_f64(e.sd), filter_label(e.state == UmeState::UmeOk)),
            None => (String::new(), String::new(), String::new()),
        };
        let bcr_field = s.cluster_ratio.bcr.map(fmt_f64).unwrap_or_default();

        writeln!(
            w,
            "{name} {read_n_raw} {read_n_filt} {plus} {neg} {max_plus} {max_neg} {ratio} {ror} {ume_mean} {ume_sd} {ume_filter} {bcr} {bcr_filter}",
            name = name,
            read_n_raw = read_n_raw,
            read_n_filt = read_n_filt,
            plus = o.plus_count,
            neg = o.neg_count,
            max_plus = o.read_max_plus(),
            max_neg = o.neg_cap + o.neg_count,
            ratio = fmt_f64(orientation_ratio),
            ror = ror_label(o.state),
            ume_mean = ume_mean,
            ume_sd = ume_sd,
            ume_filter = ume_filter,
            bcr = bcr_field,
            bcr_filter = filter_label(s.cluster_ratio.state == BcrState::BcrOk),
        )?;
    }

    Ok(())
}

fn write_bin_map(
    output_dir: &Path, ordered: &[(&str, CanonUmiSym)], stats: &FoldMap<CanonUmiSym, BinStats>, survivors: &FoldMap<CanonUmiSym, Vec<(ReadSym, u32)>>,
    read_interner: &ReadInterner,
) -> Result<()> {
    let path = output_dir.join("umi_bin_map.txt");
    let file = File::create(&path).with_context(|| format!("cannot create '{}'", path.display()))?;
    let mut w = BufWriter::new(file);

    for &(name, canon) in ordered {
        if !stats[&canon].emits() {
            continue;
        }
        let Some(reads) = survivors.get(&canon) else { continue };
        let mut rows: Vec<(ReadSym, u32)> = reads.clone();
        rows.sort_by_key(|(read, _)| string_interner::Symbol::to_usize(*read));

        for (read, err) in rows {
            writeln!(w, "{} {} {}", name, read_interner.resolve(read), err)?;
        }
    }

    Ok(())
}

fn ror_label(state: RorState) -> &'static str {
    match state {
        RorState::RofOk => "rof_ok",
        RorState::RofSubset => "rof_subset",
        RorState::RofFail => "rof_fail",
    }
}

fn filter_label(ok: bool) -> String {
    if ok {
        "ok".to_string()
    } else {
        "fail".to_string()
    }
}

fn fmt_f64(v: f64) -> String {
    format!("{v:.4}")
}
