const MODULE: &str = module_path!();

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::binning::interner::{ReadInterner, UmiInterner};
use crate::binning::{cluster_ratio, error_stats, index::CandidateIndex, orientation, report, resolver, UmiBinConfig};

#[derive(Args, Debug)]
pub struct UmiBinArgs {
    /// Directory containing `read_binning/umi1_map.sam` and
    /// `read_binning/umi2_map.sam` as input. `umi_binning_stats.txt` and
    /// `umi_bin_map.txt` are written alongside (directly in this directory).
    output_dir: PathBuf,

    #[arg(long)]
    /// Maximum per-end edit distance for a candidate hit to be considered.
    per_umi_max: u32,

    #[arg(long)]
    /// Maximum combined (both-end) edit distance for a resolved assignment.
    combined_max: u32,

    #[arg(long, value_parser = validate_ro_frac)]
    /// Minimum fraction the minor strand must hold of a UMI's total reads to
    /// be considered balanced. Must be in (0, 0.5].
    ro_frac: f64,

    #[arg(long, default_value_t = 10_000)]
    /// Per-strand read cap applied once a UMI is classified as balanced.
    max_bin_size: u64,

    #[arg(long)]
    /// Maximum allowed mean combined edit distance across a UMI's surviving
    /// reads.
    ume_mean_max: f64,

    #[arg(long)]
    /// Maximum allowed standard deviation of combined edit distance across a
    /// UMI's surviving reads.
    ume_sd_max: f64,

    #[arg(long, default_value_t = 10.0)]
    /// Maximum allowed ratio of raw read count to cluster size.
    bin_cluster_ratio: f64,
}

/// Validates that `ro_frac` lies in `(0, 0.5]`: a minor-strand fraction above
/// 0.5 is not meaningful (the "minor" strand can never exceed half the
/// total), and zero would mean every UMI is `rof_fail` or unbounded.
fn validate_ro_frac(value: &str) -> Result<f64, String> {
    let parsed = value.parse::<f64>().map_err(|_| format!("`{value}` is not a valid number."))?;
    if parsed > 0.0 && parsed <= 0.5 {
        Ok(parsed)
    } else {
        Err(format!("ro-frac must be in (0, 0.5], but {parsed} was provided."))
    }
}

pub fn umi_bin_process(args: &UmiBinArgs) -> Result<()> {
    let config = UmiBinConfig {
        per_umi_max: args.per_umi_max,
        combined_max: args.combined_max,
        ro_frac: args.ro_frac,
        max_bin_size: args.max_bin_size,
        ume_mean_max: args.ume_mean_max,
        ume_sd_max: args.ume_sd_max,
        bin_cluster_ratio: args.bin_cluster_ratio,
    };

    let read_binning_dir = args.output_dir.join("read_binning");
    let umi1_sam = read_binning_dir.join("umi1_map.sam");
    let umi2_sam = read_binning_dir.join("umi2_map.sam");

    let mut umi_interner = UmiInterner::new();
    let mut read_interner = ReadInterner::new();

    log::info!("{MODULE}: loading UMI1 candidate index from '{}'", umi1_sam.display());
    let index1 = CandidateIndex::build(&umi1_sam, &mut umi_interner, &mut read_interner)?;

    log::info!("{MODULE}: loading UMI2 candidate index from '{}'", umi2_sam.display());
    let index2 = CandidateIndex::build(&umi2_sam, &mut umi_interner, &mut read_interner)?;

    log::info!("{MODULE}: resolving per-read UMI assignment");
    let assignments = resolver::resolve(&index1, &index2, &umi_interner, config.per_umi_max, config.combined_max);

    log::info!("{MODULE}: applying orientation balance filter");
    let (orientation_stats, survivors) = orientation::filter(&assignments, &umi_interner, config.ro_frac, config.max_bin_size);

    log::info!("{MODULE}: applying UMI match error filter");
    let error_stats = error_stats::filter(&survivors, config.ume_mean_max, config.ume_sd_max);

    log::info!("{MODULE}: applying bin/cluster ratio filter");
    let cluster_ratio_stats = cluster_ratio::filter(&orientation_stats, &umi_interner, config.bin_cluster_ratio);

    let bin_stats = report::assemble(&orientation_stats, &error_stats, &cluster_ratio_stats);

    log::info!("{MODULE}: writing reports to '{}'", args.output_dir.display());
    report::write_reports(&args.output_dir, &bin_stats, &survivors, &umi_interner, &read_interner)
        .with_context(|| format!("failed writing reports to '{}'", args.output_dir.display()))?;

    Ok(())
}
