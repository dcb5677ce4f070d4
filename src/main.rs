use anyhow::Result;
use clap::{Parser, Subcommand};
use umi_binning_core::umi_bin::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    UmiBin(UmiBinArgs),
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Cli::parse();

    match args.command {
        Commands::UmiBin(cmd_args) => umi_bin_process(&cmd_args),
    }
}
