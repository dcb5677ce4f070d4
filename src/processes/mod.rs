pub mod umi_bin;
