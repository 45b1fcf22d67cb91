// src/bin/merge.rs
//
// Merge stage: consolidate the raw per-year artifacts written by the scrape
// stage into `merged_data/annual_table.csv` and `merged_data/monthly_table.csv`.
// Both outputs are fully regenerated on every run.

use anyhow::Result;
use cbiscraper::{dirs::DataDirs, merge};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let dirs = DataDirs::from_env();
    dirs.ensure_merged()?;

    let annual = merge::annual_table(&dirs)?;
    merge::write_annual_csv(&dirs.merged_annual_csv(), &annual)?;
    info!("merged {} annual rows", annual.len());

    let monthly = merge::monthly_table(&dirs)?;
    merge::write_monthly_csv(&dirs.merged_monthly_csv(), &monthly)?;
    info!("merged {} monthly rows", monthly.len());

    Ok(())
}
