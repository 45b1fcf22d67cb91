use anyhow::Result;
use cbiscraper::{
    dirs::DataDirs,
    page::InflationPage,
    table::CleanTable,
    years,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) configure dirs ───────────────────────────────────────────
    let dirs = DataDirs::from_env();
    dirs.ensure_raw()?;

    // ─── 3) open the inflation page ──────────────────────────────────
    let client = reqwest::Client::builder().cookie_store(true).build()?;
    let mut page = InflationPage::open(client).await?;

    // ─── 4) selectable years ─────────────────────────────────────────
    let year_options = page.snapshot().selectable_years()?;
    years::write_years_csv(&dirs.years_csv(), &year_options)?;
    info!("{} selectable years", year_options.len());

    // ─── 5) annual inflation table ───────────────────────────────────
    info!("getting annual inflation table");
    let annual = CleanTable::from_raw(&page.snapshot().annual_table()?)?;
    annual.write_csv(&dirs.annual_csv())?;

    // ─── 6) monthly tables for missing years ─────────────────────────
    let codes: Vec<i64> = year_options.iter().map(|y| y.code).collect();
    let fetched = years::fetched_years(&dirs.monthly_tables())?;
    let plan = years::missing_years(&codes, &fetched);
    info!("{} monthly tables to fetch", plan.len());

    for year in plan {
        page.select_year(year).await?;
        if page.snapshot().has_no_data_marker() {
            info!(year, "no monthly data published; skipping");
            continue;
        }
        info!(year, "getting monthly inflation table");
        let monthly = CleanTable::from_raw(&page.snapshot().monthly_table()?)?;
        monthly.write_csv(&dirs.monthly_csv(year))?;
    }

    info!("all done");
    Ok(())
}
