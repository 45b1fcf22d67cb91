// src/years.rs

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::page::YearOption;

/// Write the selectable years exactly as presented by the site: a
/// `Value,Year` header (emitted even when there are no years), then one
/// record per dropdown entry with the postback code and the label.
pub fn write_years_csv(path: &Path, years: &[YearOption]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {:?}", path))?;
    wtr.write_record(["Value", "Year"])?;
    for year in years {
        wtr.write_record([year.code.to_string(), year.label.clone()])?;
    }
    wtr.flush().with_context(|| format!("flushing {:?}", path))?;
    Ok(())
}

/// Years that already have a `monthly_tables/<year>.csv` artifact on disk.
pub fn fetched_years(monthly_dir: &Path) -> Result<HashSet<i64>> {
    let mut years = HashSet::new();
    let entries =
        fs::read_dir(monthly_dir).with_context(|| format!("reading {:?}", monthly_dir))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if let Ok(year) = stem.parse::<i64>() {
                years.insert(year);
            }
        }
    }
    Ok(years)
}

/// Fetch plan: every not-yet-fetched year except the newest, in presented
/// order, then the newest unconditionally. The site revises the current
/// year's table in place, so it is always refreshed.
pub fn missing_years(all: &[i64], fetched: &HashSet<i64>) -> Vec<i64> {
    let Some((&current, earlier)) = all.split_last() else {
        return Vec::new();
    };
    let mut plan: Vec<i64> = earlier
        .iter()
        .copied()
        .filter(|year| !fetched.contains(year))
        .collect();
    plan.push(current);
    plan
}
