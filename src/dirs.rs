// src/dirs.rs

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Filesystem layout shared by both stages. Built once in each entry point
/// and passed by reference into every operation; nothing else holds paths.
///
/// ```text
/// <root>/raw_data/years.csv
/// <root>/raw_data/annual.csv
/// <root>/raw_data/monthly_tables/<year>.csv
/// <root>/merged_data/annual_table.csv
/// <root>/merged_data/monthly_table.csv
/// ```
#[derive(Debug, Clone)]
pub struct DataDirs {
    root: PathBuf,
}

impl DataDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default layout under `data/`, overridable via `CBISCRAPER_DATA_DIR`.
    pub fn from_env() -> Self {
        match std::env::var_os("CBISCRAPER_DATA_DIR") {
            Some(dir) => Self::new(dir),
            None => Self::new("data"),
        }
    }

    pub fn raw_data(&self) -> PathBuf {
        self.root.join("raw_data")
    }

    pub fn monthly_tables(&self) -> PathBuf {
        self.raw_data().join("monthly_tables")
    }

    pub fn merged_data(&self) -> PathBuf {
        self.root.join("merged_data")
    }

    pub fn years_csv(&self) -> PathBuf {
        self.raw_data().join("years.csv")
    }

    pub fn annual_csv(&self) -> PathBuf {
        self.raw_data().join("annual.csv")
    }

    pub fn monthly_csv(&self, year: i64) -> PathBuf {
        self.monthly_tables().join(format!("{}.csv", year))
    }

    pub fn merged_annual_csv(&self) -> PathBuf {
        self.merged_data().join("annual_table.csv")
    }

    pub fn merged_monthly_csv(&self) -> PathBuf {
        self.merged_data().join("monthly_table.csv")
    }

    /// Create the raw-artifact directories (scrape stage).
    pub fn ensure_raw(&self) -> Result<()> {
        let dir = self.monthly_tables();
        fs::create_dir_all(&dir).with_context(|| format!("creating raw data directory {:?}", dir))
    }

    /// Create the merged-output directory (merge stage).
    pub fn ensure_merged(&self) -> Result<()> {
        let dir = self.merged_data();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating merged data directory {:?}", dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted() {
        let dirs = DataDirs::new("data");
        assert_eq!(dirs.years_csv(), PathBuf::from("data/raw_data/years.csv"));
        assert_eq!(
            dirs.monthly_csv(1402),
            PathBuf::from("data/raw_data/monthly_tables/1402.csv")
        );
        assert_eq!(
            dirs.merged_monthly_csv(),
            PathBuf::from("data/merged_data/monthly_table.csv")
        );
    }

    #[test]
    fn ensure_creates_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = DataDirs::new(tmp.path());
        dirs.ensure_raw().unwrap();
        dirs.ensure_merged().unwrap();
        assert!(dirs.monthly_tables().is_dir());
        assert!(dirs.merged_data().is_dir());
    }
}
