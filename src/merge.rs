// src/merge.rs

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::calendar;
use crate::dirs::DataDirs;

/// A merged annual row, keyed by Jalali year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualRow {
    #[serde(rename = "Year")]
    pub year: i64,
    #[serde(rename = "CPI")]
    pub cpi: Option<f64>,
    #[serde(rename = "Annual_Inflation")]
    pub annual_inflation: Option<f64>,
}

/// A merged monthly row, keyed by (Jalali year, month ordinal).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRow {
    #[serde(rename = "Year")]
    pub year: i64,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "CPI")]
    pub cpi: Option<f64>,
    #[serde(rename = "Annual_Inflation")]
    pub annual_inflation: Option<f64>,
}

/// Read `annual.csv` under the {Year, CPI, Annual_Inflation} schema, sorted
/// by year. The raw header row is discarded; the schema is imposed here.
pub fn annual_table(dirs: &DataDirs) -> Result<Vec<AnnualRow>> {
    let path = dirs.annual_csv();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(&path)
        .with_context(|| format!("opening {:?}", path))?;

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record =
            record.with_context(|| format!("CSV parse error in {:?} at record {}", path, i))?;
        if record.len() != 3 {
            bail!(
                "{:?} record {} has {} fields, expected 3",
                path,
                i,
                record.len()
            );
        }
        rows.push(AnnualRow {
            year: parse_year(record.get(0).unwrap_or_default(), &path, i)?,
            cpi: parse_value(record.get(1).unwrap_or_default(), &path, i)?,
            annual_inflation: parse_value(record.get(2).unwrap_or_default(), &path, i)?,
        });
    }

    rows.sort_by_key(|row| row.year);
    for pair in rows.windows(2) {
        if pair[0].year == pair[1].year {
            bail!("duplicate year {} in {:?}", pair[0].year, path);
        }
    }
    Ok(rows)
}

/// Read every `monthly_tables/<year>.csv`, re-key the month column through
/// the Jalali calendar, and concatenate sorted by (Year, Month).
pub fn monthly_table(dirs: &DataDirs) -> Result<Vec<MonthlyRow>> {
    let dir = dirs.monthly_tables();
    let mut files: Vec<(i64, PathBuf)> = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("reading {:?}", dir))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let year = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| stem.parse::<i64>().ok())
            .with_context(|| format!("monthly file {:?} is not named <year>.csv", path))?;
        files.push((year, path));
    }

    let mut rows = Vec::new();
    for (year, path) in files {
        debug!(year, path = %path.display(), "reading monthly table");
        rows.extend(read_monthly_file(year, &path)?);
    }
    rows.sort_by_key(|row| (row.year, row.month));
    Ok(rows)
}

fn read_monthly_file(year: i64, path: &Path) -> Result<Vec<MonthlyRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {:?}", path))?;

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record =
            record.with_context(|| format!("CSV parse error in {:?} at record {}", path, i))?;
        if record.len() != 3 {
            bail!(
                "{:?} record {} has {} fields, expected 3",
                path,
                i,
                record.len()
            );
        }
        let name = record.get(0).unwrap_or_default().trim();
        let month = calendar::month_ordinal(name)
            .with_context(|| format!("unknown month name {:?} in {:?} record {}", name, path, i))?;
        rows.push(MonthlyRow {
            year,
            month,
            cpi: parse_value(record.get(1).unwrap_or_default(), path, i)?,
            annual_inflation: parse_value(record.get(2).unwrap_or_default(), path, i)?,
        });
    }
    Ok(rows)
}

pub fn write_annual_csv(path: &Path, rows: &[AnnualRow]) -> Result<()> {
    write_rows(path, rows)
}

pub fn write_monthly_csv(path: &Path, rows: &[MonthlyRow]) -> Result<()> {
    write_rows(path, rows)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {:?}", path))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().with_context(|| format!("flushing {:?}", path))?;
    Ok(())
}

fn parse_year(field: &str, path: &Path, record: usize) -> Result<i64> {
    let field = field.trim();
    if let Ok(year) = field.parse::<i64>() {
        return Ok(year);
    }
    // raw keys can carry a float spelling ("1395.0"); accept integral floats
    match field.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 => Ok(f as i64),
        _ => bail!(
            "year {:?} in {:?} record {} is not an integer",
            field,
            path,
            record
        ),
    }
}

fn parse_value(field: &str, path: &Path, record: usize) -> Result<Option<f64>> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(None);
    }
    let value = field.parse::<f64>().with_context(|| {
        format!("non-numeric value {:?} in {:?} record {}", field, path, record)
    })?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn dirs_with_raw(tmp: &tempfile::TempDir) -> DataDirs {
        let dirs = DataDirs::new(tmp.path());
        dirs.ensure_raw().unwrap();
        dirs.ensure_merged().unwrap();
        dirs
    }

    fn write_raw_annual(dirs: &DataDirs, body: &str) {
        fs::write(dirs.annual_csv(), body).unwrap();
    }

    fn write_raw_monthly(dirs: &DataDirs, year: i64, body: &str) {
        fs::write(dirs.monthly_csv(year), body).unwrap();
    }

    #[test]
    fn annual_sorted_strictly_increasing() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = dirs_with_raw(&tmp);
        write_raw_annual(&dirs, "سال,CPI,تورم\n1400,339.1,46.2\n1398,211.9,41.2\n1399,262.8,\n");

        let rows = annual_table(&dirs).unwrap();
        let years: Vec<i64> = rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![1398, 1399, 1400]);
        assert!(years.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(rows[1].annual_inflation, None);
    }

    #[test]
    fn annual_duplicate_year_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = dirs_with_raw(&tmp);
        write_raw_annual(&dirs, "سال,CPI,تورم\n1400,339.1,46.2\n1400,339.1,46.2\n");
        assert!(annual_table(&dirs).is_err());
    }

    #[test]
    fn annual_wrong_field_count_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = dirs_with_raw(&tmp);
        write_raw_annual(&dirs, "سال,CPI\n1400,339.1\n");
        assert!(annual_table(&dirs).is_err());
    }

    #[test]
    fn annual_accepts_float_spelled_years() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = dirs_with_raw(&tmp);
        write_raw_annual(&dirs, "سال,CPI,تورم\n1400.0,339.1,46.2\n");
        assert_eq!(annual_table(&dirs).unwrap()[0].year, 1400);
    }

    #[test]
    fn monthly_sorted_by_year_then_ordinal() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = dirs_with_raw(&tmp);
        // months deliberately out of calendar order, and across two files
        write_raw_monthly(&dirs, 1400, "ماه,CPI,تورم\nمهر,330.0,44.0\nفروردين,300.0,40.0\n");
        write_raw_monthly(&dirs, 1399, "ماه,CPI,تورم\nاسفند,290.0,39.0\nخرداد,250.0,30.0\n");

        let rows = monthly_table(&dirs).unwrap();
        let keys: Vec<(i64, u32)> = rows.iter().map(|r| (r.year, r.month)).collect();
        assert_eq!(keys, vec![(1399, 3), (1399, 12), (1400, 1), (1400, 7)]);
    }

    #[test]
    fn monthly_unknown_month_name_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = dirs_with_raw(&tmp);
        write_raw_monthly(&dirs, 1400, "ماه,CPI,تورم\nOctober,330.0,44.0\n");

        let err = monthly_table(&dirs).unwrap_err();
        assert!(format!("{:#}", err).contains("October"));
    }

    #[test]
    fn merge_is_byte_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = dirs_with_raw(&tmp);
        write_raw_annual(&dirs, "سال,CPI,تورم\n1399,262.8,36.4\n1400,339.1,\n");
        write_raw_monthly(&dirs, 1400, "ماه,CPI,تورم\nآبان,335.0,45.0\nمهر,330.0,44.0\n");

        let run = |dirs: &DataDirs| -> (Vec<u8>, Vec<u8>) {
            let annual = annual_table(dirs).unwrap();
            write_annual_csv(&dirs.merged_annual_csv(), &annual).unwrap();
            let monthly = monthly_table(dirs).unwrap();
            write_monthly_csv(&dirs.merged_monthly_csv(), &monthly).unwrap();
            (
                fs::read(dirs.merged_annual_csv()).unwrap(),
                fs::read(dirs.merged_monthly_csv()).unwrap(),
            )
        };

        let first = run(&dirs);
        let second = run(&dirs);
        assert_eq!(first, second);
    }

    #[test]
    fn merged_files_have_imposed_headers() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = dirs_with_raw(&tmp);
        write_raw_annual(&dirs, "سال,CPI,تورم\n1400,339.1,46.2\n");
        write_raw_monthly(&dirs, 1400, "ماه,CPI,تورم\nدی,340.0,\n");

        let annual = annual_table(&dirs).unwrap();
        write_annual_csv(&dirs.merged_annual_csv(), &annual).unwrap();
        let monthly = monthly_table(&dirs).unwrap();
        write_monthly_csv(&dirs.merged_monthly_csv(), &monthly).unwrap();

        let annual_out = fs::read_to_string(dirs.merged_annual_csv()).unwrap();
        assert_eq!(annual_out, "Year,CPI,Annual_Inflation\n1400,339.1,46.2\n");
        let monthly_out = fs::read_to_string(dirs.merged_monthly_csv()).unwrap();
        assert_eq!(monthly_out, "Year,Month,CPI,Annual_Inflation\n1400,10,340.0,\n");
    }
}
