// src/table.rs

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use std::path::Path;

/// Placeholder the site prints where a value was never published.
pub const NO_DATA_SENTINEL: &str = "-.-";

static TR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("tr selector"));
static TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("td selector"));

/// String grid lifted straight out of an HTML `<table>`: one entry per
/// `<tr>`, one cell per `<td>`, embedded newlines removed and whitespace
/// trimmed. Row 0 is whatever header the site printed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_element(table: ElementRef<'_>) -> Self {
        let rows = table
            .select(&TR)
            .map(|tr| {
                tr.select(&TD)
                    .map(|td| clean_cell(&td.text().collect::<String>()))
                    .collect()
            })
            .collect();
        Self { rows }
    }
}

fn clean_cell(raw: &str) -> String {
    raw.replace('\n', "").trim().to_string()
}

/// Numeric table derived from a [`RawTable`]: the first raw row becomes the
/// column headers, the first column becomes the row key, sentinel cells
/// become missing, everything else must parse as `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanTable {
    pub key_header: String,
    pub columns: Vec<String>,
    pub keys: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl CleanTable {
    pub fn from_raw(raw: &RawTable) -> Result<Self> {
        let Some((header, data)) = raw.rows.split_first() else {
            bail!("table has no rows");
        };
        let Some((key_header, columns)) = header.split_first() else {
            bail!("table header row has no cells");
        };

        let mut keys = Vec::with_capacity(data.len());
        let mut rows = Vec::with_capacity(data.len());
        for (i, cells) in data.iter().enumerate() {
            if cells.len() != header.len() {
                bail!(
                    "table row {} has {} cells, header has {}",
                    i + 1,
                    cells.len(),
                    header.len()
                );
            }
            let key = &cells[0];
            let mut values = Vec::with_capacity(cells.len() - 1);
            for cell in &cells[1..] {
                values.push(
                    parse_cell(cell)
                        .with_context(|| format!("table row {} ({:?})", i + 1, key))?,
                );
            }
            keys.push(key.clone());
            rows.push(values);
        }

        Ok(Self {
            key_header: key_header.clone(),
            columns: columns.to_vec(),
            keys,
            rows,
        })
    }

    /// Write the table as CSV: key column first, then the value columns,
    /// missing values as empty fields.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr =
            csv::Writer::from_path(path).with_context(|| format!("creating {:?}", path))?;

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(self.key_header.clone());
        header.extend(self.columns.iter().cloned());
        wtr.write_record(&header)?;

        for (key, row) in self.keys.iter().zip(&self.rows) {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(key.clone());
            record.extend(row.iter().map(|value| match value {
                Some(v) => v.to_string(),
                None => String::new(),
            }));
            wtr.write_record(&record)?;
        }

        wtr.flush()
            .with_context(|| format!("flushing {:?}", path))?;
        Ok(())
    }
}

fn parse_cell(cell: &str) -> Result<Option<f64>> {
    if cell == NO_DATA_SENTINEL {
        return Ok(None);
    }
    let value = cell
        .parse::<f64>()
        .with_context(|| format!("non-numeric cell {:?}", cell))?;
    Ok(Some(value))
}
