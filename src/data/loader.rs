use super::fetch::{decode, Fetch};
use super::model::{CellValue, TrafficTable, FLUXO, KEY_COLUMNS, REQUIRED_COLUMNS};
use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Download a traffic CSV and parse it into a [`TrafficTable`].
pub fn load_traffic(
    fetcher: &dyn Fetch,
    url: &str,
    encoding: &str,
    delimiter: u8,
) -> Result<TrafficTable> {
    let bytes = fetcher.fetch(url)?;
    let text = decode(&bytes, encoding)?;
    let table = parse_traffic_csv(&text, delimiter)?;
    log::info!(
        "Loaded {} traffic rows with columns {:?} from {url}",
        table.len(),
        table.columns
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

/// CSV layout: header row, then one record per (segment, interval, class)
/// observation. `Trecho`, `Porte`, `Intervalo` and `Fluxo` are required.
/// The key columns keep their trimmed text; every other cell is typed.
pub fn parse_traffic_csv(text: &str, delimiter: u8) -> Result<TrafficTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    for required in REQUIRED_COLUMNS {
        if !columns.iter().any(|c| c == required) {
            return Err(DashboardError::parse(format!(
                "traffic CSV missing '{required}' column (found {columns:?})"
            )));
        }
    }

    let is_key: Vec<bool> = columns
        .iter()
        .map(|c| KEY_COLUMNS.contains(&c.as_str()))
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| DashboardError::parse(format!("traffic CSV row {row_no}: {e}")))?;
        let row = record
            .iter()
            .zip(&is_key)
            .map(|(v, &key)| {
                if key {
                    CellValue::text(v.trim())
                } else {
                    CellValue::guess(v.trim())
                }
            })
            .collect();
        rows.push(row);
    }

    let table = TrafficTable::from_rows(columns, rows);
    if !table.numeric_columns.contains(FLUXO) {
        return Err(DashboardError::parse(format!(
            "traffic CSV column '{FLUXO}' holds non-numeric values"
        )));
    }
    Ok(table)
}
