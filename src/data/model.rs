use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Column names of the traffic CSV
// ---------------------------------------------------------------------------

pub const TRECHO: &str = "Trecho";
pub const PORTE: &str = "Porte";
pub const INTERVALO: &str = "Intervalo";
pub const FLUXO: &str = "Fluxo";

/// Columns every traffic dataset must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = [TRECHO, PORTE, INTERVALO, FLUXO];

/// Columns kept verbatim: they are matched against road codes and
/// selections as text.
pub const KEY_COLUMNS: [&str; 3] = [TRECHO, PORTE, INTERVALO];

// ---------------------------------------------------------------------------
// CellValue – a single cell of a traffic table
// ---------------------------------------------------------------------------

/// A dynamically-typed CSV cell.
/// Used in `BTreeSet`s for distinct values, so it must be `Ord`.
#[derive(Debug, Clone)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
}

// -- Equality follows `Ord` so the two never disagree --

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Float(_) => 2,
                Text(_) => 3,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Guess the type of a raw CSV field. `NaN` and infinities stay text.
    pub fn guess(s: &str) -> Self {
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() => CellValue::Float(f),
            _ => CellValue::Text(s.to_string()),
        }
    }

    /// Keep a raw CSV field as text (empty → Null).
    pub fn text(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Null
        } else {
            CellValue::Text(s.to_string())
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text used for equality against selections and road codes.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

// ---------------------------------------------------------------------------
// TrafficTable – a loaded traffic CSV
// ---------------------------------------------------------------------------

/// Column-indexed rows of one time-range dataset.
///
/// Duplicated rows are kept; aggregation sums them.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficTable {
    /// Column names in file order.
    pub columns: Vec<String>,
    /// Rows, each aligned with `columns`.
    pub rows: Vec<Vec<CellValue>>,
    /// Columns whose non-null cells are all numeric.
    pub numeric_columns: BTreeSet<String>,
    /// Sorted distinct values per column.
    pub distinct_values: BTreeMap<String, BTreeSet<CellValue>>,
}

impl TrafficTable {
    /// Build column indices from parsed rows.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut distinct_values: BTreeMap<String, BTreeSet<CellValue>> = BTreeMap::new();
        let mut numeric_columns = BTreeSet::new();

        for (idx, col) in columns.iter().enumerate() {
            let values: BTreeSet<CellValue> = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .cloned()
                .collect();
            if values.iter().all(|v| v.is_null() || v.as_f64().is_some()) {
                numeric_columns.insert(col.clone());
            }
            distinct_values.insert(col.clone(), values);
        }

        TrafficTable {
            columns,
            rows,
            numeric_columns,
            distinct_values,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Sorted distinct non-null values of a column, as text.
    pub fn distinct_keys(&self, column: &str) -> Vec<String> {
        self.distinct_values
            .get(column)
            .map(|vals| {
                vals.iter()
                    .filter(|v| !v.is_null())
                    .map(CellValue::key)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The first `n` rows, for previewing.
    pub fn head(&self, n: usize) -> &[Vec<CellValue>] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
