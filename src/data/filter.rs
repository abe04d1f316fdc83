use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::model::{CellValue, TrafficTable, FLUXO, INTERVALO, PORTE, TRECHO};
use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Grouping key and aggregated rows
// ---------------------------------------------------------------------------

/// `(segment, interval, vehicle class)`, ordered in that priority.
///
/// Fields hold the raw cell text. Ordering compares them as typed values
/// (numbers numerically, before text) and falls back to the text itself, so
/// interval `2` sorts before `10` and equal keys are equal strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKey {
    pub trecho: String,
    pub intervalo: String,
    pub porte: String,
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        typed_cmp(&self.trecho, &other.trecho)
            .then_with(|| typed_cmp(&self.intervalo, &other.intervalo))
            .then_with(|| typed_cmp(&self.porte, &other.porte))
    }
}

fn typed_cmp(a: &str, b: &str) -> Ordering {
    CellValue::guess(a)
        .cmp(&CellValue::guess(b))
        .then_with(|| a.cmp(b))
}

/// One group with the sum of every numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub key: GroupKey,
    /// Numeric column name → sum over the group (nulls skipped).
    pub sums: BTreeMap<String, f64>,
}

impl AggregatedRow {
    pub fn fluxo(&self) -> f64 {
        self.sums.get(FLUXO).copied().unwrap_or(0.0)
    }
}

/// Aggregation output, ordered by key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregatedTable {
    /// Summed columns in source order. Non-numeric columns are dropped.
    pub value_columns: Vec<String>,
    pub rows: Vec<AggregatedRow>,
}

impl AggregatedTable {
    /// Convert back into a traffic table with key columns first.
    #[cfg(test)]
    pub fn to_table(&self) -> TrafficTable {
        let mut columns = vec![TRECHO.to_string(), INTERVALO.to_string(), PORTE.to_string()];
        columns.extend(self.value_columns.iter().cloned());

        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut cells = vec![
                    CellValue::Text(r.key.trecho.clone()),
                    CellValue::Text(r.key.intervalo.clone()),
                    CellValue::Text(r.key.porte.clone()),
                ];
                cells.extend(
                    self.value_columns
                        .iter()
                        .map(|c| CellValue::Float(r.sums.get(c).copied().unwrap_or(0.0))),
                );
                cells
            })
            .collect();
        TrafficTable::from_rows(columns, rows)
    }

    pub fn max_fluxo(&self) -> Option<f64> {
        self.rows.iter().map(AggregatedRow::fluxo).reduce(f64::max)
    }

    pub fn min_fluxo(&self) -> Option<f64> {
        self.rows.iter().map(AggregatedRow::fluxo).reduce(f64::min)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Filter + aggregate
// ---------------------------------------------------------------------------

struct KeyColumns {
    trecho: usize,
    intervalo: usize,
    porte: usize,
}

fn key_columns(table: &TrafficTable) -> Result<KeyColumns> {
    let idx = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| DashboardError::parse(format!("dataset has no '{name}' column")))
    };
    Ok(KeyColumns {
        trecho: idx(TRECHO)?,
        intervalo: idx(INTERVALO)?,
        porte: idx(PORTE)?,
    })
}

/// Indices of rows whose vehicle class AND segment code both match exactly.
pub fn filtered_indices(table: &TrafficTable, porte: &str, trecho: &str) -> Result<Vec<usize>> {
    let k = key_columns(table)?;
    Ok(table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            row.get(k.porte).is_some_and(|v| v.key() == porte)
                && row.get(k.trecho).is_some_and(|v| v.key() == trecho)
        })
        .map(|(i, _)| i)
        .collect())
}

/// Group the given rows by [`GroupKey`] and sum every numeric column.
///
/// Callers restrict `indices` first; grouping unfiltered rows would merge
/// other selections into the sums.
pub fn aggregate(table: &TrafficTable, indices: &[usize]) -> Result<AggregatedTable> {
    let k = key_columns(table)?;
    let value_columns: Vec<(usize, String)> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(i, c)| {
            ![k.trecho, k.intervalo, k.porte].contains(i) && table.numeric_columns.contains(*c)
        })
        .map(|(i, c)| (i, c.clone()))
        .collect();

    let mut groups: BTreeMap<GroupKey, BTreeMap<String, f64>> = BTreeMap::new();
    for &i in indices {
        let Some(row) = table.rows.get(i) else {
            continue;
        };
        let cell = |idx: usize| row.get(idx).map(CellValue::key).unwrap_or_default();
        let key = GroupKey {
            trecho: cell(k.trecho),
            intervalo: cell(k.intervalo),
            porte: cell(k.porte),
        };
        let sums = groups.entry(key).or_default();
        for (idx, name) in &value_columns {
            let v = row.get(*idx).and_then(CellValue::as_f64).unwrap_or(0.0);
            *sums.entry(name.clone()).or_insert(0.0) += v;
        }
    }

    Ok(AggregatedTable {
        value_columns: value_columns.into_iter().map(|(_, c)| c).collect(),
        rows: groups
            .into_iter()
            .map(|(key, sums)| AggregatedRow { key, sums })
            .collect(),
    })
}

/// Restrict to one vehicle class and segment, then aggregate.
pub fn filter_and_aggregate(
    table: &TrafficTable,
    porte: &str,
    trecho: &str,
) -> Result<AggregatedTable> {
    let indices = filtered_indices(table, porte, trecho)?;
    let aggregated = aggregate(table, &indices)?;
    log::debug!(
        "{porte}/{trecho}: {} rows → {} groups",
        indices.len(),
        aggregated.rows.len()
    );
    Ok(aggregated)
}

#[cfg(test)]
mod tests {
    use super::super::loader::parse_traffic_csv;
    use super::*;

    const CSV: &str = "Trecho,Porte,Intervalo,Fluxo,Sentido,Faixas\n\
                       A,Leve,08-09,10,Norte,2\n\
                       A,Leve,08-09,5,Sul,2\n\
                       A,Pesado,08-09,3,Norte,2\n\
                       A,Leve,09-10,7,Norte,\n\
                       B,Leve,08-09,100,Norte,3\n";

    fn table() -> TrafficTable {
        parse_traffic_csv(CSV, b',').unwrap()
    }

    #[test]
    fn sums_duplicate_rows_for_the_selection() {
        let t = parse_traffic_csv(
            "Trecho,Porte,Intervalo,Fluxo\nA,Leve,08-09,10\nA,Leve,08-09,5\nA,Pesado,08-09,3\n",
            b',',
        )
        .unwrap();
        let agg = filter_and_aggregate(&t, "Leve", "A").unwrap();
        assert_eq!(agg.rows.len(), 1);
        assert_eq!(agg.rows[0].fluxo(), 15.0);
        assert_eq!(agg.rows[0].key.porte, "Leve");
    }

    #[test]
    fn selection_is_a_conjunction() {
        let t = table();
        let idx = filtered_indices(&t, "Leve", "A").unwrap();
        assert_eq!(idx, vec![0, 1, 3]);
        assert!(filtered_indices(&t, "Pesado", "B").unwrap().is_empty());
    }

    #[test]
    fn groups_are_ordered_and_text_columns_dropped() {
        let agg = filter_and_aggregate(&table(), "Leve", "A").unwrap();
        assert_eq!(agg.value_columns, vec!["Fluxo", "Faixas"]);
        let intervals: Vec<_> = agg.rows.iter().map(|r| r.key.intervalo.as_str()).collect();
        assert_eq!(intervals, vec!["08-09", "09-10"]);
        assert_eq!(agg.rows[0].sums["Faixas"], 4.0);
        // Null cell contributes nothing.
        assert_eq!(agg.rows[1].sums["Faixas"], 0.0);
        assert!(!agg.rows[0].sums.contains_key("Sentido"));
    }

    #[test]
    fn flow_equals_sum_over_matching_rows() {
        let t = table();
        let flow = t.column_index(FLUXO).unwrap();
        for (porte, trecho) in [("Leve", "A"), ("Pesado", "A"), ("Leve", "B")] {
            let agg = filter_and_aggregate(&t, porte, trecho).unwrap();
            for row in &agg.rows {
                let expected: f64 = t
                    .rows
                    .iter()
                    .filter(|r| {
                        r[0].key() == row.key.trecho
                            && r[1].key() == row.key.porte
                            && r[2].key() == row.key.intervalo
                    })
                    .filter_map(|r| r[flow].as_f64())
                    .sum();
                assert_eq!(row.fluxo(), expected);
            }
        }
    }

    #[test]
    fn regrouping_aggregated_rows_is_idempotent() {
        let once = filter_and_aggregate(&table(), "Leve", "A").unwrap();
        let as_table = once.to_table();
        let all: Vec<usize> = (0..as_table.len()).collect();
        let twice = aggregate(&as_table, &all).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn numeric_intervals_sort_by_value() {
        let t = parse_traffic_csv(
            "Trecho,Porte,Intervalo,Fluxo\nA,Leve,2,1\nA,Leve,10,1\nA,Leve,1,1\nA,Leve,02,1\n",
            b',',
        )
        .unwrap();
        let agg = filter_and_aggregate(&t, "Leve", "A").unwrap();
        let intervals: Vec<_> = agg.rows.iter().map(|r| r.key.intervalo.as_str()).collect();
        assert_eq!(intervals, vec!["1", "02", "2", "10"]);
    }

    #[test]
    fn zero_padded_codes_match_verbatim() {
        let t = parse_traffic_csv(
            "Trecho,Porte,Intervalo,Fluxo\n007,Leve,08-09,10\n7,Leve,08-09,1\n",
            b',',
        )
        .unwrap();
        let agg = filter_and_aggregate(&t, "Leve", "007").unwrap();
        assert_eq!(agg.rows.len(), 1);
        assert_eq!(agg.rows[0].key.trecho, "007");
        assert_eq!(agg.rows[0].fluxo(), 10.0);
    }

    #[test]
    fn no_match_gives_empty_table() {
        let agg = filter_and_aggregate(&table(), "Moto", "A").unwrap();
        assert!(agg.is_empty());
        assert_eq!(agg.max_fluxo(), None);
    }

    #[test]
    fn min_and_max_flow() {
        let agg = filter_and_aggregate(&table(), "Leve", "A").unwrap();
        assert_eq!(agg.min_fluxo(), Some(7.0));
        assert_eq!(agg.max_fluxo(), Some(15.0));
    }
}
