use crate::month::CalendarMonth;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
            CellValue::Date(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Integral values print without a fractional part; NaN prints as empty.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else if value.fract().abs() < f64::EPSILON && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

/// One worksheet as read from the upload: a header row plus data rows.
///
/// Rows may be ragged; cells past the end of a row read as [`CellValue::Empty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<CellValue>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<CellValue>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    pub fn from_headers<S: AsRef<str>>(headers: &[S], rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            headers: headers
                .iter()
                .map(|h| CellValue::Text(h.as_ref().to_string()))
                .collect(),
            rows,
        }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY_CELL)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideRow {
    pub key: Vec<CellValue>,
    pub quantities: Vec<f64>,
}

/// The MCU layout: metadata columns followed by ascending month columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WideTable {
    pub metadata_columns: Vec<String>,
    pub months: Vec<CalendarMonth>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    pub fn headers(&self) -> Vec<String> {
        self.metadata_columns
            .iter()
            .cloned()
            .chain(self.months.iter().map(|m| m.label()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().flat_map(|r| r.quantities.iter()).sum()
    }

    pub fn month_index(&self, month: CalendarMonth) -> Option<usize> {
        self.months.binary_search(&month).ok()
    }

    pub fn column_total(&self, month: CalendarMonth) -> f64 {
        match self.month_index(month) {
            Some(idx) => self.rows.iter().map(|r| r.quantities[idx]).sum(),
            None => 0.0,
        }
    }

    /// Finds the row whose key cells display as `key`, in column order.
    pub fn find_row<S: AsRef<str>>(&self, key: &[S]) -> Option<&WideRow> {
        self.rows.iter().find(|row| {
            row.key.len() == key.len()
                && row
                    .key
                    .iter()
                    .zip(key)
                    .all(|(cell, wanted)| cell.to_string() == wanted.as_ref())
        })
    }

    pub fn value<S: AsRef<str>>(&self, key: &[S], month: CalendarMonth) -> Option<f64> {
        let idx = self.month_index(month)?;
        self.find_row(key).map(|row| row.quantities[idx])
    }

    /// Prepends a constant column, e.g. the sheet label of a multi-sheet workbook.
    pub fn with_leading_column(mut self, name: impl Into<String>, value: CellValue) -> Self {
        self.metadata_columns.insert(0, name.into());
        for row in &mut self.rows {
            row.key.insert(0, value.clone());
        }
        self
    }

    /// Concatenates tables whose columns may differ.
    ///
    /// Metadata columns are unioned in first-seen order and month columns are
    /// unioned chronologically. Cells a table lacks are filled with empty
    /// metadata or a zero quantity.
    pub fn stack(tables: &[WideTable]) -> WideTable {
        let mut metadata_columns: Vec<String> = Vec::new();
        for table in tables {
            for name in &table.metadata_columns {
                if !metadata_columns.contains(name) {
                    metadata_columns.push(name.clone());
                }
            }
        }

        let months: Vec<CalendarMonth> = tables
            .iter()
            .flat_map(|t| t.months.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut rows = Vec::new();
        for table in tables {
            let meta_positions: Vec<Option<usize>> = metadata_columns
                .iter()
                .map(|name| table.metadata_columns.iter().position(|n| n == name))
                .collect();
            let month_positions: Vec<Option<usize>> =
                months.iter().map(|m| table.month_index(*m)).collect();

            for row in &table.rows {
                let key = meta_positions
                    .iter()
                    .map(|pos| pos.map(|i| row.key[i].clone()).unwrap_or_default())
                    .collect();
                let quantities = month_positions
                    .iter()
                    .map(|pos| pos.map(|i| row.quantities[i]).unwrap_or(0.0))
                    .collect();
                rows.push(WideRow { key, quantities });
            }
        }

        WideTable {
            metadata_columns,
            months,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> CalendarMonth {
        CalendarMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Number(100.0).to_string(), "100");
        assert_eq!(CellValue::Number(12.5).to_string(), "12.5");
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(
            CellValue::Date(NaiveDate::from_ymd_opt(2025, 11, 3).unwrap()).to_string(),
            "2025-11-03"
        );
    }

    #[test]
    fn test_ragged_rows_read_as_empty() {
        let table = RawTable::from_headers(&["A", "B"], vec![vec!["x".into()]]);
        assert_eq!(table.cell(0, 1), &CellValue::Empty);
        assert_eq!(table.cell(5, 0), &CellValue::Empty);
    }

    #[test]
    fn test_stack_aligns_columns() {
        let fabrics = WideTable {
            metadata_columns: vec!["Article".into(), "Supplier".into()],
            months: vec![month(2025, 11)],
            rows: vec![WideRow {
                key: vec!["A1".into(), "Acme".into()],
                quantities: vec![10.0],
            }],
        };
        let trims = WideTable {
            metadata_columns: vec!["Article".into(), "UOM".into()],
            months: vec![month(2025, 10), month(2025, 12)],
            rows: vec![WideRow {
                key: vec!["T9".into(), "pcs".into()],
                quantities: vec![3.0, 4.0],
            }],
        };

        let stacked = WideTable::stack(&[fabrics, trims]);
        assert_eq!(
            stacked.headers(),
            vec!["Article", "Supplier", "UOM", "Oct-25", "Nov-25", "Dec-25"]
        );
        assert_eq!(stacked.rows[0].quantities, vec![0.0, 10.0, 0.0]);
        assert_eq!(stacked.rows[1].key[1], CellValue::Empty);
        assert_eq!(stacked.rows[1].quantities, vec![3.0, 0.0, 4.0]);
        assert!((stacked.total() - 17.0).abs() < 1e-9);
    }

    #[test]
    fn test_leading_column() {
        let table = WideTable {
            metadata_columns: vec!["Article".into()],
            months: vec![month(2025, 1)],
            rows: vec![WideRow {
                key: vec!["A1".into()],
                quantities: vec![1.0],
            }],
        }
        .with_leading_column("Sheet Names", "Fabrics".into());

        assert_eq!(table.headers(), vec!["Sheet Names", "Article", "Jan-25"]);
        assert_eq!(table.value(&["Fabrics", "A1"], month(2025, 1)), Some(1.0));
    }
}
