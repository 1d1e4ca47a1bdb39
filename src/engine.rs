use crate::error::{McuError, Result};
use crate::lead_time::LeadTimeAdjuster;
use crate::header::match_key;
use crate::month::{month_from_cell, CalendarMonth};
use crate::resolver::FieldMapping;
use crate::schema::{
    AdjustmentMode, ColumnRole, LeadTimePolicy, MetadataSelection, ZeroQuantityPolicy,
};
use crate::table::{CellValue, RawTable, WideRow, WideTable};
use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Where the quantities of a table live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedShape {
    /// One column per month; each cell holds that month's quantity.
    Wide {
        month_columns: Vec<(usize, CalendarMonth)>,
    },
    /// One date cell and one quantity cell per row.
    Long { date_column: usize, quantity_column: usize },
}

impl ResolvedShape {
    /// Columns of this role carry months or quantities rather than metadata.
    pub fn is_value_role(&self, role: ColumnRole) -> bool {
        match self {
            ResolvedShape::Wide { .. } => role == ColumnRole::MonthHeader,
            ResolvedShape::Long { .. } => {
                role == ColumnRole::Quantity || role == ColumnRole::ExMillDate
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeySource {
    Column(usize),
    Blank,
}

/// The metadata columns that form the row key of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    pub names: Vec<String>,
    sources: Vec<KeySource>,
}

impl KeyLayout {
    pub fn new(
        mapping: &FieldMapping,
        shape: &ResolvedShape,
        selection: &MetadataSelection,
        canonical_names: bool,
    ) -> Self {
        match selection {
            MetadataSelection::AllColumns => Self::all_columns(mapping, shape, canonical_names),
            MetadataSelection::Selected { .. } => Self::selected(mapping),
            MetadataSelection::Ordered { columns } => Self::ordered(mapping, shape, columns),
        }
    }

    fn all_columns(mapping: &FieldMapping, shape: &ResolvedShape, canonical_names: bool) -> Self {
        let mut names = Vec::new();
        let mut sources = Vec::new();

        for idx in 0..mapping.headers.len() {
            let Some(role) = mapping.role_of(idx) else {
                continue;
            };
            if shape.is_value_role(role) {
                continue;
            }

            let name = match role {
                ColumnRole::ArticleId | ColumnRole::Supplier | ColumnRole::SupplierCountry
                    if canonical_names =>
                {
                    role.display_name().to_string()
                }
                _ if mapping.header(idx).is_empty() => format!("Unnamed: {}", idx),
                _ => mapping.header(idx).to_string(),
            };
            names.push(name);
            sources.push(KeySource::Column(idx));
        }

        Self { names, sources }
    }

    /// Supplier, article and country first, then the named extra fields.
    /// Anything not found becomes a blank column under its display name.
    fn selected(mapping: &FieldMapping) -> Self {
        let mut names = Vec::new();
        let mut sources = Vec::new();

        for role in [
            ColumnRole::Supplier,
            ColumnRole::ArticleId,
            ColumnRole::SupplierCountry,
        ] {
            names.push(role.display_name().to_string());
            sources.push(
                mapping
                    .column(role)
                    .map(KeySource::Column)
                    .unwrap_or(KeySource::Blank),
            );
        }

        for field in &mapping.extra_fields {
            names.push(field.display_name.clone());
            sources.push(field.column.map(KeySource::Column).unwrap_or(KeySource::Blank));
        }

        Self { names, sources }
    }

    /// Only the listed columns, in the listed order. Names match headers the
    /// same way keyword rules do; names with no matching column are skipped.
    fn ordered(mapping: &FieldMapping, shape: &ResolvedShape, columns: &[String]) -> Self {
        let keys: Vec<String> = mapping.headers.iter().map(|h| match_key(h)).collect();
        let mut names = Vec::new();
        let mut sources = Vec::new();

        for wanted in columns {
            let wanted_key = match_key(wanted);
            let found = keys.iter().enumerate().position(|(idx, key)| {
                *key == wanted_key
                    && !sources.contains(&KeySource::Column(idx))
                    && mapping
                        .role_of(idx)
                        .is_some_and(|role| !shape.is_value_role(role))
            });
            match found {
                Some(idx) => {
                    names.push(mapping.header(idx).to_string());
                    sources.push(KeySource::Column(idx));
                }
                None => debug!("Metadata column '{}' not present, skipping", wanted),
            }
        }

        Self { names, sources }
    }

    fn key_for(&self, table: &RawTable, row: usize) -> Vec<CellValue> {
        self.sources
            .iter()
            .map(|source| match source {
                KeySource::Column(idx) => table.cell(row, *idx).clone(),
                KeySource::Blank => CellValue::Empty,
            })
            .collect()
    }
}

/// One (row, month, quantity) triple of the melted table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRow {
    pub key: Vec<CellValue>,
    pub month: CalendarMonth,
    pub quantity: f64,
    pub country: String,
}

/// A long row after the lead-time shift; `month` is the bucket it sums into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustedRow {
    pub key: Vec<CellValue>,
    pub original_month: CalendarMonth,
    pub month: CalendarMonth,
    pub quantity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CleanQuantity {
    Value(f64),
    Blank,
    Invalid,
}

impl CleanQuantity {
    pub fn value(&self) -> f64 {
        match self {
            CleanQuantity::Value(v) => *v,
            CleanQuantity::Blank | CleanQuantity::Invalid => 0.0,
        }
    }
}

/// Strips thousands separators and spacing, then requires a finite,
/// non-negative number.
pub fn clean_quantity(cell: &CellValue) -> CleanQuantity {
    match cell {
        CellValue::Empty => CleanQuantity::Blank,
        CellValue::Number(n) if n.is_nan() => CleanQuantity::Blank,
        CellValue::Number(n) if n.is_finite() && *n >= 0.0 => CleanQuantity::Value(*n),
        CellValue::Number(_) | CellValue::Date(_) => CleanQuantity::Invalid,
        CellValue::Text(text) => {
            let stripped: String = text
                .chars()
                .filter(|c| !matches!(c, ',' | '\u{00A0}' | '\u{202F}' | '\'') && !c.is_whitespace())
                .collect();
            if stripped.is_empty() || stripped == "-" || stripped.eq_ignore_ascii_case("nan") {
                return CleanQuantity::Blank;
            }
            match stripped.parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => CleanQuantity::Value(v),
                _ => CleanQuantity::Invalid,
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    pub input_rows: usize,
    pub long_rows: usize,
    pub zero_rows_dropped: usize,
    pub invalid_quantities: usize,
    pub date_cells_dropped: usize,
    pub blank_article_rows: usize,
    pub output_rows: usize,
    pub month_columns: usize,
}

/// Grouping identity of one key cell. The variant tag keeps a numeric `1`
/// and the text `"1"` apart while still ordering rows by their display form.
type GroupKey = (String, u8);

fn group_key(cell: &CellValue) -> GroupKey {
    let tag = match cell {
        CellValue::Empty => 0,
        CellValue::Text(_) => 1,
        CellValue::Number(_) => 2,
        CellValue::Date(_) => 3,
    };
    (cell.to_string(), tag)
}

pub struct PivotEngine<'a> {
    zero_quantities: ZeroQuantityPolicy,
    adjustment: AdjustmentMode,
    lead_time: &'a LeadTimePolicy,
    assume_year: Option<i32>,
}

impl<'a> PivotEngine<'a> {
    pub fn new(
        zero_quantities: ZeroQuantityPolicy,
        adjustment: AdjustmentMode,
        lead_time: &'a LeadTimePolicy,
        assume_year: Option<i32>,
    ) -> Self {
        Self {
            zero_quantities,
            adjustment,
            lead_time,
            assume_year,
        }
    }

    /// Flattens every row into long rows, cleaning quantities and dropping
    /// zero rows per policy. Unreadable long-shape dates drop only their row.
    pub fn melt(
        &self,
        table: &RawTable,
        mapping: &FieldMapping,
        shape: &ResolvedShape,
        layout: &KeyLayout,
        report: &mut TransformReport,
    ) -> Vec<LongRow> {
        let country_column = mapping.column(ColumnRole::SupplierCountry);
        let article_column = mapping.column(ColumnRole::ArticleId);
        let mut rows = Vec::new();

        for row_idx in 0..table.len() {
            if table.rows[row_idx].iter().all(CellValue::is_blank) {
                continue;
            }
            report.input_rows += 1;

            let country = country_column
                .map(|idx| table.cell(row_idx, idx).to_string())
                .unwrap_or_default();

            match shape {
                ResolvedShape::Wide { month_columns } => {
                    for (col_idx, month) in month_columns {
                        let cell = table.cell(row_idx, *col_idx);
                        let Some(quantity) = self.accept_quantity(cell, row_idx, *col_idx, report)
                        else {
                            continue;
                        };
                        rows.push(LongRow {
                            key: layout.key_for(table, row_idx),
                            month: *month,
                            quantity,
                            country: country.clone(),
                        });
                    }
                }
                ResolvedShape::Long {
                    date_column,
                    quantity_column,
                } => {
                    if article_column.is_some_and(|idx| table.cell(row_idx, idx).is_blank()) {
                        debug!("Dropping row {}: no article", row_idx + 1);
                        report.blank_article_rows += 1;
                        continue;
                    }

                    let date_cell = table.cell(row_idx, *date_column);
                    let month = match month_from_cell(date_cell, self.assume_year) {
                        Ok(month) => month,
                        Err(err) => {
                            warn!("Dropping row {}: {}", row_idx + 1, err);
                            report.date_cells_dropped += 1;
                            continue;
                        }
                    };

                    let cell = table.cell(row_idx, *quantity_column);
                    let Some(quantity) =
                        self.accept_quantity(cell, row_idx, *quantity_column, report)
                    else {
                        continue;
                    };
                    rows.push(LongRow {
                        key: layout.key_for(table, row_idx),
                        month,
                        quantity,
                        country,
                    });
                }
            }
        }

        report.long_rows = rows.len();
        rows
    }

    fn accept_quantity(
        &self,
        cell: &CellValue,
        row: usize,
        column: usize,
        report: &mut TransformReport,
    ) -> Option<f64> {
        let cleaned = clean_quantity(cell);
        if cleaned == CleanQuantity::Invalid {
            debug!(
                "Row {}, column {}: quantity '{}' is not a non-negative number, using 0",
                row + 1,
                column + 1,
                cell
            );
            report.invalid_quantities += 1;
        }

        let quantity = cleaned.value();
        if quantity == 0.0 && self.zero_quantities == ZeroQuantityPolicy::Drop {
            report.zero_rows_dropped += 1;
            return None;
        }
        Some(quantity)
    }

    pub fn adjust(&self, rows: Vec<LongRow>) -> Vec<AdjustedRow> {
        let adjuster = LeadTimeAdjuster::new(self.lead_time);
        rows.into_iter()
            .map(|row| {
                let month = match self.adjustment {
                    AdjustmentMode::NoAdjustment => row.month,
                    AdjustmentMode::LeadTimeAdjusted => adjuster.adjust(row.month, &row.country),
                };
                AdjustedRow {
                    key: row.key,
                    original_month: row.month,
                    month,
                    quantity: row.quantity,
                }
            })
            .collect()
    }

    /// Groups by the verbatim key plus month, sums, and pivots months into
    /// ascending columns with zero fill.
    ///
    /// Output rows are ordered by key and each cell is summed in sorted
    /// order, so the result does not depend on input row order.
    pub fn pivot(&self, layout: &KeyLayout, rows: &[AdjustedRow]) -> Result<WideTable> {
        if rows.is_empty() {
            return Err(McuError::EmptyResult(
                "no non-zero quantities with a valid month were found".to_string(),
            ));
        }

        let mut groups: BTreeMap<Vec<GroupKey>, (Vec<CellValue>, BTreeMap<CalendarMonth, Vec<f64>>)> =
            BTreeMap::new();
        let mut months: BTreeSet<CalendarMonth> = BTreeSet::new();

        for row in rows {
            let group_key: Vec<GroupKey> = row.key.iter().map(group_key).collect();
            let (_, cells) = groups
                .entry(group_key)
                .or_insert_with(|| (row.key.clone(), BTreeMap::new()));
            cells.entry(row.month).or_default().push(row.quantity);
            months.insert(row.month);
        }

        let months: Vec<CalendarMonth> = months.into_iter().collect();
        let wide_rows = groups
            .into_values()
            .map(|(key, mut cells)| {
                let quantities = months
                    .iter()
                    .map(|m| match cells.get_mut(m) {
                        Some(values) => {
                            values.sort_by(|a, b| a.total_cmp(b));
                            values.iter().sum()
                        }
                        None => 0.0,
                    })
                    .collect();
                WideRow { key, quantities }
            })
            .collect();

        Ok(WideTable {
            metadata_columns: layout.names.clone(),
            months,
            rows: wide_rows,
        })
    }
}
