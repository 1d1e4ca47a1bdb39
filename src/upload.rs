//! Buy sheet to PLM upload: the style column plus the buy months, one row
//! per style line, in sheet order.

use crate::engine::{clean_quantity, CleanQuantity};
use crate::error::{McuError, Result};
use crate::header::{clean_header, is_summary_header, match_key};
use crate::month::{looks_like_month_header, month_from_name};
use crate::resolver::find_match;
use crate::schema::{ColumnRole, PlmUploadProfile};
use crate::table::{CellValue, RawTable};
use log::{debug, info, warn};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlmUploadRow {
    pub style: CellValue,
    pub quantities: Vec<f64>,
}

/// A PLM upload sheet. Month columns keep the buy sheet's own labels
/// ("Jul", "OCT") since the PLM import matches on them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlmUpload {
    pub style_column: String,
    pub months: Vec<String>,
    pub rows: Vec<PlmUploadRow>,
}

impl PlmUpload {
    pub fn headers(&self) -> Vec<String> {
        std::iter::once(self.style_column.clone())
            .chain(self.months.iter().cloned())
            .collect()
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().flat_map(|r| r.quantities.iter()).sum()
    }
}

fn grid_row(table: &RawTable, idx: usize) -> Option<&[CellValue]> {
    match idx {
        0 if table.headers.is_empty() => None,
        0 => Some(table.headers.as_slice()),
        n => table.rows.get(n - 1).map(Vec::as_slice),
    }
}

/// Converts one buy sheet grid into the PLM upload layout.
///
/// Quantities are cleaned the same way as in the MCU transform, so blanks and
/// unreadable cells become 0. Rows without a style are skipped.
pub fn build_plm_upload(table: &RawTable, profile: &PlmUploadProfile) -> Result<PlmUpload> {
    profile.validate()?;

    let Some(header_cells) = grid_row(table, profile.header_row) else {
        return Err(McuError::ColumnResolution {
            missing: vec![ColumnRole::ArticleId, ColumnRole::MonthHeader],
            headers: Vec::new(),
        });
    };
    let headers: Vec<String> = header_cells
        .iter()
        .map(|h| clean_header(h, profile.nbsp))
        .collect();
    let keys: Vec<String> = headers.iter().map(|h| match_key(h)).collect();

    info!(
        "Building PLM upload for '{}': header row {}, {} columns",
        profile.name,
        profile.header_row,
        headers.len()
    );

    let month_columns = match profile.month_row {
        Some(month_row) => listed_month_columns(table, profile, month_row, &keys),
        None => (0..headers.len())
            .filter(|&idx| {
                let header = &headers[idx];
                !header.is_empty()
                    && !is_summary_header(header)
                    && (looks_like_month_header(header) || month_from_name(header).is_some())
            })
            .collect(),
    };
    if month_columns.is_empty() {
        return Err(McuError::ColumnResolution {
            missing: vec![ColumnRole::MonthHeader],
            headers,
        });
    }

    let mut claimed = vec![false; headers.len()];
    for idx in &month_columns {
        claimed[*idx] = true;
    }
    let style_column = find_match(&keys, &claimed, &profile.style_rule).or_else(|| {
        if profile.style_fallback_first_column {
            claimed.iter().position(|c| !c)
        } else {
            None
        }
    });
    let Some(style_column) = style_column else {
        return Err(McuError::ColumnResolution {
            missing: vec![ColumnRole::ArticleId],
            headers,
        });
    };
    debug!("Style column: '{}'", headers[style_column]);

    let mut rows = Vec::new();
    let mut invalid = 0;
    let data_start = profile.header_row + 1;
    let mut grid_idx = data_start;
    while let Some(cells) = grid_row(table, grid_idx) {
        grid_idx += 1;
        let style = cells.get(style_column).cloned().unwrap_or_default();
        if style.is_blank() {
            continue;
        }
        let quantities = month_columns
            .iter()
            .map(|idx| {
                let cell = cells.get(*idx).cloned().unwrap_or_default();
                let cleaned = clean_quantity(&cell);
                if cleaned == CleanQuantity::Invalid {
                    invalid += 1;
                }
                cleaned.value()
            })
            .collect();
        rows.push(PlmUploadRow { style, quantities });
    }

    if invalid > 0 {
        warn!("{} month cells were not non-negative numbers and were treated as 0", invalid);
    }
    info!(
        "PLM upload for '{}': {} styles across {} months",
        profile.name,
        rows.len(),
        month_columns.len()
    );

    Ok(PlmUpload {
        style_column: profile.style_output_name.clone(),
        months: month_columns.iter().map(|idx| headers[*idx].clone()).collect(),
        rows,
    })
}

/// Header columns named by the month row, in the month row's order.
fn listed_month_columns(
    table: &RawTable,
    profile: &PlmUploadProfile,
    month_row: usize,
    keys: &[String],
) -> Vec<usize> {
    let Some(labels) = grid_row(table, month_row) else {
        return Vec::new();
    };

    let mut columns: Vec<usize> = Vec::new();
    for label in labels.iter().skip(1) {
        let key = match_key(&clean_header(label, profile.nbsp));
        if key.is_empty() {
            continue;
        }
        match keys
            .iter()
            .enumerate()
            .position(|(idx, k)| *k == key && !columns.contains(&idx))
        {
            Some(idx) => columns.push(idx),
            None => warn!("Month '{}' has no column under the header row, skipping", label),
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    fn tommy_grid() -> RawTable {
        RawTable::new(
            row(&["Buy month:", "Jul", "Aug", ""]),
            vec![
                row(&["PO Proposal", "", "", ""]),
                row(&["Generic Article", "Colour", "Jul", "Aug", "Season"]),
                row(&["TH100", "Navy", "1,200", "", "FA25"]),
                row(&["", "", "", "", ""]),
                row(&["TH200", "Red", "n/a", "40", "FA25"]),
            ],
        )
    }

    #[test]
    fn test_tommy_layout_uses_month_row() {
        let upload = build_plm_upload(&tommy_grid(), &presets::tommy_eu_upload()).unwrap();

        assert_eq!(upload.headers(), vec!["Style number", "Jul", "Aug"]);
        assert_eq!(upload.rows.len(), 2);
        assert_eq!(upload.rows[0].style, CellValue::from("TH100"));
        assert_eq!(upload.rows[0].quantities, vec![1200.0, 0.0]);
        assert_eq!(upload.rows[1].quantities, vec![0.0, 40.0]);
        assert_eq!(upload.total(), 1240.0);
    }

    #[test]
    fn test_style_falls_back_to_first_column() {
        let mut grid = tommy_grid();
        grid.rows[1][0] = CellValue::from("Article");

        let upload = build_plm_upload(&grid, &presets::tommy_eu_upload()).unwrap();
        assert_eq!(upload.rows[0].style, CellValue::from("TH100"));

        let strict = PlmUploadProfile {
            style_fallback_first_column: false,
            ..presets::tommy_eu_upload()
        };
        let err = build_plm_upload(&grid, &strict).unwrap_err();
        assert!(matches!(
            err,
            McuError::ColumnResolution { ref missing, .. } if missing == &vec![ColumnRole::ArticleId]
        ));
    }

    #[test]
    fn test_lasenza_detects_month_headers() {
        let table = RawTable::from_headers(
            &["Product Number", "Description", "OCT", "NOV", "Sum of NOV", "Dec-25"],
            vec![
                row(&["LS1", "Bralette", "5", "7", "7", "1"]),
                row(&["LS2", "Brief", "", "3", "3", ""]),
            ],
        );

        let upload = build_plm_upload(&table, &presets::lasenza_upload()).unwrap();
        assert_eq!(upload.headers(), vec!["Style Number", "OCT", "NOV", "Dec-25"]);
        assert_eq!(upload.rows[1].quantities, vec![0.0, 3.0, 0.0]);
    }

    #[test]
    fn test_no_month_columns_is_reported() {
        let table = RawTable::from_headers(
            &["Product Number", "Description"],
            vec![row(&["LS1", "Bralette"])],
        );
        let err = build_plm_upload(&table, &presets::lasenza_upload()).unwrap_err();
        assert!(matches!(
            err,
            McuError::ColumnResolution { ref missing, .. } if missing == &vec![ColumnRole::MonthHeader]
        ));
    }

    #[test]
    fn test_header_row_past_end() {
        let table = RawTable::from_headers(&["Jul"], vec![]);
        let err = build_plm_upload(&table, &presets::tommy_eu_upload()).unwrap_err();
        assert!(matches!(err, McuError::ColumnResolution { .. }));
    }
}
