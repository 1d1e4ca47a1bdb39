//! # MCU Transform
//!
//! A library for converting vendor buy sheets and PLM exports into the MCU
//! layout: one row per material with its metadata, followed by one quantity
//! column per calendar month.
//!
//! ## Core Concepts
//!
//! - **Raw table**: one worksheet as uploaded, with dirty headers and mixed cell types
//! - **Field resolution**: keyword rules map headers to roles (article, supplier, quantity, ...)
//! - **Wide / long input**: months either as columns ("Nov-25") or as a per-row ex-mill date
//! - **Lead-time adjustment**: months shift back 3 (Sri Lanka) or 4 (elsewhere) months
//! - **MCU table**: metadata columns then ascending `Mon-yy` columns with summed quantities
//!
//! ## Example
//!
//! ```rust,ignore
//! use mcu_transform::*;
//!
//! let table = RawTable::from_headers(
//!     &["Article", "Supplier", "Supplier Country", "Nov-25", "Dec-25"],
//!     vec![vec!["A1".into(), "Acme".into(), "India".into(), 100.0.into(), 0.0.into()]],
//! );
//!
//! let profile = TransformProfile::named("Acme buy sheet")
//!     .with_adjustment(AdjustmentMode::LeadTimeAdjusted);
//!
//! let mcu = McuProcessor::process(&table, &profile).unwrap();
//! assert_eq!(mcu.headers(), vec!["Article", "Supplier", "Supplier Country", "Jul-25"]);
//! ```

pub mod engine;
pub mod error;
pub mod export;
pub mod header;
pub mod ingestion;
pub mod lead_time;
pub mod month;
pub mod presets;
pub mod resolver;
pub mod schema;
pub mod table;
pub mod upload;

pub use engine::{
    clean_quantity, AdjustedRow, CleanQuantity, KeyLayout, LongRow, PivotEngine, ResolvedShape,
    TransformReport,
};
pub use error::{McuError, Result};
pub use export::{to_csv_string, write_csv, CsvTable};
pub use header::{clean_header, clean_text, match_key};
pub use ingestion::*;
pub use lead_time::{adjust_month, LeadTimeAdjuster, SupplierOrigin};
pub use month::{parse_month, parse_month_with_default, CalendarMonth};
pub use resolver::{FieldMapping, FieldResolver, NamedColumn};
pub use schema::*;
pub use table::{CellValue, RawTable, WideRow, WideTable};
pub use upload::{build_plm_upload, PlmUpload, PlmUploadRow};

use log::{debug, info, warn};

pub struct McuProcessor;

impl McuProcessor {
    pub fn process(table: &RawTable, profile: &TransformProfile) -> Result<WideTable> {
        Self::process_with_report(table, profile).map(|(wide, _)| wide)
    }

    /// Runs the whole pipeline over one table: clean headers, resolve
    /// roles, melt, adjust, group and pivot.
    ///
    /// Resolution errors and unparseable wide-shape month headers abort the
    /// run. Unreadable long-shape date cells only drop their row.
    pub fn process_with_report(
        table: &RawTable,
        profile: &TransformProfile,
    ) -> Result<(WideTable, TransformReport)> {
        profile.validate()?;

        info!(
            "Processing table for profile '{}': {} columns, {} rows",
            profile.name,
            table.width(),
            table.len()
        );

        let headers: Vec<String> = table
            .headers
            .iter()
            .map(|h| clean_header(h, profile.nbsp))
            .collect();

        let extra_fields = match &profile.metadata {
            MetadataSelection::Selected { fields } => fields.as_slice(),
            MetadataSelection::AllColumns | MetadataSelection::Ordered { .. } => &[],
        };
        let mapping = FieldResolver::new(&profile.rules)
            .drop_summary_columns(profile.drop_summary_columns)
            .bare_month_names(profile.assume_year.is_some())
            .resolve(&headers, extra_fields);

        let shape = resolve_shape(&mapping, profile)?;
        debug!("Resolved input shape: {:?}", shape);

        let layout = KeyLayout::new(&mapping, &shape, &profile.metadata, profile.canonical_names);
        let engine = PivotEngine::new(
            profile.zero_quantities,
            profile.adjustment,
            &profile.lead_time,
            profile.assume_year,
        );

        let mut report = TransformReport::default();
        let long_rows = engine.melt(table, &mapping, &shape, &layout, &mut report);

        if report.invalid_quantities > 0 {
            warn!(
                "{} quantity cells were not non-negative numbers and were treated as 0",
                report.invalid_quantities
            );
        }
        if report.blank_article_rows > 0 {
            warn!(
                "{} rows were dropped because they had no article",
                report.blank_article_rows
            );
        }
        if report.date_cells_dropped > 0 {
            warn!(
                "{} rows were dropped because their date could not be read",
                report.date_cells_dropped
            );
        }

        let adjusted = engine.adjust(long_rows);
        let wide = engine.pivot(&layout, &adjusted)?;

        report.output_rows = wide.rows.len();
        report.month_columns = wide.months.len();
        info!(
            "Profile '{}' produced {} rows across {} months",
            profile.name, report.output_rows, report.month_columns
        );

        Ok((wide, report))
    }

    /// Processes each sheet of a workbook and stacks the results.
    ///
    /// Sheets that end up empty are skipped. When `sheet_column` is given,
    /// each row is prefixed with the name of the sheet it came from.
    pub fn process_sheets(
        sheets: &[(String, RawTable)],
        profile: &TransformProfile,
        sheet_column: Option<&str>,
    ) -> Result<WideTable> {
        let mut tables = Vec::with_capacity(sheets.len());

        for (name, table) in sheets {
            match Self::process(table, profile) {
                Ok(wide) => {
                    let wide = match sheet_column {
                        Some(column) => wide.with_leading_column(column, CellValue::from(name.as_str())),
                        None => wide,
                    };
                    tables.push(wide);
                }
                Err(err) if err.is_warning() => {
                    warn!("Skipping sheet '{}': {}", name, err);
                }
                Err(err) => {
                    warn!("Sheet '{}' failed", name);
                    return Err(err);
                }
            }
        }

        if tables.is_empty() {
            return Err(McuError::EmptyResult(format!(
                "none of the {} sheets contained non-zero quantities",
                sheets.len()
            )));
        }

        Ok(WideTable::stack(&tables))
    }

    /// Converts a brand buy sheet into the PLM upload layout: the style
    /// column renamed per profile, followed by the buy months.
    pub fn buy_sheet_to_plm_upload(
        table: &RawTable,
        profile: &PlmUploadProfile,
    ) -> Result<PlmUpload> {
        build_plm_upload(table, profile)
    }
}

fn resolve_shape(mapping: &FieldMapping, profile: &TransformProfile) -> Result<ResolvedShape> {
    let mut required = vec![ColumnRole::ArticleId];
    if profile.adjustment == AdjustmentMode::LeadTimeAdjusted {
        required.push(ColumnRole::Supplier);
        required.push(ColumnRole::SupplierCountry);
    }
    if profile.strict_optional_roles {
        for role in resolver::ROLE_PRIORITY {
            if profile.rules.get(role).is_some_and(|rule| !rule.is_empty()) {
                required.push(role);
            }
        }
    }

    // A date plus a quantity column means long input. Month headers win over a
    // lone date column, which is then plain metadata.
    let shape = match profile.shape {
        InputShape::Auto
            if mapping.has(ColumnRole::ExMillDate) && mapping.has(ColumnRole::Quantity) =>
        {
            InputShape::Long
        }
        InputShape::Auto if mapping.has(ColumnRole::MonthHeader) => InputShape::Wide,
        InputShape::Auto if mapping.has(ColumnRole::ExMillDate) => InputShape::Long,
        other => other,
    };

    match shape {
        InputShape::Long => {
            required.push(ColumnRole::Quantity);
            required.push(ColumnRole::ExMillDate);
        }
        InputShape::Wide => required.push(ColumnRole::MonthHeader),
        InputShape::Auto => {
            required.push(ColumnRole::Quantity);
            required.push(ColumnRole::ExMillDate);
            required.push(ColumnRole::MonthHeader);
        }
    }
    mapping.require(&required)?;

    match (mapping.column(ColumnRole::ExMillDate), mapping.column(ColumnRole::Quantity)) {
        (Some(date_column), Some(quantity_column)) if shape == InputShape::Long => {
            debug!(
                "Long input: dates in '{}', quantities in '{}'",
                mapping.header(date_column),
                mapping.header(quantity_column)
            );
            Ok(ResolvedShape::Long {
                date_column,
                quantity_column,
            })
        }
        _ => {
            let month_columns = mapping
                .columns(ColumnRole::MonthHeader)
                .into_iter()
                .map(|idx| {
                    let header = mapping.header(idx);
                    parse_month_with_default(header, profile.assume_year)
                        .map(|month| (idx, month))
                        .map_err(|_| McuError::MonthParse {
                            text: header.to_string(),
                            column: Some(format!("#{}", idx + 1)),
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            debug!("Wide input: {} month columns", month_columns.len());
            Ok(ResolvedShape::Wide { month_columns })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_table(country: &str) -> RawTable {
        RawTable::from_headers(
            &["Article", "Supplier", "Supplier Country", "Nov-25", "Dec-25"],
            vec![vec![
                "A1".into(),
                "Acme".into(),
                country.into(),
                100.0.into(),
                0.0.into(),
            ]],
        )
    }

    #[test]
    fn test_auto_shape_detection() {
        let profile = TransformProfile::default();
        let wide = McuProcessor::process(&scenario_table("India"), &profile).unwrap();
        assert_eq!(wide.headers(), vec!["Article", "Supplier", "Supplier Country", "Nov-25"]);

        let long = RawTable::from_headers(
            &["Article No", "Ex-Mill Date", "Qty"],
            vec![vec!["A1".into(), "2025-11-12".into(), "40".into()]],
        );
        let (wide, report) = McuProcessor::process_with_report(&long, &profile).unwrap();
        assert_eq!(wide.headers(), vec!["Article No", "Nov-25"]);
        assert_eq!(report.long_rows, 1);
    }

    #[test]
    fn test_month_headers_win_over_lone_ex_mill_column() {
        let table = RawTable::from_headers(
            &["Article", "Supplier", "RM Ex Mill", "Nov-25", "Dec-25"],
            vec![vec![
                "A1".into(),
                "Acme".into(),
                "2025-10-01".into(),
                30.0.into(),
                20.0.into(),
            ]],
        );
        let wide = McuProcessor::process(&table, &TransformProfile::default()).unwrap();
        assert_eq!(
            wide.headers(),
            vec!["Article", "Supplier", "RM Ex Mill", "Nov-25", "Dec-25"]
        );
        assert_eq!(wide.total(), 50.0);

        let lone_date = RawTable::from_headers(&["Article", "RM Ex Mill"], vec![]);
        match McuProcessor::process(&lone_date, &TransformProfile::default()).unwrap_err() {
            McuError::ColumnResolution { missing, .. } => {
                assert_eq!(missing, vec![ColumnRole::Quantity]);
            }
            other => panic!("expected ColumnResolution, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_everything_lists_all_candidates() {
        let table = RawTable::from_headers(&["Article", "Colour"], vec![]);
        let err = McuProcessor::process(&table, &TransformProfile::default()).unwrap_err();
        match err {
            McuError::ColumnResolution { missing, .. } => {
                assert_eq!(
                    missing,
                    vec![ColumnRole::Quantity, ColumnRole::ExMillDate, ColumnRole::MonthHeader]
                );
            }
            other => panic!("expected ColumnResolution, got {:?}", other),
        }
    }

    #[test]
    fn test_adjustment_requires_supplier_columns() {
        let table = RawTable::from_headers(
            &["Article", "Nov-25"],
            vec![vec!["A1".into(), 10.0.into()]],
        );
        let profile = TransformProfile::default().with_adjustment(AdjustmentMode::LeadTimeAdjusted);
        match McuProcessor::process(&table, &profile).unwrap_err() {
            McuError::ColumnResolution { missing, .. } => {
                assert_eq!(missing, vec![ColumnRole::Supplier, ColumnRole::SupplierCountry]);
            }
            other => panic!("expected ColumnResolution, got {:?}", other),
        }

        assert!(McuProcessor::process(&table, &TransformProfile::default()).is_ok());
    }

    #[test]
    fn test_strict_optional_roles() {
        let mut profile = TransformProfile::default().with_shape(InputShape::Wide);
        profile.strict_optional_roles = true;
        let err = McuProcessor::process(&scenario_table("India"), &profile).unwrap_err();
        match err {
            McuError::ColumnResolution { missing, .. } => {
                assert_eq!(missing, vec![ColumnRole::ExMillDate, ColumnRole::Quantity]);
            }
            other => panic!("expected ColumnResolution, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_month_header_names_column() {
        let table = RawTable::from_headers(
            &["Article", "Nov-25", "Dec 123"],
            vec![vec!["A1".into(), 1.0.into(), 2.0.into()]],
        );
        match McuProcessor::process(&table, &TransformProfile::default()).unwrap_err() {
            McuError::MonthParse { text, column } => {
                assert_eq!(text, "Dec 123");
                assert_eq!(column.as_deref(), Some("#3"));
            }
            other => panic!("expected MonthParse, got {:?}", other),
        }
    }

    #[test]
    fn test_assume_year_for_bare_month_headers() {
        let table = RawTable::from_headers(
            &["Article", "OCT", "NOV"],
            vec![vec!["A1".into(), 5.0.into(), 6.0.into()]],
        );
        let mut profile = TransformProfile::default();
        profile.assume_year = Some(2025);

        let wide = McuProcessor::process(&table, &profile).unwrap();
        assert_eq!(wide.headers(), vec!["Article", "Oct-25", "Nov-25"]);
    }

    #[test]
    fn test_invalid_profile_rejected_before_processing() {
        let profile = TransformProfile::named("  ");
        assert!(matches!(
            McuProcessor::process(&scenario_table("India"), &profile),
            Err(McuError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_process_sheets_skips_empty_and_labels_rows() {
        let zero = RawTable::from_headers(
            &["Article", "Nov-25"],
            vec![vec!["Z".into(), 0.0.into()]],
        );
        let sheets = vec![
            ("Fabrics".to_string(), scenario_table("India")),
            ("Trims".to_string(), zero),
        ];

        let stacked =
            McuProcessor::process_sheets(&sheets, &TransformProfile::default(), Some("Sheet Names"))
                .unwrap();
        assert_eq!(stacked.metadata_columns[0], "Sheet Names");
        assert_eq!(stacked.rows.len(), 1);
        assert_eq!(stacked.rows[0].key[0], CellValue::from("Fabrics"));
    }
}
