//! Converts a buy sheet into MCU format and writes it as CSV.
//!
//! ```text
//! cargo run --example convert_sheet -- <input.csv|input.xlsx> [preset|profile.json] [output.csv]
//! ```
//!
//! Without arguments a small built-in NDC sheet is converted to stdout.
//! Naming an upload preset (`tommy_eu`, `lasenza`) converts the first sheet
//! into a PLM upload instead.

use anyhow::{bail, Context};
use mcu_transform::{
    presets, read_csv_path, write_csv, CellValue, CsvTable, McuProcessor, RawTable,
    TransformProfile,
};
use std::path::Path;

fn load_profile(arg: Option<&String>) -> anyhow::Result<TransformProfile> {
    match arg {
        None => Ok(presets::ndc_lead_time()),
        Some(name) if name.ends_with(".json") => {
            TransformProfile::from_json_file(name).with_context(|| format!("loading {}", name))
        }
        Some(name) => match presets::by_name(name) {
            Some(profile) => Ok(profile),
            None => bail!(
                "unknown preset '{}', expected one of {:?}",
                name,
                presets::PRESET_NAMES
            ),
        },
    }
}

fn load_sheets(path: &Path) -> anyhow::Result<Vec<(String, RawTable)>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => Ok(vec![("Sheet1".to_string(), read_csv_path(path)?)]),
        "xlsx" | "xlsm" | "xls" => Ok(mcu_transform::read_workbook_sheets(path)?),
        other => bail!("unsupported input extension '{}'", other),
    }
}

fn sample_sheet() -> RawTable {
    RawTable::from_headers(
        &["Article", "Supplier", "Supplier Country", "Nov-25", "Dec-25", "Jan-26"],
        vec![
            vec![
                "A1".into(),
                "Acme Mills".into(),
                "India".into(),
                CellValue::from(1200.0),
                "0".into(),
                "300".into(),
            ],
            vec![
                "A2".into(),
                "Stretchline".into(),
                "Sri Lanka".into(),
                "450".into(),
                "1,000".into(),
                "".into(),
            ],
        ],
    )
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let sheets = match args.first() {
        Some(input) => load_sheets(Path::new(input))?,
        None => vec![("Sample".to_string(), sample_sheet())],
    };

    if let Some(upload_profile) = args.get(1).and_then(|name| presets::upload_by_name(name)) {
        let upload = McuProcessor::buy_sheet_to_plm_upload(&sheets[0].1, &upload_profile)?;
        println!(
            "Profile '{}': {} styles, months {:?}",
            upload_profile.name,
            upload.rows.len(),
            upload.months
        );
        return write_output(&upload, args.get(2));
    }

    let profile = load_profile(args.get(1))?;

    let mcu = if sheets.len() == 1 {
        let (wide, report) = McuProcessor::process_with_report(&sheets[0].1, &profile)?;
        println!("{:#?}", report);
        wide
    } else {
        McuProcessor::process_sheets(&sheets, &profile, Some("Sheet Names"))?
    };

    println!(
        "Profile '{}': {} rows, months {:?}",
        profile.name,
        mcu.rows.len(),
        mcu.months.iter().map(|m| m.label()).collect::<Vec<_>>()
    );

    for month in &mcu.months {
        println!("  {}: {}", month.label(), mcu.column_total(*month));
    }

    write_output(&mcu, args.get(2))
}

fn write_output<T: CsvTable>(table: &T, output: Option<&String>) -> anyhow::Result<()> {
    match output {
        Some(output) => {
            let file = std::fs::File::create(output)
                .with_context(|| format!("creating {}", output))?;
            write_csv(table, file)?;
            println!("Wrote {}", output);
        }
        None => write_csv(table, std::io::stdout())?,
    }
    Ok(())
}
