use crate::error::Result;
#[cfg(feature = "xlsx")]
use crate::error::McuError;
use crate::table::{CellValue, RawTable};
use log::debug;
use std::io::Read;
use std::path::Path;

pub fn read_csv_path(path: impl AsRef<Path>) -> Result<RawTable> {
    let file = std::fs::File::open(path.as_ref())?;
    debug!("Reading CSV {}", path.as_ref().display());
    read_csv_reader(file)
}

/// Reads a headed CSV into a [`RawTable`].
///
/// Blank lines before the header row are skipped and ragged rows are
/// accepted. Every non-empty cell is kept as text.
pub fn read_csv_reader<R: Read>(reader: R) -> Result<RawTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records: Vec<Vec<CellValue>> = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let row: Vec<CellValue> = record.iter().map(text_cell).collect();
        records.push(row);
    }

    Ok(into_table(records))
}

fn text_cell(raw: &str) -> CellValue {
    if raw.trim().is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(raw.to_string())
    }
}

fn into_table(records: Vec<Vec<CellValue>>) -> RawTable {
    let mut rows = records
        .into_iter()
        .skip_while(|row| row.iter().all(CellValue::is_blank));

    match rows.next() {
        Some(headers) => RawTable::new(headers, rows.collect()),
        None => RawTable::default(),
    }
}

/// Reads one worksheet, or the first one when `sheet` is `None`.
#[cfg(feature = "xlsx")]
pub fn read_xlsx_path(path: impl AsRef<Path>, sheet: Option<&str>) -> Result<RawTable> {
    use calamine::{open_workbook_auto, Reader};

    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| McuError::Workbook(format!("{}: {}", path.display(), err)))?;

    let range = match sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .map_err(|err| McuError::Workbook(format!("{} [{}]: {}", path.display(), name, err)))?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| McuError::Workbook(format!("{}: workbook has no worksheets", path.display())))?
            .map_err(|err| McuError::Workbook(format!("{}: {}", path.display(), err)))?,
    };

    Ok(range_to_table(&range))
}

/// Reads every worksheet in workbook order, paired with its name.
#[cfg(feature = "xlsx")]
pub fn read_workbook_sheets(path: impl AsRef<Path>) -> Result<Vec<(String, RawTable)>> {
    use calamine::{open_workbook_auto, Reader};

    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| McuError::Workbook(format!("{}: {}", path.display(), err)))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names().to_vec() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|err| McuError::Workbook(format!("{} [{}]: {}", path.display(), name, err)))?;
        debug!("Read sheet '{}' ({} rows)", name, range.height());
        sheets.push((name, range_to_table(&range)));
    }

    Ok(sheets)
}

#[cfg(feature = "xlsx")]
fn range_to_table(range: &calamine::Range<calamine::DataType>) -> RawTable {
    let records = range
        .rows()
        .map(|row| row.iter().map(data_type_to_cell).collect())
        .collect();
    into_table(records)
}

#[cfg(feature = "xlsx")]
fn data_type_to_cell(cell: &calamine::DataType) -> CellValue {
    use crate::month::excel_serial_to_date;
    use calamine::DataType;

    match cell {
        DataType::Empty | DataType::Error(_) => CellValue::Empty,
        DataType::String(s) => text_cell(s),
        DataType::Float(f) => CellValue::Number(*f),
        DataType::Int(v) => CellValue::Number(*v as f64),
        DataType::Bool(v) => CellValue::Text(v.to_string()),
        DataType::DateTime(serial) => match excel_serial_to_date(*serial) {
            Some(date) => CellValue::Date(date),
            None => CellValue::Number(*serial),
        },
        other => text_cell(&other.to_string()),
    }
}
