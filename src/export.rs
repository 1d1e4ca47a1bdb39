use crate::error::{McuError, Result};
use crate::table::{format_number, WideTable};
use crate::upload::PlmUpload;
use std::io::Write;

/// A table that can be written as one header row plus records.
pub trait CsvTable {
    fn csv_headers(&self) -> Vec<String>;
    fn csv_records(&self) -> Vec<Vec<String>>;
}

impl CsvTable for WideTable {
    fn csv_headers(&self) -> Vec<String> {
        self.headers()
    }

    /// Metadata cells verbatim, then month quantities.
    fn csv_records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.key
                    .iter()
                    .map(|cell| cell.to_string())
                    .chain(row.quantities.iter().map(|q| format_number(*q)))
                    .collect()
            })
            .collect()
    }
}

impl CsvTable for PlmUpload {
    fn csv_headers(&self) -> Vec<String> {
        self.headers()
    }

    fn csv_records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                std::iter::once(row.style.to_string())
                    .chain(row.quantities.iter().map(|q| format_number(*q)))
                    .collect()
            })
            .collect()
    }
}

pub fn write_csv<T: CsvTable + ?Sized, W: Write>(table: &T, writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);

    csv_writer.write_record(table.csv_headers())?;
    for record in table.csv_records() {
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_string<T: CsvTable + ?Sized>(table: &T) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|err| McuError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))
}
