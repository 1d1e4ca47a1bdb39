use crate::schema::ColumnRole;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum McuError {
    #[error(
        "Could not detect required columns: {}. Detected columns: [{}]",
        format_roles(.missing),
        .headers.join(", ")
    )]
    ColumnResolution {
        missing: Vec<ColumnRole>,
        headers: Vec<String>,
    },

    #[error("{}", format_month_parse(.text, .column.as_deref()))]
    MonthParse {
        text: String,
        column: Option<String>,
    },

    #[error("No rows left to pivot: {0}")]
    EmptyResult(String),

    #[error("Invalid transform profile: {0}")]
    InvalidProfile(String),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McuError {
    /// `EmptyResult` is a valid-but-uninformative outcome rather than a failure.
    pub fn is_warning(&self) -> bool {
        matches!(self, McuError::EmptyResult(_))
    }

    pub(crate) fn month_parse(text: impl Into<String>) -> Self {
        McuError::MonthParse {
            text: text.into(),
            column: None,
        }
    }
}

fn format_roles(roles: &[ColumnRole]) -> String {
    roles
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_month_parse(text: &str, column: Option<&str>) -> String {
    match column {
        Some(col) => format!(
            "Could not parse month from column '{}' (value '{}'). Expected forms like 'Nov-25' or 'November 2025'",
            col, text
        ),
        None => format!(
            "Could not parse month from '{}'. Expected forms like 'Nov-25' or 'November 2025'",
            text
        ),
    }
}

pub type Result<T> = std::result::Result<T, McuError>;
