use crate::error::{McuError, Result};
use crate::table::CellValue;
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s._/\\]+").expect("valid separator regex"));

static MONTH_THEN_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<month>[A-Za-z]+)-?(?P<year>\d{4}|\d{2})$").expect("valid month-year regex")
});

static YEAR_THEN_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<year>\d{4})-(?P<month>[A-Za-z]+)$").expect("valid year-month regex")
});

static MONTH_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z])(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)(?:[^a-z]|$)",
    )
    .expect("valid month token regex")
});

static YEAR_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)(\d{4}|\d{2})(?:\D|$)").expect("valid year token regex"));

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2,4}").expect("valid digit regex"));

static ISO_DATE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}[-/]\d{1,2}(?:[-/]\d{1,2})?(?:[ T].*)?$").expect("valid iso date regex")
});

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

// Month-first wins for ambiguous slash dates; day-first only parses when the
// first field cannot be a month.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y"];

/// A (year, month) pair, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalendarMonth {
    year: i32,
    month: u32,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(McuError::month_parse(format!("{}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Months since year 0, used for borrow-free arithmetic.
    fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn add_months(&self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal() + months)
    }

    pub fn minus_months(&self, months: u32) -> Self {
        self.add_months(-(months as i64))
    }

    pub fn months_until(&self, other: CalendarMonth) -> i64 {
        other.ordinal() - self.ordinal()
    }

    /// Display form used for MCU column headers, e.g. `Nov-25`.
    pub fn label(&self) -> String {
        format!(
            "{}-{:02}",
            MONTH_ABBREVIATIONS[(self.month - 1) as usize],
            self.year.rem_euclid(100)
        )
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.trim().to_lowercase();
    if lower == "sept" {
        return Some(9);
    }
    MONTH_NAMES
        .iter()
        .position(|full| *full == lower || (lower.len() == 3 && full.starts_with(&lower)))
        .map(|idx| idx as u32 + 1)
}

fn expand_year(digits: &str) -> Option<i32> {
    let value: i32 = digits.parse().ok()?;
    match digits.len() {
        2 => Some(2000 + value),
        4 => Some(value),
        _ => None,
    }
}

pub fn parse_month(text: &str) -> Result<CalendarMonth> {
    parse_month_with_default(text, None)
}

/// Parses month-denoting text such as `Nov-25`, `November 2025`, `NOV_25`,
/// `Qty Nov 2025 (m)` or `2025-11-01 00:00:00`.
///
/// Two-digit years are read as `2000 + yy`. `assume_year` is only used for a
/// bare month name with no year at all.
pub fn parse_month_with_default(text: &str, assume_year: Option<i32>) -> Result<CalendarMonth> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(McuError::month_parse(text));
    }

    let normalized = SEPARATORS.replace_all(trimmed, "-");
    let normalized = normalized.trim_matches('-');

    let parsed = parse_month_then_year(normalized)
        .or_else(|| parse_year_then_month(normalized))
        .or_else(|| scan_month_and_year(trimmed))
        .or_else(|| parse_date_like(trimmed))
        .or_else(|| parse_date_like(normalized));

    if let Some(month) = parsed {
        return Ok(month);
    }

    if let (Some(year), Some(month)) = (assume_year, month_from_name(normalized)) {
        return CalendarMonth::new(year, month);
    }

    Err(McuError::month_parse(text))
}

fn parse_month_then_year(normalized: &str) -> Option<CalendarMonth> {
    let caps = MONTH_THEN_YEAR.captures(normalized)?;
    let month = month_from_name(&caps["month"])?;
    let year = expand_year(&caps["year"])?;
    CalendarMonth::new(year, month).ok()
}

fn parse_year_then_month(normalized: &str) -> Option<CalendarMonth> {
    let caps = YEAR_THEN_MONTH.captures(normalized)?;
    let month = month_from_name(&caps["month"])?;
    let year = expand_year(&caps["year"])?;
    CalendarMonth::new(year, month).ok()
}

/// Finds a month name anywhere in decorated text and pairs it with the
/// nearest year token after it, falling back to one before it.
fn scan_month_and_year(text: &str) -> Option<CalendarMonth> {
    let caps = MONTH_TOKEN.captures(text)?;
    let token = caps.get(1)?;
    let month = month_from_name(token.as_str())?;

    let after = &text[token.end()..];
    let before = &text[..token.start()];
    let year_digits = YEAR_TOKEN
        .captures(after)
        .or_else(|| YEAR_TOKEN.captures_iter(before).last())?;
    let year = expand_year(year_digits.get(1)?.as_str())?;

    CalendarMonth::new(year, month).ok()
}

fn parse_date_like(text: &str) -> Option<CalendarMonth> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(CalendarMonth::from_date(dt.date_naive()));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(CalendarMonth::from_date(dt.date()));
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(CalendarMonth::from_date(date));
        }
    }

    // "2025-11" carries no day
    NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d")
        .ok()
        .map(CalendarMonth::from_date)
}

/// True when a header looks like it names a month column: a month word next
/// to a 2–4 digit run, or a leading ISO date.
///
/// Detection is deliberately looser than [`parse_month`], so a header such as
/// `Nov 123` is detected and then rejected with a parse error rather than
/// silently treated as metadata.
pub fn looks_like_month_header(text: &str) -> bool {
    let trimmed = text.trim();
    (MONTH_TOKEN.is_match(trimmed) && DIGIT_RUN.is_match(trimmed))
        || ISO_DATE_PREFIX.is_match(trimmed)
}

/// Converts an Excel serial day number (1900 date system) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

/// Reads a month from a single cell of a date column.
pub fn month_from_cell(cell: &CellValue, assume_year: Option<i32>) -> Result<CalendarMonth> {
    match cell {
        CellValue::Date(date) => Ok(CalendarMonth::from_date(*date)),
        CellValue::Number(serial) => excel_serial_to_date(*serial)
            .map(CalendarMonth::from_date)
            .ok_or_else(|| McuError::month_parse(cell.to_string())),
        CellValue::Text(text) => parse_month_with_default(text, assume_year),
        CellValue::Empty => Err(McuError::month_parse("")),
    }
}
