use crate::schema::NbspPolicy;
use crate::table::CellValue;

const NBSP: char = '\u{00A0}';
const NARROW_NBSP: char = '\u{202F}';

/// Cleans a raw column name for display and matching.
///
/// Empty cells become `""`, no-break spaces follow `nbsp`, en/em dashes
/// become `-`, whitespace runs collapse to one space and the result is trimmed.
pub fn clean_header(raw: &CellValue, nbsp: NbspPolicy) -> String {
    match raw {
        CellValue::Empty => String::new(),
        other => clean_text(&other.to_string(), nbsp),
    }
}

pub fn clean_text(raw: &str, nbsp: NbspPolicy) -> String {
    let mut replaced = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            NBSP | NARROW_NBSP => {
                if nbsp == NbspPolicy::Space {
                    replaced.push(' ');
                }
            }
            '\u{2013}' | '\u{2014}' => replaced.push('-'),
            '\u{FEFF}' | '\u{200B}' => {}
            c => replaced.push(c),
        }
    }

    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Matching key: lower-cased, with space, hyphen, dot and slash folded into
/// single underscores, e.g. `"REQ. Ex-mill Date"` becomes `req_ex_mill_date`.
pub fn match_key(cleaned: &str) -> String {
    cleaned
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '.' | '/' | '\\'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Pivot subtotal columns exported by PLM downloads ("Sum of Qty", "SUM").
pub fn is_summary_header(cleaned: &str) -> bool {
    cleaned.to_lowercase().starts_with("sum")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_header_whitespace_and_dashes() {
        let raw = CellValue::from("  RM\u{00A0}Ex\tMill \u{2013} GC\n");
        assert_eq!(clean_header(&raw, NbspPolicy::Space), "RM Ex Mill - GC");
    }

    #[test]
    fn test_nbsp_policies() {
        let raw = CellValue::from("Qty\u{202F}(m)");
        assert_eq!(clean_header(&raw, NbspPolicy::Space), "Qty (m)");
        assert_eq!(clean_header(&raw, NbspPolicy::Remove), "Qty(m)");
    }

    #[test]
    fn test_clean_header_never_fails() {
        assert_eq!(clean_header(&CellValue::Empty, NbspPolicy::Space), "");
        assert_eq!(clean_header(&CellValue::Number(f64::NAN), NbspPolicy::Space), "");
        assert_eq!(clean_header(&CellValue::Number(2025.0), NbspPolicy::Space), "2025");
    }

    #[test]
    fn test_match_key() {
        assert_eq!(match_key("REQ. Ex-mill Date"), "req_ex_mill_date");
        assert_eq!(match_key("Supplier  Country"), "supplier_country");
        assert_eq!(match_key("Article No."), "article_no");
        assert_eq!(match_key("__RM/Ex__Mill"), "rm_ex_mill");
    }

    #[test]
    fn test_summary_header() {
        assert!(is_summary_header("Sum of Qty"));
        assert!(is_summary_header("SUM"));
        assert!(!is_summary_header("Supplier"));
    }
}
