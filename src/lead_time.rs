use crate::header::clean_text;
use crate::month::CalendarMonth;
use crate::schema::{LeadTimePolicy, NbspPolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierOrigin {
    Local,
    Foreign,
}

pub struct LeadTimeAdjuster<'a> {
    policy: &'a LeadTimePolicy,
}

impl<'a> LeadTimeAdjuster<'a> {
    pub fn new(policy: &'a LeadTimePolicy) -> Self {
        Self { policy }
    }

    /// Local if the cleaned country contains any local keyword or equals a
    /// local alias. Empty and unrecognised countries are foreign.
    pub fn classify(&self, country: &str) -> SupplierOrigin {
        let cleaned = clean_text(country, NbspPolicy::Space).to_lowercase();
        if cleaned.is_empty() {
            return SupplierOrigin::Foreign;
        }

        let keyword_hit = self
            .policy
            .local_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .any(|k| !k.is_empty() && cleaned.contains(&k));
        let alias_hit = self
            .policy
            .local_aliases
            .iter()
            .any(|a| a.trim().eq_ignore_ascii_case(&cleaned));

        if keyword_hit || alias_hit {
            SupplierOrigin::Local
        } else {
            SupplierOrigin::Foreign
        }
    }

    pub fn offset_months(&self, origin: SupplierOrigin) -> u32 {
        match origin {
            SupplierOrigin::Local => self.policy.local_offset_months,
            SupplierOrigin::Foreign => self.policy.foreign_offset_months,
        }
    }

    pub fn adjust(&self, month: CalendarMonth, country: &str) -> CalendarMonth {
        month.minus_months(self.offset_months(self.classify(country)))
    }
}

/// Shifts `month` back by the default policy: 3 months for Sri Lankan
/// suppliers, 4 months for everyone else.
pub fn adjust_month(month: CalendarMonth, country: &str) -> CalendarMonth {
    let policy = LeadTimePolicy::default();
    LeadTimeAdjuster::new(&policy).adjust(month, country)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> CalendarMonth {
        CalendarMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_classify() {
        let policy = LeadTimePolicy::default();
        let adjuster = LeadTimeAdjuster::new(&policy);

        assert_eq!(adjuster.classify("Sri Lanka"), SupplierOrigin::Local);
        assert_eq!(adjuster.classify("  SRI\u{00A0}LANKA "), SupplierOrigin::Local);
        assert_eq!(adjuster.classify("Lanka"), SupplierOrigin::Local);
        assert_eq!(adjuster.classify("sri"), SupplierOrigin::Local);
        assert_eq!(adjuster.classify("SL"), SupplierOrigin::Local);
        assert_eq!(adjuster.classify("India"), SupplierOrigin::Foreign);
        assert_eq!(adjuster.classify(""), SupplierOrigin::Foreign);
        assert_eq!(adjuster.classify("Slovenia"), SupplierOrigin::Foreign);
    }

    #[test]
    fn test_adjust_with_rollover() {
        assert_eq!(adjust_month(ym(2025, 2), "Sri Lanka"), ym(2024, 11));
        assert_eq!(adjust_month(ym(2025, 1), "Sri Lanka"), ym(2024, 10));
        assert_eq!(adjust_month(ym(2025, 11), "India"), ym(2025, 7));
        assert_eq!(adjust_month(ym(2025, 3), "China"), ym(2024, 11));
        assert_eq!(adjust_month(ym(2025, 3), ""), ym(2024, 11));
    }

    #[test]
    fn test_custom_offsets() {
        let policy = LeadTimePolicy {
            local_keywords: vec!["vietnam".into()],
            local_aliases: vec![],
            local_offset_months: 1,
            foreign_offset_months: 6,
        };
        let adjuster = LeadTimeAdjuster::new(&policy);
        assert_eq!(adjuster.adjust(ym(2025, 6), "Vietnam"), ym(2025, 5));
        assert_eq!(adjuster.adjust(ym(2025, 6), "Sri Lanka"), ym(2024, 12));
    }
}
