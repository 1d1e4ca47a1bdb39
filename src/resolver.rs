use crate::error::{McuError, Result};
use crate::header::{is_summary_header, match_key};
use crate::month::{looks_like_month_header, month_from_name};
use crate::schema::{ColumnRole, KeywordRule, NamedField, RoleRules};
use log::debug;
use serde::Serialize;

/// Keyword roles in claiming order. More specific roles come first so that
/// e.g. "Supplier Country" is taken before the broader supplier rule runs.
pub const ROLE_PRIORITY: [ColumnRole; 5] = [
    ColumnRole::ExMillDate,
    ColumnRole::Quantity,
    ColumnRole::SupplierCountry,
    ColumnRole::Supplier,
    ColumnRole::ArticleId,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedColumn {
    pub display_name: String,
    pub column: Option<usize>,
}

/// Role assignment for every column of one table.
///
/// `None` marks an ignored column (a summary column when those are dropped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    pub headers: Vec<String>,
    roles: Vec<Option<ColumnRole>>,
    pub extra_fields: Vec<NamedColumn>,
}

impl FieldMapping {
    pub fn role_of(&self, column: usize) -> Option<ColumnRole> {
        self.roles.get(column).copied().flatten()
    }

    pub fn column(&self, role: ColumnRole) -> Option<usize> {
        self.roles.iter().position(|r| *r == Some(role))
    }

    pub fn columns(&self, role: ColumnRole) -> Vec<usize> {
        self.roles
            .iter()
            .enumerate()
            .filter(|(_, r)| **r == Some(role))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn header(&self, column: usize) -> &str {
        self.headers.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn has(&self, role: ColumnRole) -> bool {
        self.column(role).is_some()
    }

    /// Fails with every role in `required` that has no column.
    pub fn require(&self, required: &[ColumnRole]) -> Result<()> {
        let mut missing: Vec<ColumnRole> = Vec::new();
        for role in required {
            if !self.has(*role) && !missing.contains(role) {
                missing.push(*role);
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(McuError::ColumnResolution {
                missing,
                headers: self.headers.clone(),
            })
        }
    }
}

pub struct FieldResolver<'a> {
    rules: &'a RoleRules,
    drop_summary_columns: bool,
    bare_month_names: bool,
}

impl<'a> FieldResolver<'a> {
    pub fn new(rules: &'a RoleRules) -> Self {
        Self {
            rules,
            drop_summary_columns: true,
            bare_month_names: false,
        }
    }

    pub fn drop_summary_columns(mut self, drop: bool) -> Self {
        self.drop_summary_columns = drop;
        self
    }

    /// Also treat a header that is only a month name ("OCT", "September") as
    /// a month column. Used when the profile supplies a default year.
    pub fn bare_month_names(mut self, enabled: bool) -> Self {
        self.bare_month_names = enabled;
        self
    }

    /// Assigns a role to every cleaned header. Never fails; missing roles are
    /// checked afterwards with [`FieldMapping::require`].
    pub fn resolve(&self, headers: &[String], extra_fields: &[NamedField]) -> FieldMapping {
        let keys: Vec<String> = headers.iter().map(|h| match_key(h)).collect();
        let mut roles: Vec<Option<ColumnRole>> = vec![None; headers.len()];
        let mut claimed = vec![false; headers.len()];

        for (idx, header) in headers.iter().enumerate() {
            if self.drop_summary_columns && is_summary_header(header) {
                debug!("Ignoring summary column '{}'", header);
                claimed[idx] = true;
            } else if header.is_empty() {
                roles[idx] = Some(ColumnRole::Metadata);
                claimed[idx] = true;
            } else if looks_like_month_header(header)
                || (self.bare_month_names && month_from_name(header).is_some())
            {
                roles[idx] = Some(ColumnRole::MonthHeader);
                claimed[idx] = true;
            }
        }

        for role in ROLE_PRIORITY {
            let Some(rule) = self.rules.get(role) else {
                continue;
            };
            if let Some(idx) = find_match(&keys, &claimed, rule) {
                debug!("Resolved {} -> '{}'", role, headers[idx]);
                roles[idx] = Some(role);
                claimed[idx] = true;
            }
        }

        let extra_fields = extra_fields
            .iter()
            .map(|field| {
                let column = find_match(&keys, &claimed, &field.rule);
                if let Some(idx) = column {
                    claimed[idx] = true;
                }
                NamedColumn {
                    display_name: field.display_name.clone(),
                    column,
                }
            })
            .collect();

        for (idx, role) in roles.iter_mut().enumerate() {
            if role.is_none() && !(self.drop_summary_columns && is_summary_header(&headers[idx])) {
                *role = Some(ColumnRole::Metadata);
            }
        }

        FieldMapping {
            headers: headers.to_vec(),
            roles,
            extra_fields,
        }
    }
}

/// First unclaimed header matching an "all" set (sets in order, leftmost
/// header first), otherwise the leftmost unclaimed header containing any
/// fallback keyword.
pub(crate) fn find_match(keys: &[String], claimed: &[bool], rule: &KeywordRule) -> Option<usize> {
    for set in &rule.all {
        let set_keys: Vec<String> = set.iter().map(|k| match_key(k)).collect();
        if set_keys.is_empty() || set_keys.iter().any(|k| k.is_empty()) {
            continue;
        }
        let hit = keys
            .iter()
            .enumerate()
            .find(|(idx, key)| !claimed[*idx] && set_keys.iter().all(|k| key.contains(k.as_str())));
        if let Some((idx, _)) = hit {
            return Some(idx);
        }
    }

    let any_keys: Vec<String> = rule
        .any
        .iter()
        .map(|k| match_key(k))
        .filter(|k| !k.is_empty())
        .collect();

    keys.iter()
        .enumerate()
        .find(|(idx, key)| !claimed[*idx] && any_keys.iter().any(|k| key.contains(k.as_str())))
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_wide_headers() {
        let rules = RoleRules::default();
        let mapping = FieldResolver::new(&rules).resolve(
            &headers(&["Article", "Supplier", "Supplier Country", "Nov-25", "Dec-25"]),
            &[],
        );

        assert_eq!(mapping.column(ColumnRole::ArticleId), Some(0));
        assert_eq!(mapping.column(ColumnRole::Supplier), Some(1));
        assert_eq!(mapping.column(ColumnRole::SupplierCountry), Some(2));
        assert_eq!(mapping.columns(ColumnRole::MonthHeader), vec![3, 4]);
        assert_eq!(mapping.column(ColumnRole::Quantity), None);
    }

    #[test]
    fn test_country_claimed_before_supplier_regardless_of_order() {
        let rules = RoleRules::default();
        let mapping = FieldResolver::new(&rules)
            .resolve(&headers(&["Supplier Country", "Supplier", "Article"]), &[]);

        assert_eq!(mapping.column(ColumnRole::SupplierCountry), Some(0));
        assert_eq!(mapping.column(ColumnRole::Supplier), Some(1));
    }

    #[test]
    fn test_all_set_preferred_over_any() {
        let rules = RoleRules::default();
        let mapping = FieldResolver::new(&rules).resolve(
            &headers(&["Article Description", "Article No.", "Qty (m)", "REQ. Ex-mill Date"]),
            &[],
        );

        assert_eq!(mapping.column(ColumnRole::ArticleId), Some(1));
        assert_eq!(mapping.column(ColumnRole::Quantity), Some(2));
        assert_eq!(mapping.column(ColumnRole::ExMillDate), Some(3));
        assert_eq!(mapping.role_of(0), Some(ColumnRole::Metadata));
    }

    #[test]
    fn test_leftmost_wins_ties() {
        let rules = RoleRules::default();
        let mapping = FieldResolver::new(&rules)
            .resolve(&headers(&["Article", "Vendor", "Supplier"]), &[]);
        assert_eq!(mapping.column(ColumnRole::Supplier), Some(1));
    }

    #[test]
    fn test_summary_columns_ignored() {
        let rules = RoleRules::default();
        let names = headers(&["Article", "Sum of Qty", "Nov-25"]);

        let mapping = FieldResolver::new(&rules).resolve(&names, &[]);
        assert_eq!(mapping.role_of(1), None);
        assert_eq!(mapping.column(ColumnRole::Quantity), None);

        let kept = FieldResolver::new(&rules)
            .drop_summary_columns(false)
            .resolve(&names, &[]);
        assert_eq!(kept.column(ColumnRole::Quantity), Some(1));
    }

    #[test]
    fn test_require_lists_every_missing_role() {
        let rules = RoleRules::default();
        let mapping = FieldResolver::new(&rules).resolve(&headers(&["Article", "Color"]), &[]);

        match mapping.require(&[ColumnRole::ArticleId, ColumnRole::Quantity, ColumnRole::ExMillDate]) {
            Err(McuError::ColumnResolution { missing, headers }) => {
                assert_eq!(missing, vec![ColumnRole::Quantity, ColumnRole::ExMillDate]);
                assert_eq!(headers, vec!["Article", "Color"]);
            }
            other => panic!("expected ColumnResolution, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_fields() {
        let rules = RoleRules::default();
        let fields = vec![
            NamedField {
                display_name: "Measurement".to_string(),
                rule: KeywordRule::new(&[], &["measurement", "measure"]),
            },
            NamedField {
                display_name: "Plant".to_string(),
                rule: KeywordRule::new(&[], &["plant"]),
            },
        ];
        let mapping = FieldResolver::new(&rules)
            .resolve(&headers(&["Article", "Measurement (cm)", "Qty"]), &fields);

        assert_eq!(mapping.extra_fields[0].column, Some(1));
        assert_eq!(mapping.extra_fields[1].column, None);
        assert_eq!(mapping.extra_fields[1].display_name, "Plant");
    }

    #[test]
    fn test_bare_month_names_only_when_enabled() {
        let rules = RoleRules::default();
        let names = headers(&["Article", "OCT", "Nov"]);

        let off = FieldResolver::new(&rules).resolve(&names, &[]);
        assert!(off.columns(ColumnRole::MonthHeader).is_empty());

        let on = FieldResolver::new(&rules).bare_month_names(true).resolve(&names, &[]);
        assert_eq!(on.columns(ColumnRole::MonthHeader), vec![1, 2]);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let rules = RoleRules::default();
        let names = headers(&["Vendor", "COO", "Article No", "Nov-25", "Qty"]);
        let first = FieldResolver::new(&rules).resolve(&names, &[]);
        for _ in 0..5 {
            assert_eq!(FieldResolver::new(&rules).resolve(&names, &[]), first);
        }
    }
}
