use crate::error::{McuError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ColumnRole {
    ArticleId,
    Supplier,
    SupplierCountry,
    Quantity,
    ExMillDate,
    MonthHeader,
    Metadata,
}

impl ColumnRole {
    /// Display name used when `canonical_names` renames resolved columns.
    pub fn display_name(&self) -> &'static str {
        match self {
            ColumnRole::ArticleId => "Article No",
            ColumnRole::Supplier => "Supplier",
            ColumnRole::SupplierCountry => "Supplier Country",
            ColumnRole::Quantity => "Qty",
            ColumnRole::ExMillDate => "Ex-Mill Date",
            ColumnRole::MonthHeader => "Month",
            ColumnRole::Metadata => "Metadata",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnRole::ArticleId => "ArticleId",
            ColumnRole::Supplier => "Supplier",
            ColumnRole::SupplierCountry => "SupplierCountry",
            ColumnRole::Quantity => "Quantity",
            ColumnRole::ExMillDate => "ExMillDate",
            ColumnRole::MonthHeader => "MonthHeader",
            ColumnRole::Metadata => "Metadata",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct KeywordRule {
    #[schemars(
        description = "Ordered keyword sets. A header matches a set when it contains every keyword of that set. Sets are tried before `any`."
    )]
    #[serde(default)]
    pub all: Vec<Vec<String>>,

    #[schemars(description = "Fallback keywords. A header matches when it contains any one of them.")]
    #[serde(default)]
    pub any: Vec<String>,
}

impl KeywordRule {
    pub fn new(all: &[&[&str]], any: &[&str]) -> Self {
        Self {
            all: all
                .iter()
                .map(|set| set.iter().map(|k| k.to_string()).collect())
                .collect(),
            any: any.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all.iter().all(|set| set.is_empty()) && self.any.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct RoleRules {
    pub article_id: KeywordRule,
    pub supplier: KeywordRule,
    pub supplier_country: KeywordRule,
    pub quantity: KeywordRule,
    pub ex_mill_date: KeywordRule,
}

impl RoleRules {
    pub fn get(&self, role: ColumnRole) -> Option<&KeywordRule> {
        match role {
            ColumnRole::ArticleId => Some(&self.article_id),
            ColumnRole::Supplier => Some(&self.supplier),
            ColumnRole::SupplierCountry => Some(&self.supplier_country),
            ColumnRole::Quantity => Some(&self.quantity),
            ColumnRole::ExMillDate => Some(&self.ex_mill_date),
            ColumnRole::MonthHeader | ColumnRole::Metadata => None,
        }
    }
}

impl Default for RoleRules {
    fn default() -> Self {
        Self {
            article_id: KeywordRule::new(
                &[&["article", "no"], &["article", "number"]],
                &["article", "material_code", "item_code"],
            ),
            supplier: KeywordRule::new(&[&["supplier", "name"]], &["supplier", "vendor"]),
            supplier_country: KeywordRule::new(
                &[&["supplier", "country"]],
                &["country", "coo", "origin"],
            ),
            quantity: KeywordRule::new(&[&["qty"]], &["quantity", "requirement", "require"]),
            ex_mill_date: KeywordRule::new(
                &[&["rm", "ex", "mill"], &["ex", "mill"]],
                &["exmill", "ex_mill"],
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum InputShape {
    /// Long if an ex-mill date and a quantity column resolve, wide otherwise.
    #[default]
    Auto,
    /// One column per month, quantities in the month cells.
    Wide,
    /// One date column and one quantity column per row.
    Long,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum AdjustmentMode {
    #[default]
    NoAdjustment,
    LeadTimeAdjusted,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum NbspPolicy {
    /// U+00A0 and U+202F become an ordinary space.
    #[default]
    Space,
    /// U+00A0 and U+202F are deleted.
    Remove,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ZeroQuantityPolicy {
    #[default]
    Drop,
    Retain,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct LeadTimePolicy {
    #[schemars(
        description = "Substrings marking a supplier country as local. Any one of them is enough."
    )]
    pub local_keywords: Vec<String>,

    #[schemars(description = "Whole-value country codes treated as local (e.g. 'sl').")]
    #[serde(default)]
    pub local_aliases: Vec<String>,

    pub local_offset_months: u32,
    pub foreign_offset_months: u32,
}

impl Default for LeadTimePolicy {
    fn default() -> Self {
        Self {
            local_keywords: vec!["sri".to_string(), "lanka".to_string()],
            local_aliases: vec!["sl".to_string()],
            local_offset_months: 3,
            foreign_offset_months: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct NamedField {
    #[schemars(description = "Column name used in the output when the field is not found")]
    pub display_name: String,
    pub rule: KeywordRule,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase", tag = "mode")]
pub enum MetadataSelection {
    /// Every column that is not a month, quantity or date column is part of the row key.
    #[default]
    AllColumns,
    /// Only resolved supplier, article and country columns plus the named fields.
    Selected { fields: Vec<NamedField> },
    /// Only the listed headers that are present, in the listed order.
    Ordered { columns: Vec<String> },
}

/// A tenant's header vocabulary and transform options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct TransformProfile {
    #[schemars(description = "Brand or tenant label, used in log lines only")]
    pub name: String,

    #[serde(default)]
    pub rules: RoleRules,

    #[serde(default)]
    pub shape: InputShape,

    #[serde(default)]
    pub adjustment: AdjustmentMode,

    #[serde(default)]
    pub lead_time: LeadTimePolicy,

    #[serde(default)]
    pub nbsp: NbspPolicy,

    #[serde(default)]
    pub zero_quantities: ZeroQuantityPolicy,

    #[schemars(
        description = "If true, every role with non-empty rules must resolve, even when the active shape does not need it"
    )]
    #[serde(default)]
    pub strict_optional_roles: bool,

    #[schemars(description = "Drop columns whose cleaned header starts with 'sum' (pivot subtotals)")]
    #[serde(default = "default_true")]
    pub drop_summary_columns: bool,

    #[serde(default)]
    pub metadata: MetadataSelection,

    #[schemars(description = "Rename resolved role columns to 'Article No', 'Supplier', 'Supplier Country'")]
    #[serde(default)]
    pub canonical_names: bool,

    #[schemars(description = "Year used for month headers that carry no year (e.g. 'OCT')")]
    #[serde(default)]
    pub assume_year: Option<i32>,
}

fn default_true() -> bool {
    true
}

impl Default for TransformProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            rules: RoleRules::default(),
            shape: InputShape::Auto,
            adjustment: AdjustmentMode::NoAdjustment,
            lead_time: LeadTimePolicy::default(),
            nbsp: NbspPolicy::Space,
            zero_quantities: ZeroQuantityPolicy::Drop,
            strict_optional_roles: false,
            drop_summary_columns: true,
            metadata: MetadataSelection::AllColumns,
            canonical_names: false,
            assume_year: None,
        }
    }
}

impl TransformProfile {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_adjustment(mut self, adjustment: AdjustmentMode) -> Self {
        self.adjustment = adjustment;
        self
    }

    pub fn with_shape(mut self, shape: InputShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(McuError::InvalidProfile(
                "profile name must not be empty".to_string(),
            ));
        }

        if self.rules.article_id.is_empty() {
            return Err(McuError::InvalidProfile(
                "article_id rules must contain at least one keyword".to_string(),
            ));
        }

        if self.shape == InputShape::Long && self.rules.quantity.is_empty() {
            return Err(McuError::InvalidProfile(
                "long-shape profiles need quantity keywords".to_string(),
            ));
        }

        if self.adjustment == AdjustmentMode::LeadTimeAdjusted {
            if self.rules.supplier_country.is_empty() {
                return Err(McuError::InvalidProfile(
                    "lead-time adjustment needs supplier_country keywords".to_string(),
                ));
            }
            let lt = &self.lead_time;
            if lt.local_offset_months > 120 || lt.foreign_offset_months > 120 {
                return Err(McuError::InvalidProfile(format!(
                    "lead-time offsets must be at most 120 months (got {} local, {} foreign)",
                    lt.local_offset_months, lt.foreign_offset_months
                )));
            }
        }

        if let MetadataSelection::Selected { fields } = &self.metadata {
            if let Some(field) = fields.iter().find(|f| f.display_name.trim().is_empty()) {
                return Err(McuError::InvalidProfile(format!(
                    "selected metadata field with rule {:?} has an empty display name",
                    field.rule
                )));
            }
        }

        if let MetadataSelection::Ordered { columns } = &self.metadata {
            if columns.is_empty() {
                return Err(McuError::InvalidProfile(
                    "ordered metadata selection lists no columns".to_string(),
                ));
            }
            if columns.iter().any(|c| c.trim().is_empty()) {
                return Err(McuError::InvalidProfile(
                    "ordered metadata selection contains a blank column name".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(TransformProfile)
    }

    pub fn schema_as_json() -> Result<String> {
        let schema = Self::generate_json_schema();
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

/// Layout of a brand's buy sheet for the buy sheet to PLM upload conversion.
///
/// Rows are counted over the whole grid: row 0 is the first non-blank row of
/// the sheet, row 1 the next, and so on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct PlmUploadProfile {
    #[schemars(description = "Brand or tenant label, used in log lines only")]
    pub name: String,

    #[schemars(description = "Grid row holding the column names; data starts on the next row")]
    #[serde(default)]
    pub header_row: usize,

    #[schemars(
        description = "Grid row listing the month columns to keep (first cell skipped). When absent, month-like headers are used"
    )]
    #[serde(default)]
    pub month_row: Option<usize>,

    #[schemars(description = "Keywords locating the style column")]
    #[serde(default)]
    pub style_rule: KeywordRule,

    #[schemars(description = "Use the first non-month column when no header matches `style_rule`")]
    #[serde(default)]
    pub style_fallback_first_column: bool,

    #[schemars(description = "Output name of the style column")]
    pub style_output_name: String,

    #[serde(default)]
    pub nbsp: NbspPolicy,
}

impl PlmUploadProfile {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(McuError::InvalidProfile(
                "profile name must not be empty".to_string(),
            ));
        }
        if self.style_output_name.trim().is_empty() {
            return Err(McuError::InvalidProfile(
                "style_output_name must not be empty".to_string(),
            ));
        }
        if self.style_rule.is_empty() && !self.style_fallback_first_column {
            return Err(McuError::InvalidProfile(
                "style_rule is empty and first-column fallback is off".to_string(),
            ));
        }
        if self.month_row == Some(self.header_row) {
            return Err(McuError::InvalidProfile(format!(
                "month_row and header_row are both {}",
                self.header_row
            )));
        }
        Ok(())
    }
}
