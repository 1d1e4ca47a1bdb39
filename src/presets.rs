//! Built-in brand profiles.
//!
//! Each preset is a plain [`TransformProfile`] value. They can be serialized
//! with [`TransformProfile::to_json`] and edited into a tenant's own profile.

use crate::schema::{
    AdjustmentMode, InputShape, KeywordRule, MetadataSelection, NamedField, NbspPolicy,
    PlmUploadProfile, RoleRules, TransformProfile, ZeroQuantityPolicy,
};

pub const PRESET_NAMES: [&str; 5] = [
    "ndc_lead_time",
    "pink_bra",
    "vspink_buy_sheet",
    "vs_bra",
    "plm_download",
];

/// Wide NDC sheets: month headers in place, months shifted back by the
/// supplier lead time.
pub fn ndc_lead_time() -> TransformProfile {
    TransformProfile {
        name: "NDC".to_string(),
        shape: InputShape::Wide,
        adjustment: AdjustmentMode::LeadTimeAdjusted,
        ..TransformProfile::default()
    }
}

/// Pink Bra buy sheets: long shape, fixed output columns under canonical names.
pub fn pink_bra() -> TransformProfile {
    let mut rules = RoleRules::default();
    rules.article_id = KeywordRule::new(
        &[&["article", "no"], &["article", "number"]],
        &["article", "articleno"],
    );
    rules.supplier_country = KeywordRule::new(
        &[&["supplier", "country"]],
        &["suppliercoo", "country"],
    );

    TransformProfile {
        name: "Pink Bra".to_string(),
        rules,
        shape: InputShape::Long,
        metadata: MetadataSelection::Selected {
            fields: vec![
                named("Measurement", &["measurement", "measure"]),
                named("Type of Cons1", &["type_of_cons", "typeofcons", "type_of_const"]),
                named("Plant", &["plant", "production_plant", "plant_name"]),
            ],
        },
        canonical_names: true,
        ..TransformProfile::default()
    }
}

/// VS Pink apparel and brief buy sheets: long shape, every other column kept.
pub fn vspink_buy_sheet() -> TransformProfile {
    TransformProfile {
        name: "VS Pink".to_string(),
        shape: InputShape::Long,
        ..TransformProfile::default()
    }
}

/// VS Bra bucket sheets: "Supplier Name" and "Vendor" both present, dates in
/// "REQ. Ex-mill Date", quantities in "Requirement (M)".
pub fn vs_bra() -> TransformProfile {
    let mut rules = RoleRules::default();
    rules.supplier = KeywordRule::new(&[&["supplier", "name"]], &["supplier"]);
    rules.supplier_country = KeywordRule::new(&[&["supplier", "country"]], &["coo", "country"]);
    rules.quantity = KeywordRule::new(&[&["requirement"]], &["qty", "quantity"]);

    TransformProfile {
        name: "VS Bra".to_string(),
        rules,
        shape: InputShape::Long,
        ..TransformProfile::default()
    }
}

/// Metadata columns a PLM download keeps, in output order.
pub const PLM_COLUMNS: [&str; 12] = [
    "Season",
    "Style",
    "BOM",
    "Cycle",
    "Article",
    "Type of Const 1",
    "Supplier",
    "UOM",
    "Composition",
    "Measurement",
    "Supplier Country",
    "Avg YY",
];

/// PLM downloads (SOMA, La Senza, Tommy, CK, DBI, M&S): wide month headers
/// with pivot "Sum of" columns dropped and zero cells kept. Only the
/// [`PLM_COLUMNS`] that exist are carried, in that order.
pub fn plm_download() -> TransformProfile {
    TransformProfile {
        name: "PLM Download".to_string(),
        shape: InputShape::Wide,
        drop_summary_columns: true,
        zero_quantities: ZeroQuantityPolicy::Retain,
        metadata: MetadataSelection::Ordered {
            columns: PLM_COLUMNS.iter().map(|c| c.to_string()).collect(),
        },
        ..TransformProfile::default()
    }
}

/// Looks up a preset by name. Case, spaces and hyphens are ignored.
pub fn by_name(name: &str) -> Option<TransformProfile> {
    match normalize(name).as_str() {
        "ndc_lead_time" | "ndc" => Some(ndc_lead_time()),
        "pink_bra" => Some(pink_bra()),
        "vspink_buy_sheet" | "vspink" | "vs_pink" => Some(vspink_buy_sheet()),
        "vs_bra" => Some(vs_bra()),
        "plm_download" | "plm" => Some(plm_download()),
        _ => None,
    }
}

pub const UPLOAD_PRESET_NAMES: [&str; 2] = ["tommy_eu", "lasenza"];

/// Tommy EU buy sheets: buy months on the first row, a PO proposal row, then
/// the real headers. The style is the "Generic Article" column.
pub fn tommy_eu_upload() -> PlmUploadProfile {
    PlmUploadProfile {
        name: "Tommy EU".to_string(),
        header_row: 2,
        month_row: Some(0),
        style_rule: KeywordRule::new(&[], &["generic article"]),
        style_fallback_first_column: true,
        style_output_name: "Style number".to_string(),
        nbsp: NbspPolicy::Space,
    }
}

/// La Senza buy sheets: headers on the first row with three-letter months.
pub fn lasenza_upload() -> PlmUploadProfile {
    PlmUploadProfile {
        name: "La Senza".to_string(),
        header_row: 0,
        month_row: None,
        style_rule: KeywordRule::new(&[&["product", "number"]], &[]),
        style_fallback_first_column: false,
        style_output_name: "Style Number".to_string(),
        nbsp: NbspPolicy::Space,
    }
}

pub fn upload_by_name(name: &str) -> Option<PlmUploadProfile> {
    match normalize(name).as_str() {
        "tommy_eu" | "tommy" => Some(tommy_eu_upload()),
        "lasenza" | "la_senza" => Some(lasenza_upload()),
        _ => None,
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn named(display_name: &str, any: &[&str]) -> NamedField {
    NamedField {
        display_name: display_name.to_string(),
        rule: KeywordRule::new(&[], any),
    }
}
