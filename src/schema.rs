//! Static description of the data an audit report must yield.
//!
//! Fields are listed in schema order; validation messages report defects in
//! this order.

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Equipment count
    Count,
    /// Free-form operating schedule, e.g. "24/7" or "08:00-18:00"
    HourRange,
    Float,
    /// One float per chiller; length must equal `how_many_chiller`
    PerChiller,
}

impl FieldKind {
    fn type_hint(self) -> &'static str {
        match self {
            FieldKind::Count => "integer",
            FieldKind::HourRange => "string",
            FieldKind::Float => "number",
            FieldKind::PerChiller => "array of numbers, one per chiller",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub label: &'static str,
}

const fn field(name: &'static str, kind: FieldKind, label: &'static str) -> FieldSpec {
    FieldSpec { name, kind, label }
}

pub const SITE_META_DATA: &str = "site_meta_data";
pub const TECHNICAL_DATA: &str = "technical_data";

/// Key in `site_meta_data` every per-chiller sequence is measured against.
pub const CHILLER_COUNT_FIELD: &str = "how_many_chiller";

pub static SITE_META_FIELDS: [FieldSpec; 9] = [
    field(CHILLER_COUNT_FIELD, FieldKind::Count, "How many chillers"),
    field("how_many_pchp", FieldKind::Count, "How many primary chilled water pumps"),
    field("how_many_vsd_pchp", FieldKind::Count, "How many primary chilled water pumps with VSD"),
    field("how_many_schp", FieldKind::Count, "How many secondary chilled water pumps"),
    field("how_many_vsd_schp", FieldKind::Count, "How many secondary chilled water pumps with VSD"),
    field("how_many_cdp", FieldKind::Count, "How many condenser water pumps"),
    field("how_many_vsd_cdp", FieldKind::Count, "How many condenser water pumps with VSD"),
    field("how_many_cooling_tower", FieldKind::Count, "How many cooling towers"),
    field("operation_hour", FieldKind::HourRange, "Plant operation hours"),
];

pub static TECHNICAL_FIELDS: [FieldSpec; 10] = [
    field("average_ton", FieldKind::Float, "Average cooling load (RT)"),
    field("average_kw", FieldKind::Float, "Average plant power (kW)"),
    field("average_kw_per_ton", FieldKind::Float, "Average efficiency (kW/RT)"),
    field("each_chiller_chs_temp", FieldKind::PerChiller, "Chilled water supply temperature of each chiller"),
    field("each_chiller_chr_temp", FieldKind::PerChiller, "Chilled water return temperature of each chiller"),
    field("each_chiller_chwdelta_temp", FieldKind::PerChiller, "Chilled water delta-T of each chiller"),
    field("each_chiller_cds_temp", FieldKind::PerChiller, "Condenser water supply temperature of each chiller"),
    field("each_chiller_cdr_temp", FieldKind::PerChiller, "Condenser water return temperature of each chiller"),
    field("each_chiller_cdwdelta_temp", FieldKind::PerChiller, "Condenser water delta-T of each chiller"),
    field("each_chiller_setpoint", FieldKind::PerChiller, "Chilled water setpoint of each chiller"),
];

/// Requested from the model but never required for acceptance.
pub static OPTIONAL_TECHNICAL_FIELDS: [FieldSpec; 1] = [field(
    "site_wetbulb_temperature",
    FieldKind::Float,
    "Site wet-bulb temperature",
)];

pub fn per_chiller_fields() -> impl Iterator<Item = &'static FieldSpec> {
    TECHNICAL_FIELDS
        .iter()
        .filter(|f| f.kind == FieldKind::PerChiller)
}

/// Renders the schema as the JSON skeleton shown to the extractor model.
pub fn render_prompt_schema() -> String {
    let mut out = String::from("{\n");
    render_section(&mut out, SITE_META_DATA, SITE_META_FIELDS.iter(), true);
    render_section(
        &mut out,
        TECHNICAL_DATA,
        TECHNICAL_FIELDS.iter().chain(OPTIONAL_TECHNICAL_FIELDS.iter()),
        false,
    );
    out.push('}');
    out
}

fn render_section<'a>(
    out: &mut String,
    section: &str,
    fields: impl Iterator<Item = &'a FieldSpec>,
    trailing_comma: bool,
) {
    let _ = writeln!(out, "  \"{section}\": {{");
    let fields: Vec<_> = fields.collect();
    for (idx, spec) in fields.iter().enumerate() {
        let sep = if idx + 1 < fields.len() { "," } else { "" };
        let _ = writeln!(
            out,
            "    \"{}\": \"{} ({})\"{}",
            spec.name,
            spec.label,
            spec.kind.type_hint(),
            sep
        );
    }
    let _ = writeln!(out, "  }}{}", if trailing_comma { "," } else { "" });
}
