//! Instrument code mapping
//!
//! Translates analyzer test identifiers into template field names and
//! coerces values to each field's declared type. Hematology analyzers
//! decorate their codes with component delimiters (`^^^^WBC^1` is the WBC
//! channel at dilution 1), so the static table carries both the decorated
//! and bare forms.

use labwire_types::{ExtractedResult, FieldType, FieldValue, TemplateData, TemplateStructure};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Sysmex XN-series test codes to canonical field names.
static INSTRUMENT_CODE_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Basic parameters
        ("^^^^WBC^1", "WBC"),
        ("^^^^RBC^1", "RBC"),
        ("^^^^HGB^1", "HGB"),
        ("^^^^HCT^1", "HCT"),
        ("^^^^MCV^1", "MCV"),
        ("^^^^MCH^1", "MCH"),
        ("^^^^MCHC^1", "MCHC"),
        ("^^^^PLT^1", "PLT"),
        // Differential count, absolute
        ("^^^^NEUT#^1", "NEUT#"),
        ("^^^^LYMPH#^1", "LYMPH#"),
        ("^^^^MONO#^1", "MONO#"),
        ("^^^^EO#^1", "EO#"),
        ("^^^^BASO#^1", "BASO#"),
        // Differential count, percent
        ("^^^^NEUT%^1", "NEUT%"),
        ("^^^^LYMPH%^1", "LYMPH%"),
        ("^^^^MONO%^1", "MONO%"),
        ("^^^^EO%^1", "EO%"),
        ("^^^^BASO%^1", "BASO%"),
        // Immature granulocytes
        ("^^^^IG#^1", "IG#"),
        ("^^^^IG%^1", "IG%"),
        // Undecorated forms, for instruments configured without the
        // component prefix/dilution suffix
        ("WBC", "WBC"),
        ("RBC", "RBC"),
        ("HGB", "HGB"),
        ("HCT", "HCT"),
        ("MCV", "MCV"),
        ("MCH", "MCH"),
        ("MCHC", "MCHC"),
        ("PLT", "PLT"),
        ("NEUT#", "NEUT#"),
        ("LYMPH#", "LYMPH#"),
        ("MONO#", "MONO#"),
        ("EO#", "EO#"),
        ("BASO#", "BASO#"),
        ("NEUT%", "NEUT%"),
        ("LYMPH%", "LYMPH%"),
        ("MONO%", "MONO%"),
        ("EO%", "EO%"),
        ("BASO%", "BASO%"),
        ("IG#", "IG#"),
        ("IG%", "IG%"),
    ])
});

/// Resolve an instrument test identifier to a template field name:
/// exact table match, then case-insensitive table match, then a direct
/// match against the template's own declared field names.
fn resolve_field_name<'a>(test_id: &str, template: &'a TemplateStructure) -> Option<&'a str> {
    if let Some(name) = INSTRUMENT_CODE_MAP.get(test_id).copied() {
        return Some(name);
    }
    for (code, name) in INSTRUMENT_CODE_MAP.iter() {
        if code.eq_ignore_ascii_case(test_id) {
            return Some(*name);
        }
    }
    template.field(test_id).map(|f| f.name.as_str())
}

/// Map an extracted transmission onto a template.
///
/// Unmappable codes are skipped without blocking the rest of the
/// transmission. Values for numeric fields are coerced to `f64`; a value
/// that fails coercion is kept as its raw string with a warning, never
/// dropped. A non-empty abnormal flag is stored as a message when the
/// template declares a `"<Field> IP Message"` slot for it.
pub fn map_to_template(
    extracted: &ExtractedResult,
    template: &TemplateStructure,
) -> TemplateData {
    let mut data = TemplateData::default();

    for (test_id, value) in &extracted.results {
        let Some(field_name) = resolve_field_name(test_id, template) else {
            debug!(%test_id, "no mapping for instrument code, skipping");
            continue;
        };
        let Some(field) = template.field(field_name) else {
            debug!(%test_id, field_name, "template does not declare mapped field, skipping");
            continue;
        };

        let stored = match field.field_type {
            FieldType::Numeric => match value.trim().parse::<f64>() {
                Ok(numeric) => FieldValue::Number(numeric),
                Err(_) => {
                    warn!(
                        %test_id,
                        field = %field.name,
                        %value,
                        "non-numeric value for numeric field, keeping raw string"
                    );
                    FieldValue::Text(value.clone())
                }
            },
            FieldType::Text => FieldValue::Text(value.clone()),
        };
        data.field_values.insert(field.name.clone(), stored);

        if let Some(flags) = extracted.flags.get(test_id) {
            if !flags.trim().is_empty() {
                let message_name = format!("{} IP Message", field.name);
                if template.has_message_field(&message_name) {
                    data.messages.insert(message_name, flags.clone());
                }
            }
        }
    }

    data.sample_no = if extracted.sample_id.is_empty() {
        extracted.specimen_id.clone()
    } else {
        extracted.sample_id.clone()
    };
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use labwire_codec::{extract_results, parse_frame};
    use labwire_types::{MessageField, TemplateField};

    fn cbc_template() -> TemplateStructure {
        TemplateStructure {
            fields: vec![
                TemplateField {
                    name: "WBC".to_string(),
                    label: "White Blood Cells".to_string(),
                    field_type: FieldType::Numeric,
                    unit: "10^3/uL".to_string(),
                    reference_min: Some(3.0),
                    reference_max: Some(15.0),
                },
                TemplateField {
                    name: "RBC".to_string(),
                    label: "Red Blood Cells".to_string(),
                    field_type: FieldType::Numeric,
                    unit: "10^6/uL".to_string(),
                    reference_min: Some(2.5),
                    reference_max: Some(5.5),
                },
                TemplateField {
                    name: "MORPH".to_string(),
                    label: "Morphology".to_string(),
                    field_type: FieldType::Text,
                    unit: String::new(),
                    reference_min: None,
                    reference_max: None,
                },
            ],
            message_fields: vec![MessageField {
                name: "WBC IP Message".to_string(),
            }],
        }
    }

    #[test]
    fn end_to_end_wire_bytes_map_onto_the_template() {
        let payload =
            b"\x02O|1||^^^251100001^M|^^^^WBC^1|R||\rR|1|^^^^WBC^1|4.79|10^3/uL|3.0-15.0|N|F\rL|1|N\x03";
        // Strip the frame delimiters the way the decoder would
        let frame = &payload[1..payload.len() - 1];

        let records = parse_frame(frame);
        assert_eq!(records.len(), 3);

        let extracted = extract_results(&records);
        assert_eq!(extracted.sample_id, "251100001");
        assert_eq!(extracted.results["^^^^WBC^1"], "4.79");

        let data = map_to_template(&extracted, &cbc_template());
        assert_eq!(data.field_values["WBC"], FieldValue::Number(4.79));
        assert_eq!(data.sample_no, "251100001");
    }

    #[test]
    fn decorated_bare_and_case_variant_codes_all_resolve() {
        let frame = b"R|1|^^^^WBC^1|4.79\rR|1|rbc|3.61";
        let extracted = extract_results(&parse_frame(frame));
        let data = map_to_template(&extracted, &cbc_template());

        assert_eq!(data.field_values["WBC"], FieldValue::Number(4.79));
        assert_eq!(data.field_values["RBC"], FieldValue::Number(3.61));
    }

    #[test]
    fn template_declared_names_resolve_without_a_table_entry() {
        let frame = b"R|1|MORPH|hypochromic";
        let extracted = extract_results(&parse_frame(frame));
        let data = map_to_template(&extracted, &cbc_template());
        assert_eq!(
            data.field_values["MORPH"],
            FieldValue::Text("hypochromic".to_string())
        );
    }

    #[test]
    fn unmappable_code_skips_without_blocking_the_rest() {
        let frame = b"R|1|^^^^XYZ^1|1.23\rR|1|^^^^WBC^1|4.79";
        let extracted = extract_results(&parse_frame(frame));
        let data = map_to_template(&extracted, &cbc_template());

        assert_eq!(data.field_values.len(), 1);
        assert_eq!(data.field_values["WBC"], FieldValue::Number(4.79));
    }

    #[test]
    fn non_numeric_value_is_kept_as_raw_string() {
        let frame = b"R|1|^^^^WBC^1|++++";
        let extracted = extract_results(&parse_frame(frame));
        let data = map_to_template(&extracted, &cbc_template());
        assert_eq!(
            data.field_values["WBC"],
            FieldValue::Text("++++".to_string())
        );
    }

    #[test]
    fn abnormal_flag_lands_in_the_declared_message_slot() {
        let frame = b"R|1|^^^^WBC^1|21.5|10^3/uL|3.0-15.0|H|F\rR|1|^^^^RBC^1|1.2|10^6/uL|2.5-5.5|L|F";
        let extracted = extract_results(&parse_frame(frame));
        let data = map_to_template(&extracted, &cbc_template());

        assert_eq!(data.messages["WBC IP Message"], "H");
        // RBC has a flag but no declared message slot
        assert_eq!(data.messages.len(), 1);
    }

    #[test]
    fn sample_no_falls_back_to_specimen_id() {
        let extracted = ExtractedResult {
            specimen_id: "SM-4412".to_string(),
            ..ExtractedResult::default()
        };
        let data = map_to_template(&extracted, &cbc_template());
        assert_eq!(data.sample_no, "SM-4412");
    }
}
