//! Result templates and the persisted result document
//!
//! A template is the lab's definition of which fields a procedure reports.
//! Templates are owned and maintained by the host system; this core only
//! reads them. `TemplateData` is the document that actually gets persisted
//! and incrementally merged as transmissions arrive.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declared type of a template field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Numeric,
    Text,
}

/// One expected result field of a procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub reference_min: Option<f64>,
    #[serde(default)]
    pub reference_max: Option<f64>,
}

/// A free-text message slot a template declares alongside its fields,
/// e.g. `"WBC IP Message"` for instrument interpretive flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageField {
    pub name: String,
}

/// Ordered field definitions for one procedure. Read-only to this core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateStructure {
    #[serde(default)]
    pub fields: Vec<TemplateField>,
    #[serde(default)]
    pub message_fields: Vec<MessageField>,
}

impl TemplateStructure {
    /// Look up a field definition by exact name.
    pub fn field(&self, name: &str) -> Option<&TemplateField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether the template declares a message slot with this exact name.
    pub fn has_message_field(&self, name: &str) -> bool {
        self.message_fields.iter().any(|m| m.name == name)
    }
}

/// A stored field value: the document holds bare JSON numbers for numeric
/// fields and strings for everything else (including numeric values that
/// failed coercion and were kept raw).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

/// The persisted result document for one lab-result row.
///
/// Created when the row is first issued a sample number and mutated
/// incrementally: each analyzer transmission overwrites only the keys it
/// produced, so values entered by hand or by earlier transmissions persist
/// until something replaces them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateData {
    #[serde(default)]
    pub field_values: HashMap<String, FieldValue>,
    #[serde(default)]
    pub messages: HashMap<String, String>,
    #[serde(default)]
    pub validated_by: String,
    #[serde(default)]
    pub sample_no: String,
}

impl TemplateData {
    /// Merge `incoming` into this document, key by key.
    ///
    /// Field-level overwrite, never document replacement: keys present in
    /// `incoming` replace their counterparts, untouched keys and
    /// `validated_by` are preserved, and an empty incoming `sample_no` keeps
    /// the existing one. Merging the same input twice is idempotent.
    pub fn merge_from(&mut self, incoming: TemplateData) {
        for (name, value) in incoming.field_values {
            self.field_values.insert(name, value);
        }
        for (name, text) in incoming.messages {
            self.messages.insert(name, text);
        }
        if !incoming.sample_no.trim().is_empty() {
            self.sample_no = incoming.sample_no;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming() -> TemplateData {
        TemplateData {
            field_values: HashMap::from([
                ("WBC".to_string(), FieldValue::Number(4.79)),
                ("RBC".to_string(), FieldValue::Number(3.61)),
            ]),
            messages: HashMap::from([("WBC IP Message".to_string(), "L".to_string())]),
            validated_by: String::new(),
            sample_no: "251100001".to_string(),
        }
    }

    #[test]
    fn merge_overwrites_only_incoming_keys() {
        let mut doc = TemplateData {
            field_values: HashMap::from([
                ("WBC".to_string(), FieldValue::Number(9.9)),
                ("PLT".to_string(), FieldValue::Number(150.0)),
            ]),
            messages: HashMap::new(),
            validated_by: "Dr. Mensah".to_string(),
            sample_no: "251100001".to_string(),
        };

        doc.merge_from(incoming());

        assert_eq!(doc.field_values["WBC"], FieldValue::Number(4.79));
        assert_eq!(doc.field_values["PLT"], FieldValue::Number(150.0));
        assert_eq!(doc.field_values["RBC"], FieldValue::Number(3.61));
        assert_eq!(doc.messages["WBC IP Message"], "L");
        assert_eq!(doc.validated_by, "Dr. Mensah");
    }

    #[test]
    fn merge_is_idempotent() {
        let mut once = TemplateData::default();
        once.merge_from(incoming());

        let mut twice = TemplateData::default();
        twice.merge_from(incoming());
        twice.merge_from(incoming());

        assert_eq!(once, twice);
    }

    #[test]
    fn empty_incoming_sample_no_keeps_existing() {
        let mut doc = TemplateData {
            sample_no: "251100001".to_string(),
            ..TemplateData::default()
        };
        let mut update = incoming();
        update.sample_no = "  ".to_string();

        doc.merge_from(update);

        assert_eq!(doc.sample_no, "251100001");
    }

    #[test]
    fn field_value_serializes_untagged() {
        let doc = TemplateData {
            field_values: HashMap::from([
                ("WBC".to_string(), FieldValue::Number(4.79)),
                ("MORPH".to_string(), FieldValue::Text("normal".to_string())),
            ]),
            ..TemplateData::default()
        };

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["field_values"]["WBC"], serde_json::json!(4.79));
        assert_eq!(json["field_values"]["MORPH"], serde_json::json!("normal"));

        let back: TemplateData = serde_json::from_value(json).unwrap();
        assert_eq!(back.field_values, doc.field_values);
    }

    #[test]
    fn template_field_type_defaults_to_numeric() {
        let structure: TemplateStructure = serde_json::from_str(
            r#"{"fields": [{"name": "WBC", "unit": "10^3/uL"}], "message_fields": []}"#,
        )
        .unwrap();
        assert_eq!(structure.fields[0].field_type, FieldType::Numeric);
    }
}
