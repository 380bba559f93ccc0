use serde_json::{Map, Value};

use super::schema::LeadSchema;

/// Field values captured from a single provider reply, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedRecord {
    values: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordGap {
    MissingField(String),
}

impl CollectedRecord {
    /// Builds a record from the object stored under the marker key.
    ///
    /// Keys outside the schema are dropped. Optional fields that are absent
    /// become empty strings; a missing or blank mandatory field is a gap.
    pub fn from_payload(schema: &LeadSchema, payload: &Map<String, Value>) -> Result<Self, RecordGap> {
        let mut values = Vec::with_capacity(schema.fields.len());

        for field in &schema.fields {
            let value = payload
                .get(&field.name)
                .and_then(scalar_to_string)
                .map(|value| value.trim().to_string())
                .unwrap_or_default();

            if value.is_empty() && field.is_mandatory() {
                return Err(RecordGap::MissingField(field.name.clone()));
            }

            values.push((field.name.clone(), value));
        }

        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
