use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One field data array, numeric or textual (e.g. `time_units`, `current_date`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldArray {
    Numbers(Vec<f64>),
    Strings(Vec<String>),
}

/// What the host hands over for one dataset: its time steps, the dataset wide
/// field data, and whatever else it carries (passed through untouched).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub time_steps: Vec<f64>,

    #[serde(default)]
    pub field_data: BTreeMap<String, FieldArray>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Dataset {
    pub fn new(time_steps: Vec<f64>) -> Self {
        Dataset { time_steps, ..Default::default() }
    }

    pub fn set_string_field(&mut self, name: &str, value: impl Into<String>) {
        self.field_data.insert(name.to_string(), FieldArray::Strings(vec![value.into()]));
    }

    pub fn string_field(&self, name: &str) -> Option<&str> {
        match self.field_data.get(name)? {
            FieldArray::Strings(values) => values.first().map(String::as_str),
            FieldArray::Numbers(_) => None,
        }
    }

    /// drop all field data arrays whose name matches `pred`, returning the dropped names
    pub fn remove_fields<F: Fn(&str) -> bool>(&mut self, pred: F) -> Vec<String> {
        let names: Vec<String> = self.field_data.keys().filter(|k| pred(k)).cloned().collect();
        for name in &names {
            self.field_data.remove(name);
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_passthrough() {
        let json = r#"{
            "time_steps": [0, 1],
            "field_data": { "time_units": ["days since 2000-01-01"], "scale": [1.5] },
            "name": "sst",
            "dimensions": { "lat": 180, "lon": 360 }
        }"#;
        let ds: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(ds.time_steps, vec![0.0, 1.0]);
        assert_eq!(ds.string_field("time_units"), Some("days since 2000-01-01"));
        assert_eq!(ds.field_data["scale"], FieldArray::Numbers(vec![1.5]));
        assert_eq!(ds.other["name"], "sst");

        let back: Dataset = serde_json::from_str(&serde_json::to_string(&ds).unwrap()).unwrap();
        assert_eq!(back, ds);
    }

    #[test]
    fn test_remove_fields() {
        let mut ds = Dataset::new(vec![0.0]);
        ds.set_string_field("time_units", "hours since 1970-01-01");
        ds.set_string_field("Time:Units", "hours since 1970-01-01");
        ds.set_string_field("title", "x");

        let mut removed = ds.remove_fields(|name| name.starts_with('t') || name.starts_with('T'));
        removed.sort();
        assert_eq!(removed, vec!["Time:Units", "time_units", "title"]);
        assert!(ds.field_data.is_empty());
    }
}
