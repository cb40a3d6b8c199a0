//! Custom resource spec assembly
use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOption {
    StorageClass(String),
    StorageVendor(String),
}

impl StorageOption {
    fn key(&self) -> &'static str {
        match self {
            Self::StorageClass(_) => "storageClass",
            Self::StorageVendor(_) => "storageVendor",
        }
    }

    fn value(&self) -> &str {
        match self {
            Self::StorageClass(value) | Self::StorageVendor(value) => value,
        }
    }
}

impl fmt::Display for StorageOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key(), self.value())
    }
}

/// Interpret a command-line option value: JSON scalars and documents are
/// taken as such, anything else is a string.
pub fn parse_option_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

/// Build a spec from `template`.
///
/// `options` are dotted paths (an optional leading `spec.` is dropped)
/// applied in key order. Intermediate objects are created as needed and a
/// non-object on the way is replaced.
pub fn assemble_spec(
    template: &Map<String, Value>,
    license: &str,
    options: &BTreeMap<String, Value>,
    storage: Option<&StorageOption>,
) -> Value {
    let mut spec = template.clone();
    spec.insert(
        "license".to_owned(),
        json!({"accept": true, "license": license}),
    );
    for (path, value) in options {
        let path = path.strip_prefix("spec.").unwrap_or(path);
        insert_dotted(&mut spec, path, value.clone());
    }
    if let Some(storage) = storage {
        spec.insert(storage.key().to_owned(), Value::String(storage.value().to_owned()));
    }
    Value::Object(spec)
}

fn insert_dotted(object: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            object.insert(path.to_owned(), value);
        }
        Some((head, rest)) => {
            let child = object
                .entry(head.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_dotted(child, rest, value);
            }
        }
    }
}
