use std::collections::BTreeMap;

use kube::api::{DynamicObject, ObjectMeta};
use serde_json::{Value, json};

use crate::kind::KindMetadata;

/// Instance of a custom resource definition
#[derive(Debug, Clone, PartialEq)]
pub struct CustomResource {
    pub kind: KindMetadata,
    pub metadata: ObjectMeta,
    pub spec: Value,
}

impl CustomResource {
    pub fn new(kind: KindMetadata, name: &str, spec: Value) -> Self {
        Self {
            kind,
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                ..Default::default()
            },
            spec,
        }
    }

    pub fn within(mut self, namespace: &str) -> Self {
        self.metadata.namespace = Some(namespace.to_owned());
        self
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        if !labels.is_empty() {
            self.metadata.labels = Some(labels);
        }
        self
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }

    /// Request body for create and replace calls
    pub fn to_value(&self) -> Value {
        json!({
            "apiVersion": self.kind.api_version(),
            "kind": self.kind.kind,
            "metadata": self.metadata,
            "spec": self.spec,
        })
    }

    pub fn to_dynamic_object(&self) -> DynamicObject {
        let mut object = DynamicObject::new(self.name(), &self.kind.api_resource())
            .data(json!({ "spec": self.spec }));
        object.metadata = self.metadata.clone();
        object
    }
}

/// Value at a dotted path such as `status.zenStatus`
pub fn lookup<'a>(object: &'a Value, dotted_path: &str) -> Option<&'a Value> {
    dotted_path
        .split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(object, |value, segment| value.get(segment))
}
