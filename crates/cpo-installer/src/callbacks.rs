//! Completion predicates for installer watches
use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use cpo_openshift::{EventType, KindMetadata, ResourceEvent, WatchHandler, lookup};
use cpo_types::defaults::COMPLETED_STATUS;

/// Done once every expected CRD kind was seen in an ADDED event
#[derive(Debug)]
pub struct CrdsCreated {
    expected: BTreeSet<String>,
    encountered: BTreeSet<String>,
}

impl CrdsCreated {
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expected: kinds.into_iter().map(Into::into).collect(),
            encountered: BTreeSet::new(),
        }
    }

    pub fn expected(&self) -> impl Iterator<Item = &str> {
        self.expected.iter().map(String::as_str)
    }

    pub fn is_done(&self) -> bool {
        self.encountered == self.expected
    }
}

impl WatchHandler for CrdsCreated {
    fn on_event(&mut self, event: &ResourceEvent, _kind: &KindMetadata) -> cpo_openshift::Result<bool> {
        if event.event_type == EventType::Added {
            if let Some(kind) = lookup(&event.object, "spec.names.kind").and_then(Value::as_str) {
                if self.expected.contains(kind) && self.encountered.insert(kind.to_owned()) {
                    debug!(kind, "custom resource definition available");
                }
            }
        }
        Ok(self.is_done())
    }
}

/// Done once the named resource reports `Completed` at `status_path`
#[derive(Debug)]
pub struct CrCompleted {
    name: String,
    status_path: String,
    last_status: Option<String>,
}

impl CrCompleted {
    pub fn new(name: &str, status_path: &str) -> Self {
        Self {
            name: name.to_owned(),
            status_path: status_path.to_owned(),
            last_status: None,
        }
    }

    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }
}

impl WatchHandler for CrCompleted {
    fn on_event(&mut self, event: &ResourceEvent, kind: &KindMetadata) -> cpo_openshift::Result<bool> {
        if event.event_type == EventType::Deleted || event.name() != Some(self.name.as_str()) {
            return Ok(false);
        }
        let status = lookup(&event.object, &self.status_path).and_then(Value::as_str);
        if status != self.last_status.as_deref() {
            debug!(%kind, name = %self.name, ?status, "status changed");
            self.last_status = status.map(str::to_owned);
        }
        Ok(status == Some(COMPLETED_STATUS))
    }
}
