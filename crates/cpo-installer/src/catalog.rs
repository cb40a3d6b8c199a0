//!
//! # Service catalog
//!
//! Installable services and the operators behind them, loaded from the two
//! JSON documents bundled with the binary.
//!
use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use cpo_openshift::{CatalogSourceRequest, KindMetadata, SubscriptionRequest};
use cpo_types::defaults::{FOUNDATIONAL_SERVICES_PROJECT, OPENSHIFT_MARKETPLACE_NAMESPACE};

use crate::error::{InstallError, Result};

const CUSTOM_RESOURCES: &str = include_str!("../resources/cpd-custom-resources.json");
const SUBSCRIPTIONS: &str = include_str!("../resources/cpd-subscriptions.json");

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomResourceMetadata {
    pub description: String,
    pub group: String,
    pub kind: String,
    pub licenses: Vec<String>,
    /// name of the custom resource instance
    pub name: String,
    pub operator_name: String,
    pub plural: String,
    pub spec: serde_json::Map<String, Value>,
    pub status_key_name: String,
    pub storage_option_required: bool,
    pub version: String,
}

impl CustomResourceMetadata {
    pub fn kind_metadata(&self) -> KindMetadata {
        KindMetadata::new(&self.group, &self.kind, &self.plural, &self.version)
    }

    /// `<plural>.<group>`
    pub fn crd_name(&self) -> String {
        self.kind_metadata().to_string()
    }

    /// `status.<status_key_name>`
    pub fn status_path(&self) -> String {
        format!("status.{}", self.status_key_name)
    }

    pub fn check_license(&self, service: &str, license: &str) -> Result<()> {
        if self.licenses.iter().any(|allowed| allowed == license) {
            Ok(())
        } else {
            Err(InstallError::UnsupportedLicense {
                service: service.to_owned(),
                license: license.to_owned(),
                supported: self.licenses.join(", "),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSourceMetadata {
    pub display_name: String,
    pub image: String,
    pub name: String,
    pub publisher: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionMetadata {
    #[serde(default)]
    pub catalog_source: Option<CatalogSourceMetadata>,
    pub channel: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// subscription name
    pub name: String,
    pub package: String,
    #[serde(default)]
    pub required_namespace: Option<String>,
    pub source: String,
}

impl SubscriptionMetadata {
    /// Project the subscription is created in
    pub fn namespace(&self) -> &str {
        self.required_namespace
            .as_deref()
            .unwrap_or(FOUNDATIONAL_SERVICES_PROJECT)
    }

    pub fn subscription_request(&self) -> SubscriptionRequest {
        SubscriptionRequest {
            name: self.name.clone(),
            package: self.package.clone(),
            channel: self.channel.clone(),
            source: self.source.clone(),
            source_namespace: OPENSHIFT_MARKETPLACE_NAMESPACE.to_owned(),
            labels: self.labels.clone(),
        }
    }

    pub fn catalog_source_request(&self) -> Option<CatalogSourceRequest> {
        self.catalog_source.as_ref().map(|source| {
            CatalogSourceRequest::new(
                &source.name,
                &source.display_name,
                &source.image,
                &source.publisher,
            )
        })
    }

    /// Name of the OLM `Operator` object, `<package>.<namespace>`
    pub fn operator_object_name(&self) -> String {
        format!("{}.{}", self.package, self.namespace())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCatalog {
    custom_resources: BTreeMap<String, CustomResourceMetadata>,
    subscriptions: BTreeMap<String, SubscriptionMetadata>,
}

impl ServiceCatalog {
    /// Catalog bundled with the binary
    pub fn bundled() -> Result<Self> {
        Self::from_json(CUSTOM_RESOURCES, SUBSCRIPTIONS)
    }

    pub fn from_json(custom_resources: &str, subscriptions: &str) -> Result<Self> {
        let custom_resources = serde_json::from_str(custom_resources).map_err(|err| {
            InstallError::InvalidCatalog(format!("custom resources: {err}"))
        })?;
        let subscriptions = serde_json::from_str(subscriptions)
            .map_err(|err| InstallError::InvalidCatalog(format!("subscriptions: {err}")))?;
        let catalog = Self {
            custom_resources,
            subscriptions,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        for (service, record) in &self.custom_resources {
            if record.licenses.is_empty() {
                return Err(InstallError::InvalidCatalog(format!(
                    "{service} allows no license"
                )));
            }
            if record.status_key_name.is_empty() {
                return Err(InstallError::InvalidCatalog(format!(
                    "{service} has no status key"
                )));
            }
            if !self.subscriptions.contains_key(&record.operator_name) {
                return Err(InstallError::InvalidCatalog(format!(
                    "{service} refers to unknown operator {}",
                    record.operator_name
                )));
            }
        }
        for (operator, subscription) in &self.subscriptions {
            if let Some(missing) = subscription
                .dependencies
                .iter()
                .find(|dependency| !self.subscriptions.contains_key(*dependency))
            {
                return Err(InstallError::InvalidCatalog(format!(
                    "{operator} depends on unknown operator {missing}"
                )));
            }
        }
        Ok(())
    }

    pub fn services(&self) -> impl Iterator<Item = (&str, &CustomResourceMetadata)> {
        self.custom_resources
            .iter()
            .map(|(name, record)| (name.as_str(), record))
    }

    pub fn custom_resource(&self, service: &str) -> Result<&CustomResourceMetadata> {
        self.custom_resources
            .get(service)
            .ok_or_else(|| InstallError::UnknownService(service.to_owned()))
    }

    pub fn subscription(&self, operator: &str) -> Result<&SubscriptionMetadata> {
        self.subscriptions
            .get(operator)
            .ok_or_else(|| InstallError::UnknownOperator(operator.to_owned()))
    }

    /// Operators to subscribe to for `operator`, dependencies first.
    /// Each operator appears once.
    pub fn install_order(&self, operator: &str) -> Result<Vec<&str>> {
        let mut order = Vec::new();
        let mut path = Vec::new();
        self.visit(operator, &mut path, &mut order)?;
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        operator: &str,
        path: &mut Vec<&'a str>,
        order: &mut Vec<&'a str>,
    ) -> Result<()> {
        let (name, subscription) = self
            .subscriptions
            .get_key_value(operator)
            .ok_or_else(|| InstallError::UnknownOperator(operator.to_owned()))?;
        let name = name.as_str();
        if let Some(start) = path.iter().position(|visited| *visited == name) {
            let mut cycle = path[start..].to_vec();
            cycle.push(name);
            return Err(InstallError::CircularDependency(cycle.join(" -> ")));
        }
        if order.contains(&name) {
            return Ok(());
        }
        path.push(name);
        for dependency in &subscription.dependencies {
            self.visit(dependency, path, order)?;
        }
        path.pop();
        order.push(name);
        Ok(())
    }
}
