//! Operator Lifecycle Manager resources
use std::collections::BTreeMap;

use serde_json::json;

use cpo_types::defaults::OPENSHIFT_MARKETPLACE_NAMESPACE;

use crate::kind::KindMetadata;
use crate::resource::CustomResource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSourceRequest {
    pub name: String,
    pub display_name: String,
    pub image: String,
    pub publisher: String,
    pub namespace: String,
}

impl CatalogSourceRequest {
    pub fn new(name: &str, display_name: &str, image: &str, publisher: &str) -> Self {
        Self {
            name: name.to_owned(),
            display_name: display_name.to_owned(),
            image: image.to_owned(),
            publisher: publisher.to_owned(),
            namespace: OPENSHIFT_MARKETPLACE_NAMESPACE.to_owned(),
        }
    }

    pub fn to_custom_resource(&self) -> CustomResource {
        CustomResource::new(
            KindMetadata::catalog_source(),
            &self.name,
            json!({
                "displayName": self.display_name,
                "image": self.image,
                "publisher": self.publisher,
                "sourceType": "grpc",
                "updateStrategy": {"registryPoll": {"interval": "45m"}},
            }),
        )
        .within(&self.namespace)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub name: String,
    pub package: String,
    pub channel: String,
    pub source: String,
    pub source_namespace: String,
    pub labels: BTreeMap<String, String>,
}

impl SubscriptionRequest {
    pub fn to_custom_resource(&self, project: &str) -> CustomResource {
        CustomResource::new(
            KindMetadata::subscription(),
            &self.name,
            json!({
                "channel": self.channel,
                "installPlanApproval": "Automatic",
                "name": self.package,
                "source": self.source,
                "sourceNamespace": self.source_namespace,
            }),
        )
        .within(project)
        .with_labels(self.labels.clone())
    }
}

/// Operator group targeting its own project
pub fn operator_group(project: &str, name: &str) -> CustomResource {
    CustomResource::new(
        KindMetadata::operator_group(),
        name,
        json!({"targetNamespaces": [project]}),
    )
    .within(project)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_subscription_body() {
        let request = SubscriptionRequest {
            name: "cpd-operator".to_owned(),
            package: "cpd-platform-operator".to_owned(),
            channel: "v4.0".to_owned(),
            source: "cpd-platform".to_owned(),
            source_namespace: "openshift-marketplace".to_owned(),
            labels: BTreeMap::from([("app".to_owned(), "cpd".to_owned())]),
        };
        let body = request.to_custom_resource("ibm-common-services").to_value();
        assert_eq!(body["kind"], "Subscription");
        assert_eq!(body["metadata"]["namespace"], "ibm-common-services");
        assert_eq!(body["metadata"]["labels"]["app"], "cpd");
        assert_eq!(body["spec"]["name"], "cpd-platform-operator");
    }

    #[test]
    fn test_catalog_source_defaults_to_marketplace() {
        let source = CatalogSourceRequest::new("ibm-operator-catalog", "IBM Operator Catalog", "icr.io/cpopen/ibm-operator-catalog:latest", "IBM");
        let resource = source.to_custom_resource();
        assert_eq!(resource.namespace(), Some("openshift-marketplace"));
        assert_eq!(resource.spec["sourceType"], "grpc");
    }
}
