//!
//! # Kind metadata
//!
//! Group, kind, plural and version addressing a resource type. Every
//! operation of [`crate::OpenShiftManager`] is keyed by one of these.
//!
use std::fmt;

use kube::discovery::ApiResource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KindMetadata {
    pub group: String,
    pub kind: String,
    pub plural: String,
    pub version: String,
}

impl KindMetadata {
    pub fn new(group: &str, kind: &str, plural: &str, version: &str) -> Self {
        Self {
            group: group.to_owned(),
            kind: kind.to_owned(),
            plural: plural.to_owned(),
            version: version.to_owned(),
        }
    }

    /// Kind of a built-in Kubernetes type
    pub fn of<K: k8s_openapi::Resource>() -> Self {
        Self::new(K::GROUP, K::KIND, K::URL_PATH_SEGMENT, K::VERSION)
    }

    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            api_version: self.api_version(),
            kind: self.kind.clone(),
            plural: self.plural.clone(),
        }
    }

    pub fn catalog_source() -> Self {
        Self::new("operators.coreos.com", "CatalogSource", "catalogsources", "v1alpha1")
    }

    pub fn cluster_operator() -> Self {
        Self::new("config.openshift.io", "ClusterOperator", "clusteroperators", "v1")
    }

    pub fn cluster_service_version() -> Self {
        Self::new(
            "operators.coreos.com",
            "ClusterServiceVersion",
            "clusterserviceversions",
            "v1alpha1",
        )
    }

    pub fn custom_resource_definition() -> Self {
        Self::new(
            "apiextensions.k8s.io",
            "CustomResourceDefinition",
            "customresourcedefinitions",
            "v1",
        )
    }

    pub fn operator() -> Self {
        Self::new("operators.coreos.com", "Operator", "operators", "v1")
    }

    pub fn operator_group() -> Self {
        Self::new("operators.coreos.com", "OperatorGroup", "operatorgroups", "v1")
    }

    pub fn project() -> Self {
        Self::new("project.openshift.io", "Project", "projects", "v1")
    }

    pub fn project_request() -> Self {
        Self::new("project.openshift.io", "ProjectRequest", "projectrequests", "v1")
    }

    pub fn subscription() -> Self {
        Self::new("operators.coreos.com", "Subscription", "subscriptions", "v1alpha1")
    }

    pub fn operand_request() -> Self {
        Self::new("operator.ibm.com", "OperandRequest", "operandrequests", "v1alpha1")
    }

    pub fn ibmcpd() -> Self {
        Self::new("cpd.ibm.com", "Ibmcpd", "ibmcpds", "v1")
    }

    pub fn zen_service() -> Self {
        Self::new("zen.cpd.ibm.com", "ZenService", "zenservices", "v1")
    }
}

impl fmt::Display for KindMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.plural, self.group)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_api_resource() {
        let resource = KindMetadata::subscription().api_resource();
        assert_eq!(resource.api_version, "operators.coreos.com/v1alpha1");
        assert_eq!(resource.plural, "subscriptions");

        let core = KindMetadata::of::<k8s_openapi::api::core::v1::Secret>();
        assert_eq!(core, KindMetadata::new("", "Secret", "secrets", "v1"));
        assert_eq!(core.api_version(), "v1");
        assert_eq!(KindMetadata::ibmcpd().to_string(), "ibmcpds.cpd.ibm.com");
    }
}
