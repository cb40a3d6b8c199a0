//! # OpenShift API
//!
//! [`OpenShiftManager`] wraps the Kubernetes REST API of one cluster:
//! resource CRUD keyed by [`KindMetadata`], the global pull secret and
//! watches that survive expired tokens and dropped streams.

mod error;
mod kind;
mod manager;
mod olm;
mod pull_secret;
mod resource;
mod watch;

pub use error::{OpenShiftError, Result};
pub use kind::KindMetadata;
pub use manager::OpenShiftManager;
pub use olm::{CatalogSourceRequest, SubscriptionRequest, operator_group};
pub use pull_secret::{GlobalPullSecretData, RegistryAuth};
pub use resource::{CustomResource, lookup};
pub use watch::{EventType, ResourceEvent, WatchHandler};

pub use k8s_openapi;
pub use kube;
