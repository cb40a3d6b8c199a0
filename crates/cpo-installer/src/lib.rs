//! # Cloud Pak for Data installer
//!
//! Installs foundational services, the platform and individual services
//! through OLM subscriptions and custom resources, waiting on watches for
//! operators to reconcile.

mod callbacks;
mod catalog;
mod error;
mod installer;
mod platform;
mod progress;
mod service;
mod spec;
mod tracker;

pub use callbacks::{CrCompleted, CrdsCreated};
pub use catalog::{CatalogSourceMetadata, CustomResourceMetadata, ServiceCatalog, SubscriptionMetadata};
pub use error::{InstallError, Result};
pub use installer::Installer;
pub use platform::{InstallResult, PLATFORM_LICENSES, PLATFORM_VERSION, PlatformInstallation};
pub use progress::{InstallProgressMessage, ProgressBarFactory, ProgressRenderedText, ProgressRenderer};
pub use service::ServiceInstallation;
pub use spec::{StorageOption, assemble_spec, parse_option_value};
pub use tracker::{RequestStatus, RequestTracker};
