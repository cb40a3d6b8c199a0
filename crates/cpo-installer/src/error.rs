use indicatif::style::TemplateError;

use cpo_openshift::OpenShiftError;

pub type Result<T, E = InstallError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum InstallError {
    #[error("Unknown service: {0}")]
    UnknownService(String),
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),
    #[error("License {license} is not supported by {service} (supported: {supported})")]
    UnsupportedLicense {
        service: String,
        license: String,
        supported: String,
    },
    #[error("{0} requires a storage class or storage vendor")]
    MissingStorageOption(String),
    #[error("Circular operator dependency: {0}")]
    CircularDependency(String),
    #[error("Timed out waiting for {0}")]
    Timeout(String),
    #[error("Invalid service catalog: {0}")]
    InvalidCatalog(String),
    #[error("Installation result unavailable: {0}")]
    MissingResult(String),
    #[error("Request {id} failed with status {status}")]
    RequestFailed { id: String, status: String },
    #[error("OpenShift error")]
    OpenShift(#[from] OpenShiftError),
    #[error("Progress error")]
    Progress(#[from] TemplateError),
}
