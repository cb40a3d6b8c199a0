use cpo_auth::AuthError;

pub type Result<T, E = OpenShiftError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum OpenShiftError {
    #[error("The access token expired and cannot be refreshed; log in again or register the cluster with a username and password")]
    TokenExpiredNonRefreshable,
    #[error("{kind} {name} not found")]
    ResourceNotFound { kind: String, name: String },
    #[error("{kind} {name} already exists")]
    ResourceConflict { kind: String, name: String },
    #[error("watch stream closed")]
    WatchStreamClosed,
    #[error("Invalid server URL {url}: {reason}")]
    InvalidServerUrl { url: String, reason: String },
    #[error("Unable to determine the OpenShift version: {0}")]
    ServerVersion(String),
    #[error("No credentials stored for registry {0}")]
    RegistryNotFound(String),
    #[error("Malformed global pull secret: {0}")]
    MalformedPullSecret(String),
    #[error("Authentication error")]
    Auth(#[from] AuthError),
    #[error("Kubernetes API error")]
    Kube(#[from] kube::Error),
    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}

impl OpenShiftError {
    /// HTTP status of an API error response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Kube(kube::Error::Api(response)) => Some(response.code),
            Self::ResourceNotFound { .. } => Some(404),
            Self::ResourceConflict { .. } => Some(409),
            _ => None,
        }
    }

    /// Attach the resource a 404 or 409 response was about
    pub(crate) fn for_resource(self, kind: &str, name: &str) -> Self {
        match self {
            Self::Kube(err) => Self::from_kube(err, kind, name),
            other => other,
        }
    }

    pub(crate) fn from_kube(err: kube::Error, kind: &str, name: &str) -> Self {
        match &err {
            kube::Error::Api(response) if response.code == 404 => Self::ResourceNotFound {
                kind: kind.to_owned(),
                name: name.to_owned(),
            },
            kube::Error::Api(response) if response.code == 409 => Self::ResourceConflict {
                kind: kind.to_owned(),
                name: name.to_owned(),
            },
            _ => Self::Kube(err),
        }
    }
}

pub(crate) fn is_status(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == code)
}
