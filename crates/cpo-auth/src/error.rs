use cpo_config::ConfigError;

pub type Result<T, E = AuthError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Authentication failed (HTTP {status}){}", body_suffix(.body))]
    AuthFailed { status: u16, body: String },
    #[error("Unexpected OAuth response: {0}")]
    AuthProtocolError(String),
    #[error("The token cannot be refreshed because no username and password are known")]
    TokenNotRefreshable,
    #[error(
        "No cluster credentials: pass --server with --username/--password or --token, \
         --use-cluster, or set a current cluster"
    )]
    AmbiguousOrMissingCredentials,
    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),
    #[error("Configuration error")]
    Config(#[from] ConfigError),
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}
