//!
//! # Cluster resolution
//!
//! Turns the cluster flags of a command into a credential provider.
//!
use std::sync::Arc;

use clap::Args;
use tracing::debug;

use cpo_config::ClusterRegistry;

use crate::error::{AuthError, Result};
use crate::provider::{ClusterProvider, SharedProvider, TokenProvider, UserPasswordProvider};

/// cluster to operate on
#[derive(Debug, Args, Default, Clone, PartialEq, Eq)]
pub struct ClusterTarget {
    /// OpenShift API server URL
    #[arg(long, value_name = "url")]
    pub server: Option<String>,

    /// OpenShift username
    #[arg(long)]
    pub username: Option<String>,

    /// OpenShift password
    #[arg(long)]
    pub password: Option<String>,

    /// OpenShift OAuth access token
    #[arg(long)]
    pub token: Option<String>,

    /// Alias or server URL of a registered cluster
    #[arg(long, value_name = "alias_or_server_url")]
    pub use_cluster: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure_skip_tls_verify: bool,
}

impl ClusterTarget {
    /// Pick the credential provider for these flags. precedence is:
    /// 1) `--server` with `--username` and `--password`
    /// 2) `--server` with `--token`
    /// 3) `--use-cluster`
    /// 4) the current cluster of the registry
    pub fn load(&self, registry: &Arc<ClusterRegistry>) -> Result<SharedProvider> {
        let has_user_password = self.username.is_some() || self.password.is_some();
        let use_cluster = self.use_cluster.as_deref().filter(|c| !c.is_empty());

        match (
            self.server.as_deref(),
            self.username.as_deref(),
            self.password.as_deref(),
            self.token.as_deref(),
            use_cluster,
        ) {
            (Some(server), Some(username), Some(password), None, None) => {
                debug!(server, "using username and password");
                Ok(Arc::new(UserPasswordProvider::new(
                    server,
                    username,
                    password,
                    self.insecure_skip_tls_verify,
                )))
            }
            (Some(server), _, _, Some(token), None) if !has_user_password => {
                debug!(server, "using token");
                Ok(Arc::new(TokenProvider::new(
                    server,
                    token,
                    self.insecure_skip_tls_verify,
                )))
            }
            (_, _, _, _, Some(alias_or_server)) => {
                let cluster = registry
                    .get(alias_or_server)?
                    .ok_or_else(|| AuthError::ClusterNotFound(alias_or_server.to_owned()))?;
                debug!(server = cluster.server(), "using registered cluster");
                Ok(Arc::new(ClusterProvider::new(registry.clone(), cluster)))
            }
            (None, None, None, None, None) => match registry.get_current()? {
                Some(cluster) => {
                    debug!(server = cluster.server(), "using current cluster");
                    Ok(Arc::new(ClusterProvider::new(registry.clone(), cluster)))
                }
                None => Err(AuthError::AmbiguousOrMissingCredentials),
            },
            _ => Err(AuthError::AmbiguousOrMissingCredentials),
        }
    }

    /// Equivalent `oc login` command line, for running on another host
    pub fn login_command(&self, registry: &ClusterRegistry) -> Result<String> {
        let use_cluster = self.use_cluster.as_deref().filter(|c| !c.is_empty());
        let (server, username, password, token, insecure) = match use_cluster {
            Some(alias_or_server) => {
                let cluster = registry
                    .get(alias_or_server)?
                    .ok_or_else(|| AuthError::ClusterNotFound(alias_or_server.to_owned()))?;
                (
                    cluster.server().to_owned(),
                    cluster.username(),
                    cluster.password(),
                    cluster.token(),
                    cluster.insecure_skip_tls_verify(),
                )
            }
            None if self.server.is_none() => {
                let cluster = registry
                    .get_current()?
                    .ok_or(AuthError::AmbiguousOrMissingCredentials)?;
                (
                    cluster.server().to_owned(),
                    cluster.username(),
                    cluster.password(),
                    cluster.token(),
                    cluster.insecure_skip_tls_verify(),
                )
            }
            None => (
                self.server.clone().unwrap_or_default(),
                self.username.clone(),
                self.password.clone(),
                self.token.clone(),
                self.insecure_skip_tls_verify,
            ),
        };
        login_command(&server, username.zip(password), token.as_deref(), insecure)
    }
}

/// Render `oc login` for either username/password or a token.
///
/// Username and password win over a token when both are known.
pub fn login_command(
    server: &str,
    user_password: Option<(String, String)>,
    token: Option<&str>,
    insecure_skip_tls_verify: bool,
) -> Result<String> {
    let mut args = vec!["oc".to_owned(), "login".to_owned(), shell_quote(server)];
    match (user_password, token) {
        (Some((username, password)), _) => {
            args.push(format!("--username {}", shell_quote(&username)));
            args.push(format!("--password {}", shell_quote(&password)));
        }
        (None, Some(token)) => args.push(format!("--token {}", shell_quote(token))),
        (None, None) => return Err(AuthError::AmbiguousOrMissingCredentials),
    }
    if insecure_skip_tls_verify {
        args.push("--insecure-skip-tls-verify".to_owned());
    }
    Ok(args.join(" "))
}

fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@%+=,~".contains(c));
    if safe {
        value.to_owned()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
