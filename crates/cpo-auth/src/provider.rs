use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info};

use cpo_config::{Cluster, ClusterData, ClusterRegistry};
use cpo_types::defaults::KEY_TOKEN;

use crate::error::{AuthError, Result};
use crate::oauth::OAuthClient;

pub type SharedProvider = Arc<dyn CredentialProvider>;

/// Source of bearer tokens for one API server
#[async_trait]
pub trait CredentialProvider: Debug + Send + Sync {
    fn server(&self) -> &str;

    fn insecure_skip_tls_verify(&self) -> bool;

    /// Whether [`CredentialProvider::refresh_token`] can succeed
    fn is_refreshable(&self) -> bool;

    fn cached_token(&self) -> Option<String>;

    /// username and password used for OAuth
    fn basic_credentials(&self) -> Option<(String, String)>;

    async fn persist_token(&self, token: &str) -> Result<()>;

    async fn get_token(&self, force_refresh: bool) -> Result<String> {
        if !force_refresh {
            if let Some(token) = self.cached_token() {
                return Ok(token);
            }
        }
        self.refresh_token().await
    }

    async fn refresh_token(&self) -> Result<String> {
        let (username, password) = self
            .basic_credentials()
            .ok_or(AuthError::TokenNotRefreshable)?;
        let client = OAuthClient::new(self.server(), self.insecure_skip_tls_verify())?;
        let token = client.request_token(&username, &password).await?;
        self.persist_token(&token).await?;
        info!(server = self.server(), "token refreshed");
        Ok(token)
    }
}

fn lock_token(token: &Mutex<Option<String>>) -> std::sync::MutexGuard<'_, Option<String>> {
    token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Username and password with a token cached for the life of the process
#[derive(Debug)]
pub struct UserPasswordProvider {
    server: String,
    insecure_skip_tls_verify: bool,
    username: String,
    password: String,
    token: Mutex<Option<String>>,
}

impl UserPasswordProvider {
    pub fn new(
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        insecure_skip_tls_verify: bool,
    ) -> Self {
        Self {
            server: server.into(),
            insecure_skip_tls_verify,
            username: username.into(),
            password: password.into(),
            token: Mutex::new(None),
        }
    }
}

#[async_trait]
impl CredentialProvider for UserPasswordProvider {
    fn server(&self) -> &str {
        &self.server
    }

    fn insecure_skip_tls_verify(&self) -> bool {
        self.insecure_skip_tls_verify
    }

    fn is_refreshable(&self) -> bool {
        true
    }

    fn cached_token(&self) -> Option<String> {
        lock_token(&self.token).clone()
    }

    fn basic_credentials(&self) -> Option<(String, String)> {
        Some((self.username.clone(), self.password.clone()))
    }

    async fn persist_token(&self, token: &str) -> Result<()> {
        *lock_token(&self.token) = Some(token.to_owned());
        Ok(())
    }
}

/// A token supplied on the command line
#[derive(Debug)]
pub struct TokenProvider {
    server: String,
    insecure_skip_tls_verify: bool,
    token: String,
}

impl TokenProvider {
    pub fn new(
        server: impl Into<String>,
        token: impl Into<String>,
        insecure_skip_tls_verify: bool,
    ) -> Self {
        Self {
            server: server.into(),
            insecure_skip_tls_verify,
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for TokenProvider {
    fn server(&self) -> &str {
        &self.server
    }

    fn insecure_skip_tls_verify(&self) -> bool {
        self.insecure_skip_tls_verify
    }

    fn is_refreshable(&self) -> bool {
        false
    }

    fn cached_token(&self) -> Option<String> {
        Some(self.token.clone())
    }

    fn basic_credentials(&self) -> Option<(String, String)> {
        None
    }

    async fn persist_token(&self, _token: &str) -> Result<()> {
        Err(AuthError::TokenNotRefreshable)
    }
}

/// Credentials of a registered cluster; refreshed tokens are written back
/// to the registry so later invocations reuse them.
pub struct ClusterProvider {
    registry: Arc<ClusterRegistry>,
    cluster: Cluster,
    token: Mutex<Option<String>>,
}

impl Debug for ClusterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterProvider")
            .field("server", &self.cluster.server())
            .field("cluster_type", &self.cluster.cluster_type())
            .finish()
    }
}

impl ClusterProvider {
    pub fn new(registry: Arc<ClusterRegistry>, cluster: Cluster) -> Self {
        let token = cluster.token();
        Self {
            registry,
            cluster,
            token: Mutex::new(token),
        }
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }
}

#[async_trait]
impl CredentialProvider for ClusterProvider {
    fn server(&self) -> &str {
        self.cluster.server()
    }

    fn insecure_skip_tls_verify(&self) -> bool {
        self.cluster.insecure_skip_tls_verify()
    }

    fn is_refreshable(&self) -> bool {
        self.basic_credentials().is_some()
    }

    fn cached_token(&self) -> Option<String> {
        lock_token(&self.token).clone()
    }

    fn basic_credentials(&self) -> Option<(String, String)> {
        Some((self.cluster.username()?, self.cluster.password()?))
    }

    async fn persist_token(&self, token: &str) -> Result<()> {
        let patch: ClusterData = [(KEY_TOKEN, token)].into_iter().collect();
        self.registry.add_data(self.cluster.server(), patch)?;
        debug!(server = self.cluster.server(), "token stored in registry");
        *lock_token(&self.token) = Some(token.to_owned());
        Ok(())
    }
}
