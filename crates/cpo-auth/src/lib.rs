//! # Cloud Pak Operations authentication
//!
//! Bearer tokens for OpenShift API servers. A [`CredentialProvider`] hands
//! out a token and, when it knows a username and password, refreshes it
//! through the cluster's OAuth server. [`ClusterTarget`] picks the provider
//! matching a command's flags.

mod error;
mod oauth;
mod provider;
mod resolve;

pub use error::{AuthError, Result};
pub use oauth::{OAuthClient, OAuthDiscovery};
pub use provider::{
    ClusterProvider, CredentialProvider, SharedProvider, TokenProvider, UserPasswordProvider,
};
pub use resolve::{ClusterTarget, login_command};
