//!
//! # OAuth implicit grant against the OpenShift OAuth server
//!
//! 1. discover the authorization endpoint at
//!    `{server}/.well-known/oauth-authorization-server`
//! 2. `GET` it as the challenging client with basic credentials, without
//!    following the redirect
//! 3. read `access_token` from the fragment of the `Location` header
//!
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use cpo_types::defaults::{OAUTH_CHALLENGING_CLIENT_ID, OAUTH_DISCOVERY_PATH};

use crate::error::{AuthError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthDiscovery {
    pub authorization_endpoint: String,
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    server: String,
    client: Client,
}

impl OAuthClient {
    pub fn new(server: &str, insecure_skip_tls_verify: bool) -> Result<Self> {
        if insecure_skip_tls_verify {
            debug!(server, "TLS verification disabled for OAuth requests");
        }
        let client = Client::builder()
            .redirect(Policy::none())
            .danger_accept_invalid_certs(insecure_skip_tls_verify)
            .build()?;
        Ok(Self {
            server: server.trim_end_matches('/').to_owned(),
            client,
        })
    }

    pub async fn discover(&self) -> Result<OAuthDiscovery> {
        let url = format!("{}{}", self.server, OAUTH_DISCOVERY_PATH);
        debug!(%url, "OAuth discovery");
        let response = self.client.get(&url).send().await?;
        let response = fail_on_status(response, |status| !status.is_success()).await?;
        response
            .json()
            .await
            .map_err(|err| AuthError::AuthProtocolError(format!("discovery document: {err}")))
    }

    #[instrument(skip(self, password), fields(server = %self.server))]
    pub async fn request_token(&self, username: &str, password: &str) -> Result<String> {
        let discovery = self.discover().await?;
        let response = self
            .client
            .get(&discovery.authorization_endpoint)
            .query(&[
                ("client_id", OAUTH_CHALLENGING_CLIENT_ID),
                ("response_type", "token"),
            ])
            .basic_auth(username, Some(password))
            .send()
            .await?;
        let response = fail_on_status(response, |status| {
            status.is_client_error() || status.is_server_error()
        })
        .await?;

        let location = response
            .headers()
            .get(LOCATION)
            .ok_or_else(|| AuthError::AuthProtocolError("missing Location header".to_owned()))?
            .to_str()
            .map_err(|_| AuthError::AuthProtocolError("invalid Location header".to_owned()))?;
        let token = access_token_from_location(&discovery.authorization_endpoint, location)?;
        debug!("obtained OAuth access token");
        Ok(token)
    }
}

async fn fail_on_status<F>(response: Response, is_failure: F) -> Result<Response>
where
    F: FnOnce(reqwest::StatusCode) -> bool,
{
    let status = response.status();
    if is_failure(status) {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::AuthFailed {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn access_token_from_location(base: &str, location: &str) -> Result<String> {
    let url = Url::parse(location)
        .or_else(|_| Url::parse(base).and_then(|base| base.join(location)))
        .map_err(|err| AuthError::AuthProtocolError(format!("Location header: {err}")))?;
    url.fragment()
        .and_then(|fragment| {
            url::form_urlencoded::parse(fragment.as_bytes())
                .find(|(key, _)| key == "access_token")
                .map(|(_, value)| value.into_owned())
        })
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AuthError::AuthProtocolError("no access_token in Location fragment".to_owned())
        })
}
