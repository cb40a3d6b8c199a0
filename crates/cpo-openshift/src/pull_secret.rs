//!
//! # Global pull secret
//!
//! `openshift-config/pull-secret` stores a docker config JSON under
//! `.dockerconfigjson`. The document is edited in memory and written back as
//! a single JSON-Patch replace, leaving server-managed secret metadata alone.
//!
use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use cpo_types::defaults::DOCKER_CONFIG_JSON_KEY;

use crate::error::{OpenShiftError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl RegistryAuth {
    fn new(username: &str, password: &str) -> Self {
        Self {
            auth: Some(STANDARD.encode(format!("{username}:{password}"))),
            username: Some(username.to_owned()),
            password: Some(password.to_owned()),
            ..Default::default()
        }
    }

    /// username and password, from `auth` or the explicit fields
    pub fn credentials(&self) -> Option<(String, String)> {
        let from_auth = self
            .auth
            .as_deref()
            .and_then(|auth| STANDARD.decode(auth).ok())
            .and_then(|decoded| String::from_utf8(decoded).ok())
            .and_then(|decoded| {
                decoded
                    .split_once(':')
                    .map(|(user, password)| (user.to_owned(), password.to_owned()))
            });
        from_auth.or_else(|| Some((self.username.clone()?, self.password.clone()?)))
    }
}

/// Contents of the `.dockerconfigjson` key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalPullSecretData {
    #[serde(default)]
    auths: BTreeMap<String, RegistryAuth>,
    #[serde(flatten)]
    other: BTreeMap<String, Value>,
}

impl GlobalPullSecretData {
    /// Parse the decoded docker config JSON
    pub fn from_docker_config(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|err| OpenShiftError::MalformedPullSecret(err.to_string()))
    }

    /// Registry hosts in sorted order
    pub fn registries(&self) -> impl Iterator<Item = &str> {
        self.auths.keys().map(String::as_str)
    }

    pub fn get_credentials(&self, registry: &str) -> Option<(String, String)> {
        self.auths.get(registry)?.credentials()
    }

    /// Store credentials for `registry`; returns false when they were
    /// already present
    pub fn set_credentials(&mut self, registry: &str, username: &str, password: &str) -> bool {
        if self.get_credentials(registry)
            == Some((username.to_owned(), password.to_owned()))
        {
            return false;
        }
        let mut auth = RegistryAuth::new(username, password);
        if let Some(existing) = self.auths.remove(registry) {
            auth.email = existing.email;
            auth.other = existing.other;
        }
        self.auths.insert(registry.to_owned(), auth);
        true
    }

    pub fn delete_credentials(&mut self, registry: &str) -> Result<()> {
        self.auths
            .remove(registry)
            .map(|_| ())
            .ok_or_else(|| OpenShiftError::RegistryNotFound(registry.to_owned()))
    }

    /// Docker config JSON with registries sorted by host
    pub fn to_docker_config(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Single replace operation at `/data/.dockerconfigjson`
    pub fn to_json_patch(&self) -> Result<json_patch::Patch> {
        let encoded = STANDARD.encode(self.to_docker_config()?);
        let patch = serde_json::from_value(json!([{
            "op": "replace",
            "path": format!("/data/{DOCKER_CONFIG_JSON_KEY}"),
            "value": encoded,
        }]))?;
        Ok(patch)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn baseline() -> (Value, GlobalPullSecretData) {
        let docker_config = br#"{"auths":{"q.io":{"auth":"dTpw"}}}"#;
        let secret = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {"name": "pull-secret", "namespace": "openshift-config", "resourceVersion": "42"},
            "type": "kubernetes.io/dockerconfigjson",
            "data": {".dockerconfigjson": STANDARD.encode(docker_config)},
        });
        let data = GlobalPullSecretData::from_docker_config(docker_config).expect("parse");
        (secret, data)
    }

    #[test]
    fn test_set_and_get() {
        let (_, mut data) = baseline();
        assert_eq!(
            data.get_credentials("q.io"),
            Some(("u".to_owned(), "p".to_owned()))
        );
        assert!(data.set_credentials("cp.icr.io", "cp", "k"));
        assert!(!data.set_credentials("cp.icr.io", "cp", "k"));
        assert_eq!(
            data.get_credentials("cp.icr.io"),
            Some(("cp".to_owned(), "k".to_owned()))
        );
        assert_eq!(data.registries().collect::<Vec<_>>(), ["cp.icr.io", "q.io"]);
    }

    #[test]
    fn test_delete_missing_registry() {
        let (_, mut data) = baseline();
        assert!(matches!(
            data.delete_credentials("missing.io"),
            Err(OpenShiftError::RegistryNotFound(_))
        ));
        data.delete_credentials("q.io").expect("delete");
        assert_eq!(data.registries().count(), 0);
    }

    #[test]
    fn test_patch_upserts_registry() {
        let (mut secret, mut data) = baseline();
        data.set_credentials("cp.icr.io", "cp", "k");

        let patch = data.to_json_patch().expect("patch");
        assert_eq!(patch.0.len(), 1);
        json_patch::patch(&mut secret, &patch).expect("apply");

        assert_eq!(secret["metadata"]["resourceVersion"], "42");
        let encoded = secret["data"][".dockerconfigjson"].as_str().expect("string");
        let decoded = STANDARD.decode(encoded).expect("base64");
        let reread = GlobalPullSecretData::from_docker_config(&decoded).expect("parse");
        assert_eq!(reread, data);
        assert_eq!(reread.registries().collect::<Vec<_>>(), ["cp.icr.io", "q.io"]);

        let raw: Value = serde_json::from_slice(&decoded).expect("json");
        let auth = raw["auths"]["cp.icr.io"]["auth"].as_str().expect("auth");
        assert_eq!(STANDARD.decode(auth).expect("base64"), b"cp:k");
        assert_eq!(raw["auths"]["q.io"], json!({"auth": "dTpw"}));
    }

    #[test]
    fn test_unknown_fields_survive() {
        let data = GlobalPullSecretData::from_docker_config(
            br#"{"auths":{"r.io":{"auth":"dTpw","identitytoken":"x"}},"credsStore":"desktop"}"#,
        )
        .expect("parse");
        let json: Value = serde_json::from_slice(&data.to_docker_config().expect("json")).expect("value");
        assert_eq!(json["credsStore"], "desktop");
        assert_eq!(json["auths"]["r.io"]["identitytoken"], "x");
    }
}
