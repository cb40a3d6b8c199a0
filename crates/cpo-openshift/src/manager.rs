use std::fmt::Debug;
use std::future::Future;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::discovery::ApiResource;
use kube::{Client, Config};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use cpo_auth::SharedProvider;
use cpo_types::defaults::{
    DOCKER_CONFIG_JSON_KEY, GLOBAL_PULL_SECRET_NAME, GLOBAL_PULL_SECRET_NAMESPACE,
    OPENSHIFT_APISERVER_OPERATOR,
};

use crate::error::{OpenShiftError, Result, is_status};
use crate::kind::KindMetadata;
use crate::olm::{CatalogSourceRequest, SubscriptionRequest, operator_group};
use crate::pull_secret::GlobalPullSecretData;
use crate::resource::{CustomResource, lookup};

pub(crate) fn dynamic_api(
    client: Client,
    resource: &ApiResource,
    namespace: Option<&str>,
) -> Api<DynamicObject> {
    match namespace {
        Some(namespace) => Api::namespaced_with(client, namespace, resource),
        None => Api::all_with(client, resource),
    }
}

fn to_value(object: DynamicObject) -> Result<Value> {
    Ok(serde_json::to_value(object)?)
}

/// Kubernetes and OpenShift API access on behalf of a credential provider.
///
/// The client is built lazily from the provider's token. A request answered
/// with 401 refreshes the token, rebuilds the client and is retried once.
pub struct OpenShiftManager {
    provider: SharedProvider,
    client: Mutex<Option<Client>>,
}

impl Debug for OpenShiftManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenShiftManager")
            .field("server", &self.provider.server())
            .finish()
    }
}

impl OpenShiftManager {
    pub fn new(provider: SharedProvider) -> Self {
        Self {
            provider,
            client: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    fn build_client(&self, token: String) -> Result<Client> {
        let server = self.provider.server();
        let uri = server
            .parse::<http::Uri>()
            .map_err(|err| OpenShiftError::InvalidServerUrl {
                url: server.to_owned(),
                reason: err.to_string(),
            })?;
        let mut config = Config::new(uri);
        config.accept_invalid_certs = self.provider.insecure_skip_tls_verify();
        config.auth_info.token = Some(token.into());
        Ok(Client::try_from(config)?)
    }

    pub(crate) async fn client(&self) -> Result<Client> {
        let mut client = self.client.lock().await;
        if let Some(client) = client.as_ref() {
            return Ok(client.clone());
        }
        let token = self.provider.get_token(false).await?;
        let built = self.build_client(token)?;
        *client = Some(built.clone());
        Ok(built)
    }

    /// Force a token refresh and rebuild the client
    pub(crate) async fn refresh_client(&self) -> Result<Client> {
        if !self.provider.is_refreshable() {
            return Err(OpenShiftError::TokenExpiredNonRefreshable);
        }
        let mut client = self.client.lock().await;
        let token = self.provider.get_token(true).await?;
        let built = self.build_client(token)?;
        *client = Some(built.clone());
        Ok(built)
    }

    /// Run `operation`; on 401 refresh the token and run it once more
    pub async fn with_refresh<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn(Client) -> Fut,
        Fut: Future<Output = kube::Result<T>>,
    {
        let client = self.client().await?;
        match operation(client).await {
            Err(err) if is_status(&err, 401) => {
                debug!(server = self.provider.server(), "unauthorized, refreshing token");
                let client = self.refresh_client().await?;
                Ok(operation(client).await?)
            }
            result => Ok(result?),
        }
    }

    //
    // generic operations
    //

    pub async fn get_resource(
        &self,
        kind: &KindMetadata,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<Value>> {
        let resource = &kind.api_resource();
        let object = self
            .with_refresh(|client| async move {
                dynamic_api(client, resource, namespace).get_opt(name).await
            })
            .await?;
        object.map(to_value).transpose()
    }

    pub async fn resource_exists(
        &self,
        kind: &KindMetadata,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<bool> {
        Ok(self.get_resource(kind, namespace, name).await?.is_some())
    }

    pub async fn list_resources(
        &self,
        kind: &KindMetadata,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>> {
        let resource = &kind.api_resource();
        let list = self
            .with_refresh(|client| async move {
                dynamic_api(client, resource, namespace)
                    .list(&ListParams::default())
                    .await
            })
            .await?;
        list.items.into_iter().map(to_value).collect()
    }

    #[instrument(skip(self, kind, object), fields(kind = %kind))]
    pub async fn create_resource(
        &self,
        kind: &KindMetadata,
        namespace: Option<&str>,
        object: DynamicObject,
    ) -> Result<()> {
        let resource = &kind.api_resource();
        let name = object.metadata.name.clone().unwrap_or_default();
        let object = &object;
        self.with_refresh(|client| async move {
            dynamic_api(client, resource, namespace)
                .create(&PostParams::default(), object)
                .await
        })
        .await
        .map_err(|err| err.for_resource(&kind.kind, &name))?;
        info!(%name, "created");
        Ok(())
    }

    /// Returns false when the resource did not exist
    #[instrument(skip(self, kind), fields(kind = %kind))]
    pub async fn delete_resource(
        &self,
        kind: &KindMetadata,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<bool> {
        let resource = &kind.api_resource();
        let result = self
            .with_refresh(|client| async move {
                dynamic_api(client, resource, namespace)
                    .delete(name, &DeleteParams::default())
                    .await
            })
            .await;
        match result {
            Ok(_) => {
                info!(name, "deleted");
                Ok(true)
            }
            Err(err) if err.status_code() == Some(404) => {
                debug!(name, "already absent");
                Ok(false)
            }
            Err(err) => Err(err.for_resource(&kind.kind, name)),
        }
    }

    async fn create_typed<K>(&self, namespace: Option<&str>, object: &K) -> Result<()>
    where
        K: k8s_openapi::Resource + Serialize,
    {
        let kind = KindMetadata::of::<K>();
        let mut object: DynamicObject = serde_json::from_value(serde_json::to_value(object)?)?;
        if let Some(namespace) = namespace {
            object.metadata.namespace = Some(namespace.to_owned());
        }
        self.create_resource(&kind, namespace, object).await
    }

    async fn typed_exists<K: k8s_openapi::Resource>(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<bool> {
        self.resource_exists(&KindMetadata::of::<K>(), namespace, name)
            .await
    }

    async fn delete_typed<K: k8s_openapi::Resource>(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<bool> {
        self.delete_resource(&KindMetadata::of::<K>(), namespace, name)
            .await
    }

    //
    // existence checks
    //

    pub async fn cluster_role_exists(&self, name: &str) -> Result<bool> {
        self.typed_exists::<ClusterRole>(None, name).await
    }

    pub async fn cluster_role_binding_exists(&self, name: &str) -> Result<bool> {
        self.typed_exists::<ClusterRoleBinding>(None, name).await
    }

    pub async fn deployment_exists(&self, project: &str, name: &str) -> Result<bool> {
        self.typed_exists::<Deployment>(Some(project), name).await
    }

    pub async fn role_exists(&self, project: &str, name: &str) -> Result<bool> {
        self.typed_exists::<Role>(Some(project), name).await
    }

    pub async fn role_binding_exists(&self, project: &str, name: &str) -> Result<bool> {
        self.typed_exists::<RoleBinding>(Some(project), name).await
    }

    pub async fn service_account_exists(&self, project: &str, name: &str) -> Result<bool> {
        self.typed_exists::<ServiceAccount>(Some(project), name)
            .await
    }

    pub async fn storage_class_exists(&self, name: &str) -> Result<bool> {
        self.typed_exists::<StorageClass>(None, name).await
    }

    pub async fn operator_group_exists(&self, project: &str, name: &str) -> Result<bool> {
        self.resource_exists(&KindMetadata::operator_group(), Some(project), name)
            .await
    }

    pub async fn subscription_exists(&self, project: &str, name: &str) -> Result<bool> {
        self.resource_exists(&KindMetadata::subscription(), Some(project), name)
            .await
    }

    pub async fn project_exists(&self, name: &str) -> Result<bool> {
        self.resource_exists(&KindMetadata::project(), None, name)
            .await
    }

    pub async fn custom_resource_exists(&self, kind: &KindMetadata, name: &str) -> Result<bool> {
        self.resource_exists(kind, None, name).await
    }

    pub async fn namespaced_custom_resource_exists(
        &self,
        project: &str,
        kind: &KindMetadata,
        name: &str,
    ) -> Result<bool> {
        self.resource_exists(kind, Some(project), name).await
    }

    //
    // creates
    //

    /// Create a project through a project request
    pub async fn create_project(&self, name: &str) -> Result<()> {
        let kind = KindMetadata::project_request();
        let object = DynamicObject::new(name, &kind.api_resource());
        self.create_resource(&kind, None, object).await
    }

    pub async fn create_operator_group(&self, project: &str, name: &str) -> Result<()> {
        self.create_custom_resource(&operator_group(project, name))
            .await
    }

    pub async fn create_catalog_source(&self, request: &CatalogSourceRequest) -> Result<()> {
        self.create_custom_resource(&request.to_custom_resource())
            .await
    }

    pub async fn create_subscription(
        &self,
        project: &str,
        request: &SubscriptionRequest,
    ) -> Result<()> {
        self.create_custom_resource(&request.to_custom_resource(project))
            .await
    }

    pub async fn create_cluster_role(&self, role: &ClusterRole) -> Result<()> {
        self.create_typed(None, role).await
    }

    pub async fn create_cluster_role_binding(&self, binding: &ClusterRoleBinding) -> Result<()> {
        self.create_typed(None, binding).await
    }

    pub async fn create_role(&self, project: &str, role: &Role) -> Result<()> {
        self.create_typed(Some(project), role).await
    }

    pub async fn create_role_binding(&self, project: &str, binding: &RoleBinding) -> Result<()> {
        self.create_typed(Some(project), binding).await
    }

    pub async fn create_deployment(&self, project: &str, deployment: &Deployment) -> Result<()> {
        self.create_typed(Some(project), deployment).await
    }

    pub async fn create_service_account(&self, project: &str, name: &str) -> Result<()> {
        let account = ServiceAccount {
            metadata: kube::api::ObjectMeta {
                name: Some(name.to_owned()),
                ..Default::default()
            },
            ..Default::default()
        };
        self.create_typed(Some(project), &account).await
    }

    pub async fn create_storage_class(&self, storage_class: &StorageClass) -> Result<()> {
        self.create_typed(None, storage_class).await
    }

    pub async fn create_custom_resource(&self, resource: &CustomResource) -> Result<()> {
        self.create_resource(
            &resource.kind,
            resource.namespace(),
            resource.to_dynamic_object(),
        )
        .await
    }

    //
    // deletes
    //

    pub async fn delete_project(&self, name: &str) -> Result<bool> {
        self.delete_resource(&KindMetadata::project(), None, name)
            .await
    }

    pub async fn delete_operator_group(&self, project: &str, name: &str) -> Result<bool> {
        self.delete_resource(&KindMetadata::operator_group(), Some(project), name)
            .await
    }

    pub async fn delete_catalog_source(&self, project: &str, name: &str) -> Result<bool> {
        self.delete_resource(&KindMetadata::catalog_source(), Some(project), name)
            .await
    }

    pub async fn delete_subscription(&self, project: &str, name: &str) -> Result<bool> {
        self.delete_resource(&KindMetadata::subscription(), Some(project), name)
            .await
    }

    pub async fn delete_cluster_role(&self, name: &str) -> Result<bool> {
        self.delete_typed::<ClusterRole>(None, name).await
    }

    pub async fn delete_cluster_role_binding(&self, name: &str) -> Result<bool> {
        self.delete_typed::<ClusterRoleBinding>(None, name).await
    }

    pub async fn delete_role(&self, project: &str, name: &str) -> Result<bool> {
        self.delete_typed::<Role>(Some(project), name).await
    }

    pub async fn delete_role_binding(&self, project: &str, name: &str) -> Result<bool> {
        self.delete_typed::<RoleBinding>(Some(project), name).await
    }

    pub async fn delete_deployment(&self, project: &str, name: &str) -> Result<bool> {
        self.delete_typed::<Deployment>(Some(project), name).await
    }

    pub async fn delete_service_account(&self, project: &str, name: &str) -> Result<bool> {
        self.delete_typed::<ServiceAccount>(Some(project), name)
            .await
    }

    pub async fn delete_storage_class(&self, name: &str) -> Result<bool> {
        self.delete_typed::<StorageClass>(None, name).await
    }

    pub async fn delete_custom_resource(
        &self,
        kind: &KindMetadata,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<bool> {
        self.delete_resource(kind, namespace, name).await
    }

    /// Delete the `Operator` object OLM keeps for `<package>.<project>`
    pub async fn delete_operator(&self, name: &str) -> Result<bool> {
        self.delete_resource(&KindMetadata::operator(), None, name)
            .await
    }

    pub async fn delete_cluster_service_version(&self, project: &str, name: &str) -> Result<bool> {
        self.delete_resource(&KindMetadata::cluster_service_version(), Some(project), name)
            .await
    }

    /// `name` is `<plural>.<group>`
    pub async fn delete_custom_resource_definition(&self, name: &str) -> Result<bool> {
        self.delete_resource(&KindMetadata::custom_resource_definition(), None, name)
            .await
    }

    //
    // gets
    //

    pub async fn get_subscription(&self, project: &str, name: &str) -> Result<Value> {
        self.get_resource(&KindMetadata::subscription(), Some(project), name)
            .await?
            .ok_or_else(|| OpenShiftError::ResourceNotFound {
                kind: "Subscription".to_owned(),
                name: name.to_owned(),
            })
    }

    pub async fn get_custom_resources(
        &self,
        kind: &KindMetadata,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>> {
        self.list_resources(kind, namespace).await
    }

    pub async fn get_custom_resource_if_exists(
        &self,
        kind: &KindMetadata,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<Value>> {
        self.get_resource(kind, namespace, name).await
    }

    pub async fn get_catalog_sources(&self, project: &str) -> Result<Vec<Value>> {
        self.list_resources(&KindMetadata::catalog_source(), Some(project))
            .await
    }

    pub async fn get_secret(&self, project: &str, name: &str) -> Result<Secret> {
        self.with_refresh(|client| async move {
            Api::<Secret>::namespaced(client, project).get(name).await
        })
        .await
        .map_err(|err| err.for_resource("Secret", name))
    }

    /// OpenShift version reported by the `openshift-apiserver` cluster operator
    pub async fn get_server_version(&self) -> Result<semver::Version> {
        let operator = self
            .get_resource(
                &KindMetadata::cluster_operator(),
                None,
                OPENSHIFT_APISERVER_OPERATOR,
            )
            .await?
            .ok_or_else(|| {
                OpenShiftError::ServerVersion(format!(
                    "cluster operator {OPENSHIFT_APISERVER_OPERATOR} not found"
                ))
            })?;
        parse_operator_version(&operator)
    }

    //
    // global pull secret
    //

    pub async fn get_global_pull_secret(&self) -> Result<GlobalPullSecretData> {
        let secret = self
            .get_secret(GLOBAL_PULL_SECRET_NAMESPACE, GLOBAL_PULL_SECRET_NAME)
            .await?;
        let docker_config = secret
            .data
            .and_then(|mut data| data.remove(DOCKER_CONFIG_JSON_KEY))
            .ok_or_else(|| {
                OpenShiftError::MalformedPullSecret(format!("missing {DOCKER_CONFIG_JSON_KEY}"))
            })?;
        GlobalPullSecretData::from_docker_config(&docker_config.0)
    }

    #[instrument(skip_all)]
    pub async fn patch_global_pull_secret(&self, data: &GlobalPullSecretData) -> Result<()> {
        let patch = &data.to_json_patch()?;
        self.with_refresh(|client| async move {
            Api::<Secret>::namespaced(client, GLOBAL_PULL_SECRET_NAMESPACE)
                .patch(
                    GLOBAL_PULL_SECRET_NAME,
                    &PatchParams::default(),
                    &Patch::Json::<()>(patch.clone()),
                )
                .await
        })
        .await?;
        info!("global pull secret patched");
        Ok(())
    }

    /// Upsert registry credentials; returns false when nothing changed
    pub async fn set_global_pull_secret_credentials(
        &self,
        registry: &str,
        username: &str,
        password: &str,
    ) -> Result<bool> {
        let mut data = self.get_global_pull_secret().await?;
        if !data.set_credentials(registry, username, password) {
            debug!(registry, "pull secret already up to date");
            return Ok(false);
        }
        self.patch_global_pull_secret(&data).await?;
        Ok(true)
    }

    pub async fn delete_global_pull_secret_credentials(&self, registry: &str) -> Result<()> {
        let mut data = self.get_global_pull_secret().await?;
        data.delete_credentials(registry)?;
        self.patch_global_pull_secret(&data).await
    }
}

fn parse_operator_version(operator: &Value) -> Result<semver::Version> {
    let version = lookup(operator, "status.versions")
        .and_then(Value::as_array)
        .and_then(|versions| {
            versions
                .iter()
                .find(|entry| entry["name"] == json!("operator"))
        })
        .and_then(|entry| entry["version"].as_str())
        .ok_or_else(|| OpenShiftError::ServerVersion("no operator version in status".to_owned()))?;
    semver::Version::parse(version)
        .map_err(|err| OpenShiftError::ServerVersion(format!("{version}: {err}")))
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use mockito::{Matcher, Server, ServerGuard};

    use cpo_auth::{ClusterProvider, TokenProvider};
    use cpo_config::{ClusterData, ClusterRegistry};
    use cpo_types::defaults::{KEY_PASSWORD, KEY_TOKEN, KEY_USERNAME, OAUTH_DISCOVERY_PATH};

    use super::*;

    const VERSION_PATH: &str = "/apis/config.openshift.io/v1/clusteroperators/openshift-apiserver";
    const PULL_SECRET_PATH: &str = "/api/v1/namespaces/openshift-config/secrets/pull-secret";

    pub(crate) fn token_manager(server: &ServerGuard) -> OpenShiftManager {
        OpenShiftManager::new(Arc::new(TokenProvider::new(server.url(), "sha256~t", false)))
    }

    pub(crate) fn status_body(code: u16, reason: &str) -> String {
        json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": reason,
            "reason": reason,
            "code": code,
        })
        .to_string()
    }

    fn cluster_operator() -> String {
        json!({
            "apiVersion": "config.openshift.io/v1",
            "kind": "ClusterOperator",
            "metadata": {"name": "openshift-apiserver"},
            "status": {"versions": [
                {"name": "openshift-apiserver", "version": "4.14.8"},
                {"name": "operator", "version": "4.14.8"},
            ]},
        })
        .to_string()
    }

    #[test]
    fn test_parse_operator_version() {
        let operator: Value = serde_json::from_str(&cluster_operator()).expect("json");
        assert_eq!(
            parse_operator_version(&operator).expect("version"),
            semver::Version::new(4, 14, 8)
        );
        assert!(parse_operator_version(&json!({"status": {}})).is_err());
    }

    #[tokio::test]
    async fn test_exists_is_false_on_404() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/apis/rbac.authorization.k8s.io/v1/clusterroles/missing")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(status_body(404, "NotFound"))
            .create_async()
            .await;
        server
            .mock("GET", "/apis/operators.coreos.com/v1alpha1/namespaces/ibm-common-services/subscriptions/broken")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(status_body(500, "InternalError"))
            .create_async()
            .await;

        let manager = token_manager(&server);
        assert!(!manager.cluster_role_exists("missing").await.expect("exists"));
        let err = manager
            .subscription_exists("ibm-common-services", "broken")
            .await
            .expect_err("server error");
        assert_eq!(err.status_code(), Some(500));
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/apis/operators.coreos.com/v1/namespaces/cpd-instance/operatorgroups")
            .match_query(Matcher::Any)
            .with_status(409)
            .with_header("content-type", "application/json")
            .with_body(status_body(409, "AlreadyExists"))
            .create_async()
            .await;

        let manager = token_manager(&server);
        let err = manager
            .create_operator_group("cpd-instance", "operatorgroup")
            .await
            .expect_err("conflict");
        assert!(matches!(err, OpenShiftError::ResourceConflict { name, .. } if name == "operatorgroup"));
    }

    #[tokio::test]
    async fn test_unrefreshable_token_expired() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", VERSION_PATH)
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(status_body(401, "Unauthorized"))
            .create_async()
            .await;

        let manager = token_manager(&server);
        assert!(matches!(
            manager.get_server_version().await,
            Err(OpenShiftError::TokenExpiredNonRefreshable)
        ));
    }

    #[tokio::test]
    async fn test_refresh_on_401_updates_registry() {
        let mut server = Server::new_async().await;
        let stale = server
            .mock("GET", VERSION_PATH)
            .match_header("authorization", "Bearer sha256~stale")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(status_body(401, "Unauthorized"))
            .expect(1)
            .create_async()
            .await;
        let discovery = server
            .mock("GET", OAUTH_DISCOVERY_PATH)
            .with_status(200)
            .with_body(
                json!({"authorization_endpoint": format!("{}/oauth/authorize", server.url())})
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let authorize = server
            .mock("GET", "/oauth/authorize")
            .match_query(Matcher::Any)
            .with_status(302)
            .with_header(
                "location",
                &format!("{}/oauth/token/implicit#access_token=sha256~fresh", server.url()),
            )
            .expect(1)
            .create_async()
            .await;
        let fresh = server
            .mock("GET", VERSION_PATH)
            .match_header("authorization", "Bearer sha256~fresh")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(cluster_operator())
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().expect("temp dir");
        let registry = Arc::new(ClusterRegistry::open(dir.path()));
        let data: ClusterData = [
            (KEY_USERNAME, "u"),
            (KEY_PASSWORD, "p"),
            (KEY_TOKEN, "sha256~stale"),
        ]
        .into_iter()
        .collect();
        let cluster = registry
            .add(None, &server.url(), "openshift", data)
            .expect("add");
        let manager = OpenShiftManager::new(Arc::new(ClusterProvider::new(registry.clone(), cluster)));

        let version = manager.get_server_version().await.expect("version");
        assert_eq!(version.to_string(), "4.14.8");

        stale.assert_async().await;
        discovery.assert_async().await;
        authorize.assert_async().await;
        fresh.assert_async().await;
        let stored = registry.get(&server.url()).expect("get").expect("cluster");
        assert_eq!(stored.token().as_deref(), Some("sha256~fresh"));
    }

    #[tokio::test]
    async fn test_set_pull_secret_credentials() {
        let docker_config = r#"{"auths":{"q.io":{"auth":"dTpw"}}}"#;
        let secret = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {"name": "pull-secret", "namespace": "openshift-config"},
            "type": "kubernetes.io/dockerconfigjson",
            "data": {".dockerconfigjson": STANDARD.encode(docker_config)},
        })
        .to_string();

        let mut expected = GlobalPullSecretData::from_docker_config(docker_config.as_bytes())
            .expect("parse");
        expected.set_credentials("cp.icr.io", "cp", "k");
        let expected_patch = serde_json::to_value(expected.to_json_patch().expect("patch"))
            .expect("json");

        let mut server = Server::new_async().await;
        server
            .mock("GET", PULL_SECRET_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(&secret)
            .expect(2)
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", PULL_SECRET_PATH)
            .match_query(Matcher::Any)
            .match_header("content-type", "application/json-patch+json")
            .match_body(Matcher::Json(expected_patch))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(&secret)
            .expect(1)
            .create_async()
            .await;

        let manager = token_manager(&server);
        assert!(manager
            .set_global_pull_secret_credentials("cp.icr.io", "cp", "k")
            .await
            .expect("set"));
        assert!(matches!(
            manager.delete_global_pull_secret_credentials("missing.io").await,
            Err(OpenShiftError::RegistryNotFound(_))
        ));
        patch.assert_async().await;
    }
}
