//! Foundational services and the Cloud Pak for Data control plane
use std::collections::BTreeMap;

use serde_json::{Map, Value, json};
use tracing::{info, instrument};

use cpo_openshift::{CustomResource, KindMetadata, lookup};
use cpo_types::defaults::{
    FOUNDATIONAL_SERVICES_PROJECT, IBM_ENTITLED_REGISTRY, IBM_ENTITLED_REGISTRY_USERNAME,
};

use crate::error::{InstallError, Result};
use crate::installer::Installer;
use crate::progress::InstallProgressMessage;
use crate::spec::{StorageOption, assemble_spec};

pub const FOUNDATIONAL_SERVICES_OPERATOR: &str = "ibm-common-service-operator";
pub const PLATFORM_OPERATOR: &str = "cpd-platform-operator";
pub const PLATFORM_VERSION: &str = "4.0.2";
pub const PLATFORM_LICENSES: &[&str] = &["Enterprise", "Standard"];

const IBMCPD_NAME: &str = "ibmcpd-cr";
const OPERAND_REQUEST_NAME: &str = "empty-request";
const ZEN_SERVICE_NAME: &str = "lite-cr";
const ZEN_STATUS_PATH: &str = "status.zenStatus";
const ZEN_URL_PATH: &str = "status.url";
const ADMIN_SECRET_NAME: &str = "admin-user-details";
const ADMIN_PASSWORD_KEY: &str = "initial_admin_password";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInstallation {
    pub project: String,
    pub license: String,
    pub storage: StorageOption,
    pub entitlement_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    pub url: String,
    pub admin_password: String,
}

impl Installer {
    /// Install foundational services and the platform, then wait for the
    /// control plane to come up
    #[instrument(skip_all, fields(project = %installation.project))]
    pub async fn install_platform(&self, installation: &PlatformInstallation) -> Result<InstallResult> {
        if !PLATFORM_LICENSES.contains(&installation.license.as_str()) {
            return Err(InstallError::UnsupportedLicense {
                service: "Cloud Pak for Data".to_owned(),
                license: installation.license.clone(),
                supported: PLATFORM_LICENSES.join(", "),
            });
        }
        self.install_foundational_services(&installation.entitlement_key)
            .await?;
        self.install_control_plane(installation).await?;
        let result = self.install_result(&installation.project).await?;
        self.progress
            .render(&InstallProgressMessage::Success("Cloud Pak for Data".to_owned()));
        info!(url = %result.url, "platform installed");
        Ok(result)
    }

    /// Does not wait for the operator to reconcile
    pub async fn install_foundational_services(&self, entitlement_key: &str) -> Result<()> {
        self.ensure_operator_project(FOUNDATIONAL_SERVICES_PROJECT)
            .await?;
        let updated = self
            .manager
            .set_global_pull_secret_credentials(
                IBM_ENTITLED_REGISTRY,
                IBM_ENTITLED_REGISTRY_USERNAME,
                entitlement_key,
            )
            .await?;
        if updated {
            self.progress.render(&InstallProgressMessage::PullSecretUpdated(
                IBM_ENTITLED_REGISTRY.to_owned(),
            ));
        }
        self.install_operator(FOUNDATIONAL_SERVICES_OPERATOR).await
    }

    async fn install_control_plane(&self, installation: &PlatformInstallation) -> Result<()> {
        let project = installation.project.as_str();
        self.ensure_project(project).await?;
        self.install_operator(PLATFORM_OPERATOR).await?;

        let ibmcpd = KindMetadata::ibmcpd();
        let operand_request = KindMetadata::operand_request();
        self.wait_for_definitions(&[ibmcpd.kind.as_str(), operand_request.kind.as_str()])
            .await?;

        self.ensure_custom_resource(
            CustomResource::new(operand_request, OPERAND_REQUEST_NAME, json!({"requests": []}))
                .within(project),
        )
        .await?;

        let template = Map::from_iter([(
            "version".to_owned(),
            Value::String(PLATFORM_VERSION.to_owned()),
        )]);
        let spec = assemble_spec(
            &template,
            &installation.license,
            &BTreeMap::new(),
            Some(&installation.storage),
        );
        self.ensure_custom_resource(CustomResource::new(ibmcpd, IBMCPD_NAME, spec).within(project))
            .await?;

        let zen_service = KindMetadata::zen_service();
        self.wait_for_definitions(&[zen_service.kind.as_str()])
            .await?;
        self.wait_for_completion(project, &zen_service, ZEN_SERVICE_NAME, ZEN_STATUS_PATH)
            .await
    }

    /// Create unless present; returns whether it was created
    pub(crate) async fn ensure_custom_resource(&self, resource: CustomResource) -> Result<bool> {
        let name = resource.name().to_owned();
        if self
            .manager
            .resource_exists(&resource.kind, resource.namespace(), &name)
            .await?
        {
            self.progress
                .render(&InstallProgressMessage::CustomResourceExists(name));
            return Ok(false);
        }
        self.manager.create_custom_resource(&resource).await?;
        self.progress
            .render(&InstallProgressMessage::CreatingCustomResource(name));
        Ok(true)
    }

    /// URL and initial admin password of an installed platform
    pub async fn install_result(&self, project: &str) -> Result<InstallResult> {
        let zen_service = self
            .manager
            .get_custom_resource_if_exists(&KindMetadata::zen_service(), Some(project), ZEN_SERVICE_NAME)
            .await?
            .ok_or_else(|| InstallError::MissingResult(format!("ZenService {ZEN_SERVICE_NAME} not found")))?;
        let url = lookup(&zen_service, ZEN_URL_PATH)
            .and_then(Value::as_str)
            .ok_or_else(|| InstallError::MissingResult(format!("{ZEN_URL_PATH} not set")))?
            .to_owned();

        let secret = self.manager.get_secret(project, ADMIN_SECRET_NAME).await?;
        let password = secret
            .data
            .and_then(|mut data| data.remove(ADMIN_PASSWORD_KEY))
            .ok_or_else(|| {
                InstallError::MissingResult(format!("{ADMIN_SECRET_NAME} has no {ADMIN_PASSWORD_KEY}"))
            })?;
        let admin_password = String::from_utf8(password.0).map_err(|_| {
            InstallError::MissingResult(format!("{ADMIN_PASSWORD_KEY} is not UTF-8"))
        })?;
        Ok(InstallResult {
            url,
            admin_password,
        })
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use mockito::Server;

    use cpo_auth::TokenProvider;
    use cpo_openshift::OpenShiftManager;

    use crate::catalog::ServiceCatalog;

    use super::*;

    fn installer(server: &mockito::ServerGuard) -> Installer {
        let provider = Arc::new(TokenProvider::new(server.url(), "sha256~t", false));
        Installer::new(
            OpenShiftManager::new(provider),
            ServiceCatalog::bundled().expect("catalog"),
        )
    }

    #[tokio::test]
    async fn test_install_result() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/apis/zen.cpd.ibm.com/v1/namespaces/cpd-instance/zenservices/lite-cr")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "apiVersion": "zen.cpd.ibm.com/v1",
                    "kind": "ZenService",
                    "metadata": {"name": "lite-cr", "namespace": "cpd-instance"},
                    "status": {"url": "cpd-cpd-instance.apps.example.com", "zenStatus": "Completed"},
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/namespaces/cpd-instance/secrets/admin-user-details")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "apiVersion": "v1",
                    "kind": "Secret",
                    "metadata": {"name": "admin-user-details"},
                    "data": {"initial_admin_password": STANDARD.encode("s3cret")},
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = installer(&server)
            .install_result("cpd-instance")
            .await
            .expect("result");
        assert_eq!(
            result,
            InstallResult {
                url: "cpd-cpd-instance.apps.example.com".to_owned(),
                admin_password: "s3cret".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn test_platform_license_is_checked_first() {
        let server = Server::new_async().await;
        let installation = PlatformInstallation {
            project: "cpd-instance".to_owned(),
            license: "WKC".to_owned(),
            storage: StorageOption::StorageVendor("ocs".to_owned()),
            entitlement_key: "key".to_owned(),
        };
        let err = installer(&server)
            .install_platform(&installation)
            .await
            .expect_err("license");
        assert!(matches!(err, InstallError::UnsupportedLicense { .. }));
    }

    mod workflow {
        use base64::Engine as _;
        use mockito::{Matcher, Mock, ServerGuard};

        use cpo_openshift::GlobalPullSecretData;

        use super::*;

        const PROJECT_REQUESTS_PATH: &str = "/apis/project.openshift.io/v1/projectrequests";
        const PROJECTS_PATH: &str = "/apis/project.openshift.io/v1/projects";
        const OPERATOR_GROUPS_PATH: &str =
            "/apis/operators.coreos.com/v1/namespaces/ibm-common-services/operatorgroups";
        const CATALOG_SOURCES_PATH: &str =
            "/apis/operators.coreos.com/v1alpha1/namespaces/openshift-marketplace/catalogsources";
        const SUBSCRIPTIONS_PATH: &str =
            "/apis/operators.coreos.com/v1alpha1/namespaces/ibm-common-services/subscriptions";
        const OPERAND_REQUESTS_PATH: &str =
            "/apis/operator.ibm.com/v1alpha1/namespaces/cpd-instance/operandrequests";
        const IBMCPDS_PATH: &str = "/apis/cpd.ibm.com/v1/namespaces/cpd-instance/ibmcpds";
        const ZEN_SERVICES_PATH: &str = "/apis/zen.cpd.ibm.com/v1/namespaces/cpd-instance/zenservices";
        const CRD_PATH: &str = "/apis/apiextensions.k8s.io/v1/customresourcedefinitions";
        const PULL_SECRET_PATH: &str = "/api/v1/namespaces/openshift-config/secrets/pull-secret";
        const ADMIN_SECRET_PATH: &str = "/api/v1/namespaces/cpd-instance/secrets/admin-user-details";
        const DOCKER_CONFIG: &str = r#"{"auths":{"quay.io":{"auth":"dTpw"}}}"#;

        fn installation() -> PlatformInstallation {
            PlatformInstallation {
                project: "cpd-instance".to_owned(),
                license: "Enterprise".to_owned(),
                storage: StorageOption::StorageClass("ocs-storagecluster-cephfs".to_owned()),
                entitlement_key: "entitlement-key".to_owned(),
            }
        }

        fn object(api_version: &str, kind: &str, name: &str) -> Value {
            json!({"apiVersion": api_version, "kind": kind, "metadata": {"name": name, "resourceVersion": "1"}})
        }

        fn crd(kind: &str) -> Value {
            let mut crd = object(
                "apiextensions.k8s.io/v1",
                "CustomResourceDefinition",
                &format!("{}s.cpd.ibm.com", kind.to_lowercase()),
            );
            crd["spec"] = json!({"names": {"kind": kind}});
            crd
        }

        fn zen_service(status: &str) -> Value {
            let mut zen = object("zen.cpd.ibm.com/v1", "ZenService", "lite-cr");
            zen["metadata"]["namespace"] = json!("cpd-instance");
            zen["status"] = json!({"url": "cpd-cpd-instance.apps.example.com", "zenStatus": status});
            zen
        }

        fn pull_secret(docker_config: &[u8]) -> String {
            json!({
                "apiVersion": "v1",
                "kind": "Secret",
                "metadata": {"name": "pull-secret", "namespace": "openshift-config"},
                "type": "kubernetes.io/dockerconfigjson",
                "data": {".dockerconfigjson": STANDARD.encode(docker_config)},
            })
            .to_string()
        }

        fn not_found() -> String {
            json!({"kind": "Status", "apiVersion": "v1", "metadata": {}, "status": "Failure",
                   "message": "not found", "reason": "NotFound", "code": 404})
            .to_string()
        }

        fn watch_body(events: &[(&str, Value)]) -> String {
            events
                .iter()
                .map(|(event_type, object)| json!({"type": event_type, "object": object}).to_string() + "\n")
                .collect()
        }

        /// Objects the workflow looks up before creating them
        fn lookups() -> Vec<(String, Value)> {
            vec![
                (format!("{PROJECTS_PATH}/ibm-common-services"), object("project.openshift.io/v1", "Project", "ibm-common-services")),
                (format!("{OPERATOR_GROUPS_PATH}/operatorgroup"), object("operators.coreos.com/v1", "OperatorGroup", "operatorgroup")),
                (format!("{CATALOG_SOURCES_PATH}/opencloud-operators"), object("operators.coreos.com/v1alpha1", "CatalogSource", "opencloud-operators")),
                (format!("{SUBSCRIPTIONS_PATH}/ibm-common-service-operator"), object("operators.coreos.com/v1alpha1", "Subscription", "ibm-common-service-operator")),
                (format!("{PROJECTS_PATH}/cpd-instance"), object("project.openshift.io/v1", "Project", "cpd-instance")),
                (format!("{CATALOG_SOURCES_PATH}/cpd-platform"), object("operators.coreos.com/v1alpha1", "CatalogSource", "cpd-platform")),
                (format!("{SUBSCRIPTIONS_PATH}/cpd-operator"), object("operators.coreos.com/v1alpha1", "Subscription", "cpd-operator")),
                (format!("{OPERAND_REQUESTS_PATH}/empty-request"), object("operator.ibm.com/v1alpha1", "OperandRequest", "empty-request")),
                (format!("{IBMCPDS_PATH}/ibmcpd-cr"), object("cpd.ibm.com/v1", "Ibmcpd", "ibmcpd-cr")),
            ]
        }

        async fn get(server: &mut ServerGuard, path: &str, status: usize, body: String) -> Mock {
            server
                .mock("GET", path)
                .with_status(status)
                .with_header("content-type", "application/json")
                .with_body(body)
                .create_async()
                .await
        }

        async fn watch(server: &mut ServerGuard, path: &str, body: String) -> Mock {
            server
                .mock("GET", path)
                .match_query(Matcher::UrlEncoded("watch".into(), "true".into()))
                .with_status(200)
                .with_body(body)
                .create_async()
                .await
        }

        async fn post(server: &mut ServerGuard, path: &str, body: Matcher, hits: usize, created: Value) -> Mock {
            server
                .mock("POST", path)
                .match_query(Matcher::Any)
                .match_body(body)
                .with_status(201)
                .with_header("content-type", "application/json")
                .with_body(created.to_string())
                .expect(hits)
                .create_async()
                .await
        }

        #[tokio::test]
        async fn test_install_platform_then_repeat_changes_nothing() {
            let mut installed_pull_secret =
                GlobalPullSecretData::from_docker_config(DOCKER_CONFIG.as_bytes()).expect("parse");
            assert!(installed_pull_secret.set_credentials("cp.icr.io", "cp", "entitlement-key"));
            let expected_patch =
                serde_json::to_value(installed_pull_secret.to_json_patch().expect("patch")).expect("json");

            let mut server = Server::new_async().await;

            // shared by both runs
            watch(
                &mut server,
                CRD_PATH,
                watch_body(&[
                    ("ADDED", crd("Ibmcpd")),
                    ("ADDED", crd("OperandRequest")),
                    ("ADDED", crd("ZenService")),
                ]),
            )
            .await;
            watch(
                &mut server,
                ZEN_SERVICES_PATH,
                watch_body(&[("ADDED", zen_service("InProgress")), ("MODIFIED", zen_service("Completed"))]),
            )
            .await;
            get(&mut server, &format!("{ZEN_SERVICES_PATH}/lite-cr"), 200, zen_service("Completed").to_string()).await;
            get(
                &mut server,
                ADMIN_SECRET_PATH,
                200,
                json!({
                    "apiVersion": "v1",
                    "kind": "Secret",
                    "metadata": {"name": "admin-user-details"},
                    "data": {"initial_admin_password": STANDARD.encode("s3cret")},
                })
                .to_string(),
            )
            .await;

            // first run against an empty cluster
            let mut missing = Vec::new();
            for (path, _) in lookups() {
                missing.push(get(&mut server, &path, 404, not_found()).await);
            }
            missing.push(get(&mut server, PULL_SECRET_PATH, 200, pull_secret(DOCKER_CONFIG.as_bytes())).await);

            let changes = vec![
                post(&mut server, PROJECT_REQUESTS_PATH, Matcher::PartialJson(json!({"kind": "ProjectRequest"})), 2,
                     object("project.openshift.io/v1", "ProjectRequest", "ibm-common-services")).await,
                post(&mut server, OPERATOR_GROUPS_PATH, Matcher::PartialJson(json!({"metadata": {"name": "operatorgroup"}})), 1,
                     object("operators.coreos.com/v1", "OperatorGroup", "operatorgroup")).await,
                post(&mut server, CATALOG_SOURCES_PATH, Matcher::PartialJson(json!({"kind": "CatalogSource"})), 2,
                     object("operators.coreos.com/v1alpha1", "CatalogSource", "opencloud-operators")).await,
                post(&mut server, SUBSCRIPTIONS_PATH, Matcher::PartialJson(json!({"kind": "Subscription"})), 2,
                     object("operators.coreos.com/v1alpha1", "Subscription", "cpd-operator")).await,
                post(
                    &mut server,
                    OPERAND_REQUESTS_PATH,
                    Matcher::PartialJson(json!({
                        "metadata": {"name": "empty-request", "namespace": "cpd-instance"},
                        "spec": {"requests": []},
                    })),
                    1,
                    object("operator.ibm.com/v1alpha1", "OperandRequest", "empty-request"),
                )
                .await,
                post(
                    &mut server,
                    IBMCPDS_PATH,
                    Matcher::PartialJson(json!({
                        "metadata": {"name": "ibmcpd-cr", "namespace": "cpd-instance"},
                        "spec": {
                            "license": {"accept": true, "license": "Enterprise"},
                            "storageClass": "ocs-storagecluster-cephfs",
                            "version": "4.0.2",
                        },
                    })),
                    1,
                    object("cpd.ibm.com/v1", "Ibmcpd", "ibmcpd-cr"),
                )
                .await,
                server
                    .mock("PATCH", PULL_SECRET_PATH)
                    .match_query(Matcher::Any)
                    .match_header("content-type", "application/json-patch+json")
                    .match_body(Matcher::Json(expected_patch))
                    .with_status(200)
                    .with_header("content-type", "application/json")
                    .with_body(pull_secret(&installed_pull_secret.to_docker_config().expect("config")))
                    .expect(1)
                    .create_async()
                    .await,
            ];

            let installer = installer(&server);
            let expected = InstallResult {
                url: "cpd-cpd-instance.apps.example.com".to_owned(),
                admin_password: "s3cret".to_owned(),
            };
            assert_eq!(
                installer.install_platform(&installation()).await.expect("first install"),
                expected
            );
            for mock in changes {
                mock.assert_async().await;
                mock.remove_async().await;
            }
            for mock in missing {
                mock.remove_async().await;
            }

            // second run: everything is in place
            for (path, existing) in lookups() {
                get(&mut server, &path, 200, existing.to_string()).await;
            }
            get(
                &mut server,
                PULL_SECRET_PATH,
                200,
                pull_secret(&installed_pull_secret.to_docker_config().expect("config")),
            )
            .await;
            let posts = server.mock("POST", Matcher::Any).expect(0).create_async().await;
            let patches = server.mock("PATCH", Matcher::Any).expect(0).create_async().await;

            assert_eq!(
                installer.install_platform(&installation()).await.expect("second install"),
                expected
            );
            posts.assert_async().await;
            patches.assert_async().await;
        }
    }

    #[test]
    fn test_platform_operators_are_in_catalog() {
        let catalog = ServiceCatalog::bundled().expect("catalog");
        for operator in [FOUNDATIONAL_SERVICES_OPERATOR, PLATFORM_OPERATOR] {
            let subscription = catalog.subscription(operator).expect("operator");
            assert_eq!(subscription.namespace(), FOUNDATIONAL_SERVICES_PROJECT);
            assert!(subscription.catalog_source.is_some());
        }
    }
}
