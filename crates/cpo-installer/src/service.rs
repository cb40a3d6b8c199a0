//! Service install and uninstall
use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, info, instrument};

use cpo_openshift::{CustomResource, KindMetadata, lookup};
use cpo_types::defaults::{COMPLETED_STATUS, OPENSHIFT_MARKETPLACE_NAMESPACE};

use crate::error::{InstallError, Result};
use crate::installer::Installer;
use crate::progress::InstallProgressMessage;
use crate::spec::{StorageOption, assemble_spec};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceInstallation {
    pub service: String,
    pub project: String,
    pub license: String,
    pub storage: Option<StorageOption>,
    /// dotted spec paths
    pub options: BTreeMap<String, Value>,
}

impl Installer {
    #[instrument(skip_all, fields(service = %installation.service, project = %installation.project))]
    pub async fn install_service(&self, installation: &ServiceInstallation) -> Result<()> {
        let service = installation.service.as_str();
        let record = self.catalog.custom_resource(service)?;
        record.check_license(service, &installation.license)?;
        if record.storage_option_required && installation.storage.is_none() {
            return Err(InstallError::MissingStorageOption(service.to_owned()));
        }

        let order = self.catalog.install_order(&record.operator_name)?;
        let namespaces: BTreeSet<&str> = order
            .iter()
            .map(|operator| self.catalog.subscription(operator).map(|s| s.namespace()))
            .collect::<Result<_>>()?;
        for namespace in namespaces {
            self.ensure_operator_project(namespace).await?;
        }
        self.install_operator(&record.operator_name).await?;

        let kind = record.kind_metadata();
        let project = installation.project.as_str();
        let exists = self
            .manager
            .namespaced_custom_resource_exists(project, &kind, &record.name)
            .await?;
        if exists {
            self.progress
                .render(&InstallProgressMessage::CustomResourceExists(record.name.clone()));
        } else {
            self.wait_for_definitions(&[record.kind.as_str()]).await?;
            let spec = assemble_spec(
                &record.spec,
                &installation.license,
                &installation.options,
                installation.storage.as_ref(),
            );
            debug!(%spec, "assembled spec");
            self.ensure_custom_resource(CustomResource::new(kind.clone(), &record.name, spec).within(project))
                .await?;
        }

        self.wait_for_completion(project, &kind, &record.name, &record.status_path())
            .await?;
        self.progress
            .render(&InstallProgressMessage::Success(record.description.clone()));
        info!("service installed");
        Ok(())
    }

    /// Remove what [`Installer::install_service`] created for `service`.
    /// Dependencies shared with other services are kept.
    #[instrument(skip(self))]
    pub async fn uninstall_service(
        &self,
        project: &str,
        service: &str,
        delete_project: bool,
    ) -> Result<()> {
        let record = self.catalog.custom_resource(service)?;
        let subscription = self.catalog.subscription(&record.operator_name)?;
        let namespace = subscription.namespace();

        let kind = record.kind_metadata();
        if self
            .manager
            .delete_custom_resource(&kind, Some(project), &record.name)
            .await?
        {
            self.deleted(format!("{} {}", kind.kind, record.name));
        }

        let installed_csv = self
            .manager
            .get_custom_resource_if_exists(&KindMetadata::subscription(), Some(namespace), &subscription.name)
            .await?
            .and_then(|object| {
                lookup(&object, "status.installedCSV")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            });
        if self
            .manager
            .delete_subscription(namespace, &subscription.name)
            .await?
        {
            self.deleted(format!("Subscription {}", subscription.name));
        }
        if let Some(csv) = installed_csv {
            if self
                .manager
                .delete_cluster_service_version(namespace, &csv)
                .await?
            {
                self.deleted(format!("ClusterServiceVersion {csv}"));
            }
        }

        let crd = record.crd_name();
        if self.manager.delete_custom_resource_definition(&crd).await? {
            self.deleted(format!("CustomResourceDefinition {crd}"));
        }
        let operator = subscription.operator_object_name();
        if self.manager.delete_operator(&operator).await? {
            self.deleted(format!("Operator {operator}"));
        }
        if let Some(source) = &subscription.catalog_source {
            if self
                .manager
                .delete_catalog_source(OPENSHIFT_MARKETPLACE_NAMESPACE, &source.name)
                .await?
            {
                self.deleted(format!("CatalogSource {}", source.name));
            }
        }

        if delete_project && self.manager.delete_project(project).await? {
            self.deleted(format!("Project {project}"));
        }
        info!("service uninstalled");
        Ok(())
    }

    /// The service's custom resource exists in `project` and reports
    /// `Completed`
    pub async fn cloud_pak_for_data_service_installed(
        &self,
        project: &str,
        service: &str,
    ) -> Result<bool> {
        let record = self.catalog.custom_resource(service)?;
        let object = self
            .manager
            .get_custom_resource_if_exists(&record.kind_metadata(), Some(project), &record.name)
            .await?;
        Ok(object
            .as_ref()
            .and_then(|object| lookup(object, &record.status_path()))
            .and_then(Value::as_str)
            == Some(COMPLETED_STATUS))
    }

    fn deleted(&self, what: String) {
        self.progress.render(&InstallProgressMessage::Deleting(what));
    }
}
