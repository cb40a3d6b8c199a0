use std::future::Future;
use std::time::Duration;

use tracing::{debug, instrument};

use cpo_openshift::{KindMetadata, OpenShiftManager, operator_group};
use cpo_types::defaults::OPENSHIFT_MARKETPLACE_NAMESPACE;

use crate::callbacks::{CrCompleted, CrdsCreated};
use crate::catalog::{ServiceCatalog, SubscriptionMetadata};
use crate::error::{InstallError, Result};
use crate::progress::{InstallProgressMessage, ProgressRenderer};

const OPERATOR_GROUP_NAME: &str = "operatorgroup";

/// Drives platform and service installs against one cluster.
///
/// Every step checks for existing resources first, so an interrupted run
/// can simply be repeated.
#[derive(Debug)]
pub struct Installer {
    pub(crate) manager: OpenShiftManager,
    pub(crate) catalog: ServiceCatalog,
    pub(crate) progress: ProgressRenderer,
    watch_timeout: Option<Duration>,
}

impl Installer {
    pub fn new(manager: OpenShiftManager, catalog: ServiceCatalog) -> Self {
        Self {
            manager,
            catalog,
            progress: ProgressRenderer::Hidden,
            watch_timeout: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressRenderer) -> Self {
        self.progress = progress;
        self
    }

    /// Bound every watch; unbounded by default
    pub fn with_watch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.watch_timeout = timeout;
        self
    }

    pub fn manager(&self) -> &OpenShiftManager {
        &self.manager
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    async fn bounded<T, F>(&self, what: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.watch_timeout {
            Some(limit) => tokio::time::timeout(limit, future)
                .await
                .map_err(|_| InstallError::Timeout(what.to_owned()))?,
            None => future.await,
        }
    }

    pub(crate) async fn ensure_project(&self, name: &str) -> Result<bool> {
        if self.manager.project_exists(name).await? {
            self.progress
                .render(&InstallProgressMessage::ProjectExists(name.to_owned()));
            return Ok(false);
        }
        self.manager.create_project(name).await?;
        self.progress
            .render(&InstallProgressMessage::CreatingProject(name.to_owned()));
        Ok(true)
    }

    /// Project with an operator group targeting itself
    pub(crate) async fn ensure_operator_project(&self, name: &str) -> Result<()> {
        self.ensure_project(name).await?;
        if !self
            .manager
            .operator_group_exists(name, OPERATOR_GROUP_NAME)
            .await?
        {
            self.manager
                .create_custom_resource(&operator_group(name, OPERATOR_GROUP_NAME))
                .await?;
        }
        Ok(())
    }

    /// Catalog source and subscription for one operator
    #[instrument(skip(self, subscription), fields(subscription = %subscription.name))]
    pub(crate) async fn ensure_subscription(&self, subscription: &SubscriptionMetadata) -> Result<()> {
        if let Some(source) = subscription.catalog_source_request() {
            let exists = self
                .manager
                .resource_exists(
                    &KindMetadata::catalog_source(),
                    Some(OPENSHIFT_MARKETPLACE_NAMESPACE),
                    &source.name,
                )
                .await?;
            if !exists {
                self.manager.create_catalog_source(&source).await?;
                self.progress
                    .render(&InstallProgressMessage::CreatingCatalogSource(source.name));
            }
        }

        let namespace = subscription.namespace();
        if self
            .manager
            .subscription_exists(namespace, &subscription.name)
            .await?
        {
            self.progress.render(&InstallProgressMessage::SubscriptionExists(
                subscription.name.clone(),
            ));
            return Ok(());
        }
        self.manager
            .create_subscription(namespace, &subscription.subscription_request())
            .await?;
        self.progress.render(&InstallProgressMessage::CreatingSubscription(
            subscription.name.clone(),
        ));
        Ok(())
    }

    /// Subscribe to `operator` and everything it depends on
    pub(crate) async fn install_operator(&self, operator: &str) -> Result<()> {
        for name in self.catalog.install_order(operator)? {
            let subscription = self.catalog.subscription(name)?;
            debug!(operator = name, namespace = subscription.namespace(), "installing operator");
            self.ensure_subscription(subscription).await?;
        }
        Ok(())
    }

    pub(crate) async fn wait_for_definitions(&self, kinds: &[&str]) -> Result<()> {
        let message = InstallProgressMessage::WaitingForDefinitions(
            kinds.iter().map(|kind| (*kind).to_owned()).collect(),
        );
        self.progress.start(&message);
        let mut callback = CrdsCreated::new(kinds.iter().copied());
        let what = format!("custom resource definitions {}", kinds.join(", "));
        self.bounded(&what, async {
            self.manager
                .watch_custom_resource(&KindMetadata::custom_resource_definition(), &mut callback)
                .await
                .map_err(InstallError::from)
        })
        .await?;
        self.progress.render(&message);
        Ok(())
    }

    pub(crate) async fn wait_for_completion(
        &self,
        project: &str,
        kind: &KindMetadata,
        name: &str,
        status_path: &str,
    ) -> Result<()> {
        let message = InstallProgressMessage::WaitingForCompletion(format!("{} {name}", kind.kind));
        self.progress.start(&message);
        let mut callback = CrCompleted::new(name, status_path);
        let what = format!("{} {name} in {project}", kind.kind);
        self.bounded(&what, async {
            self.manager
                .watch_namespaced_custom_resource(project, kind, &mut callback)
                .await
                .map_err(InstallError::from)
        })
        .await?;
        self.progress.render(&message);
        Ok(())
    }
}
