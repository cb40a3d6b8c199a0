//! State shared by all commands of one invocation
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::error::ErrorKind;

use cpo_auth::ClusterTarget;
use cpo_config::{ClusterRegistry, ConfigStore};
use cpo_installer::{Installer, ProgressBarFactory, ServiceCatalog};
use cpo_openshift::OpenShiftManager;
use cpo_types::defaults::SETTING_WATCH_TIMEOUT_SECONDS;

#[derive(Clone)]
pub struct CliContext {
    registry: Arc<ClusterRegistry>,
}

impl CliContext {
    pub fn new(registry: Arc<ClusterRegistry>) -> Self {
        Self { registry }
    }

    /// Context over the default data directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Arc::new(ClusterRegistry::open_default()?)))
    }

    pub fn registry(&self) -> &Arc<ClusterRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &ConfigStore {
        self.registry.store()
    }

    pub fn manager(&self, target: &ClusterTarget) -> Result<OpenShiftManager> {
        let provider = target.load(&self.registry)?;
        Ok(OpenShiftManager::new(provider))
    }

    /// Installer with terminal progress and the configured watch timeout
    pub fn installer(&self, target: &ClusterTarget) -> Result<Installer> {
        let watch_timeout = self
            .store()
            .get_setting::<u64>(SETTING_WATCH_TIMEOUT_SECONDS)?
            .map(Duration::from_secs);
        let progress = ProgressBarFactory::new(false).create()?;
        Ok(
            Installer::new(self.manager(target)?, ServiceCatalog::bundled()?)
                .with_progress(progress)
                .with_watch_timeout(watch_timeout),
        )
    }

    /// `value`, or else `key` of the current credentials view. Fails like
    /// a missing required option when neither is set.
    pub fn value_or_default(&self, value: Option<String>, key: &str, option: &str) -> Result<String> {
        if let Some(value) = value.filter(|value| !value.is_empty()) {
            return Ok(value);
        }
        let view = self.registry.current_credentials_view()?;
        match view.get(key) {
            Some(value) => Ok(value.clone()),
            None => Err(missing_option(option).into()),
        }
    }
}

pub(crate) fn missing_option(option: &str) -> clap::Error {
    clap::Error::raw(
        ErrorKind::MissingRequiredArgument,
        format!("the following required arguments were not provided:\n  --{option} <{option}>\n"),
    )
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use cpo_config::ClusterData;
    use cpo_types::defaults::{KEY_IBM_CP_ENTITLEMENT_KEY, KEY_SERVER, KEY_USERNAME};

    use super::*;

    fn context() -> (tempfile::TempDir, CliContext) {
        let dir = tempfile::tempdir().expect("temp dir");
        let context = CliContext::new(Arc::new(ClusterRegistry::open(dir.path())));
        (dir, context)
    }

    #[test]
    fn test_explicit_value_wins() {
        let (_dir, context) = context();
        let value = context
            .value_or_default(Some("k1".to_owned()), KEY_IBM_CP_ENTITLEMENT_KEY, "ibm-cp-entitlement-key")
            .expect("value");
        assert_eq!(value, "k1");
    }

    #[test]
    fn test_defaults_from_credentials_and_current_cluster() {
        let (_dir, context) = context();
        context
            .registry()
            .merge_credentials(BTreeMap::from([(
                KEY_IBM_CP_ENTITLEMENT_KEY.to_owned(),
                "stored".to_owned(),
            )]))
            .expect("merge");
        let mut data = ClusterData::new();
        data.insert(KEY_USERNAME, "kubeadmin");
        context
            .registry()
            .add(Some("a"), "https://api.a:6443", "openshift", data)
            .expect("add");
        context.registry().set_current("a").expect("use");

        let entitlement = context
            .value_or_default(None, KEY_IBM_CP_ENTITLEMENT_KEY, "ibm-cp-entitlement-key")
            .expect("entitlement");
        assert_eq!(entitlement, "stored");
        let server = context
            .value_or_default(Some(String::new()), KEY_SERVER, "server")
            .expect("server");
        assert_eq!(server, "https://api.a:6443");
    }

    #[test]
    fn test_missing_value_is_a_usage_error() {
        let (_dir, context) = context();
        let err = context
            .value_or_default(None, KEY_IBM_CP_ENTITLEMENT_KEY, "ibm-cp-entitlement-key")
            .expect_err("missing");
        let clap_err = err.downcast_ref::<clap::Error>().expect("clap error");
        assert_eq!(clap_err.kind(), ErrorKind::MissingRequiredArgument);
        assert!(clap_err.to_string().contains("--ibm-cp-entitlement-key"));
    }
}
