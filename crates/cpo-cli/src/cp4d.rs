//!
//! # Cloud Pak for Data commands
//!
//! Install the platform and its services and report their state.
//!
use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use comfy_table::{Row, Table};
use serde_json::Value;

use cpo_auth::ClusterTarget;
use cpo_installer::{
    PLATFORM_VERSION, PlatformInstallation, ServiceCatalog, ServiceInstallation, StorageOption,
    parse_option_value,
};
use cpo_types::defaults::{DEFAULT_INSTANCE_PROJECT, KEY_IBM_CP_ENTITLEMENT_KEY};

use crate::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum Cp4dCmd {
    /// Install Cloud Pak for Data
    #[command(name = "install")]
    Install(InstallOpt),
    /// Install a Cloud Pak for Data service
    #[command(name = "install-service")]
    InstallService(InstallServiceOpt),
    /// Uninstall a Cloud Pak for Data service
    #[command(name = "uninstall-service")]
    UninstallService(UninstallServiceOpt),
    /// List installable services
    #[command(name = "list-services")]
    ListServices(ListServicesOpt),
    /// Report whether a service is installed
    #[command(name = "service-status")]
    ServiceStatus(ServiceStatusOpt),
}

impl Cp4dCmd {
    pub async fn process(self, context: &CliContext) -> Result<()> {
        match self {
            Self::Install(opt) => opt.process(context).await,
            Self::InstallService(opt) => opt.process(context).await,
            Self::UninstallService(opt) => opt.process(context).await,
            Self::ListServices(opt) => opt.process(),
            Self::ServiceStatus(opt) => opt.process(context).await,
        }
    }
}

#[derive(Debug, Default, Args)]
pub struct StorageOpt {
    /// Storage class to provision volumes from
    #[arg(long, conflicts_with = "storage_vendor")]
    storage_class: Option<String>,

    /// Storage vendor to provision volumes from
    #[arg(long)]
    storage_vendor: Option<String>,
}

impl StorageOpt {
    fn storage_option(self) -> Option<StorageOption> {
        match (self.storage_class, self.storage_vendor) {
            (Some(class), _) => Some(StorageOption::StorageClass(class)),
            (None, Some(vendor)) => Some(StorageOption::StorageVendor(vendor)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Parser)]
pub struct InstallOpt {
    #[command(flatten)]
    target: ClusterTarget,

    /// Project of the Cloud Pak for Data instance
    #[arg(long, default_value = DEFAULT_INSTANCE_PROJECT)]
    project: String,

    /// Cloud Pak for Data license
    #[arg(long, default_value = "Enterprise")]
    license: String,

    #[command(flatten)]
    storage: StorageOpt,

    /// IBM Cloud Pak entitlement key; defaults to the stored credential
    #[arg(long)]
    ibm_cp_entitlement_key: Option<String>,
}

impl InstallOpt {
    async fn process(self, context: &CliContext) -> Result<()> {
        let entitlement_key = context.value_or_default(
            self.ibm_cp_entitlement_key,
            KEY_IBM_CP_ENTITLEMENT_KEY,
            "ibm-cp-entitlement-key",
        )?;
        let storage = self
            .storage
            .storage_option()
            .ok_or_else(|| anyhow!("Cloud Pak for Data requires --storage-class or --storage-vendor"))?;
        let installation = PlatformInstallation {
            project: self.project,
            license: self.license,
            storage,
            entitlement_key,
        };

        let installer = context.installer(&self.target)?;
        let result = installer.install_platform(&installation).await?;
        println!("{}", format!("Cloud Pak for Data {PLATFORM_VERSION}").bold());
        println!("URL            : {}", result.url);
        println!("Admin password : {}", result.admin_password);
        Ok(())
    }
}

/// `path=value` installation option
fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), parse_option_value(value))),
        _ => Err(format!("expected <path>=<value>, got {raw}")),
    }
}

#[derive(Debug, Parser)]
pub struct InstallServiceOpt {
    #[command(flatten)]
    target: ClusterTarget,

    /// Service to install
    #[arg(long)]
    service_name: String,

    /// Project of the Cloud Pak for Data instance
    #[arg(long, default_value = DEFAULT_INSTANCE_PROJECT)]
    project: String,

    /// Service license
    #[arg(long, default_value = "Enterprise")]
    license: String,

    #[command(flatten)]
    storage: StorageOpt,

    /// Custom resource option, e.g. `spec.scaleConfig=medium`
    #[arg(long = "installation-option", short = 'o', value_name = "path=value", value_parser = parse_key_value)]
    options: Vec<(String, Value)>,
}

impl InstallServiceOpt {
    async fn process(self, context: &CliContext) -> Result<()> {
        let installation = ServiceInstallation {
            service: self.service_name,
            project: self.project,
            license: self.license,
            storage: self.storage.storage_option(),
            options: self.options.into_iter().collect::<BTreeMap<_, _>>(),
        };
        context
            .installer(&self.target)?
            .install_service(&installation)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct UninstallServiceOpt {
    #[command(flatten)]
    target: ClusterTarget,

    /// Service to uninstall
    #[arg(long)]
    service_name: String,

    /// Project of the Cloud Pak for Data instance
    #[arg(long, default_value = DEFAULT_INSTANCE_PROJECT)]
    project: String,

    /// Delete the project afterwards
    #[arg(long)]
    delete_project: bool,
}

impl UninstallServiceOpt {
    async fn process(self, context: &CliContext) -> Result<()> {
        context
            .installer(&self.target)?
            .uninstall_service(&self.project, &self.service_name, self.delete_project)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct ListServicesOpt {}

impl ListServicesOpt {
    fn process(self) -> Result<()> {
        let catalog = ServiceCatalog::bundled()?;
        let mut table = Table::new();
        table.set_header(Row::from(["SERVICE", "LICENSES", "STORAGE", "DESCRIPTION"]));
        for (name, record) in catalog.services() {
            table.add_row(Row::from([
                name.to_owned(),
                record.licenses.join(", "),
                if record.storage_option_required { "required" } else { "" }.to_owned(),
                record.description.clone(),
            ]));
        }
        table.load_preset(comfy_table::presets::NOTHING);
        println!("{table}");
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct ServiceStatusOpt {
    #[command(flatten)]
    target: ClusterTarget,

    /// Service to check
    #[arg(long)]
    service_name: String,

    /// Project of the Cloud Pak for Data instance
    #[arg(long, default_value = DEFAULT_INSTANCE_PROJECT)]
    project: String,
}

impl ServiceStatusOpt {
    async fn process(self, context: &CliContext) -> Result<()> {
        let installed = context
            .installer(&self.target)?
            .cloud_pak_for_data_service_installed(&self.project, &self.service_name)
            .await?;
        let state = if installed { "installed" } else { "not installed" };
        println!("{} is {state} in {}", self.service_name, self.project);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_installation_options() {
        assert_eq!(
            parse_key_value("spec.scaleConfig=medium").expect("option"),
            ("spec.scaleConfig".to_owned(), Value::from("medium"))
        );
        assert_eq!(
            parse_key_value("replicas=3").expect("option").1,
            Value::from(3)
        );
        assert!(parse_key_value("=3").is_err());
        assert!(parse_key_value("flag").is_err());
    }

    #[test]
    fn test_storage_option() {
        let storage = StorageOpt {
            storage_class: Some("ocs-storagecluster-cephfs".to_owned()),
            storage_vendor: None,
        };
        assert_eq!(
            storage.storage_option(),
            Some(StorageOption::StorageClass("ocs-storagecluster-cephfs".to_owned()))
        );
        assert_eq!(StorageOpt::default().storage_option(), None);
    }
}
