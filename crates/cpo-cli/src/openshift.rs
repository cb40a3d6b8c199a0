//! Cluster-level OpenShift operations
use anyhow::Result;
use clap::{Parser, Subcommand};
use comfy_table::{Row, Table};

use cpo_auth::ClusterTarget;

use crate::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum OpenShiftCmd {
    /// Print the OpenShift server version
    #[command(name = "server-version")]
    ServerVersion(ServerVersionOpt),
    /// List registries of the global pull secret
    #[command(name = "get-global-pull-secret")]
    GetGlobalPullSecret(GetGlobalPullSecretOpt),
    /// Add or replace registry credentials in the global pull secret
    #[command(name = "set-global-pull-secret")]
    SetGlobalPullSecret(SetGlobalPullSecretOpt),
    /// Remove registry credentials from the global pull secret
    #[command(name = "delete-global-pull-secret")]
    DeleteGlobalPullSecret(DeleteGlobalPullSecretOpt),
}

impl OpenShiftCmd {
    pub async fn process(self, context: &CliContext) -> Result<()> {
        match self {
            Self::ServerVersion(opt) => opt.process(context).await,
            Self::GetGlobalPullSecret(opt) => opt.process(context).await,
            Self::SetGlobalPullSecret(opt) => opt.process(context).await,
            Self::DeleteGlobalPullSecret(opt) => opt.process(context).await,
        }
    }
}

#[derive(Debug, Parser)]
pub struct ServerVersionOpt {
    #[command(flatten)]
    target: ClusterTarget,
}

impl ServerVersionOpt {
    async fn process(self, context: &CliContext) -> Result<()> {
        let version = context.manager(&self.target)?.get_server_version().await?;
        println!("{version}");
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct GetGlobalPullSecretOpt {
    #[command(flatten)]
    target: ClusterTarget,

    /// Only this registry
    #[arg(long, value_name = "host")]
    registry: Option<String>,
}

impl GetGlobalPullSecretOpt {
    async fn process(self, context: &CliContext) -> Result<()> {
        let data = context.manager(&self.target)?.get_global_pull_secret().await?;
        let mut table = Table::new();
        table.set_header(Row::from(["REGISTRY", "USERNAME"]));
        for registry in data.registries() {
            if self.registry.as_deref().is_some_and(|wanted| wanted != registry) {
                continue;
            }
            let username = data
                .get_credentials(registry)
                .map(|(username, _)| username)
                .unwrap_or_default();
            table.add_row(Row::from([registry.to_owned(), username]));
        }
        table.load_preset(comfy_table::presets::NOTHING);
        println!("{table}");
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct SetGlobalPullSecretOpt {
    #[command(flatten)]
    target: ClusterTarget,

    /// Registry host
    #[arg(long, value_name = "host")]
    registry: String,

    /// Registry username
    #[arg(long = "registry-username", value_name = "username")]
    registry_username: String,

    /// Registry password
    #[arg(long = "registry-password", value_name = "password")]
    registry_password: String,
}

impl SetGlobalPullSecretOpt {
    async fn process(self, context: &CliContext) -> Result<()> {
        let changed = context
            .manager(&self.target)?
            .set_global_pull_secret_credentials(
                &self.registry,
                &self.registry_username,
                &self.registry_password,
            )
            .await?;
        if changed {
            println!("Updated credentials for {}", self.registry);
        } else {
            println!("Credentials for {} are up to date", self.registry);
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct DeleteGlobalPullSecretOpt {
    #[command(flatten)]
    target: ClusterTarget,

    /// Registry host
    #[arg(long, value_name = "host")]
    registry: String,
}

impl DeleteGlobalPullSecretOpt {
    async fn process(self, context: &CliContext) -> Result<()> {
        context
            .manager(&self.target)?
            .delete_global_pull_secret_credentials(&self.registry)
            .await?;
        println!("Deleted credentials for {}", self.registry);
        Ok(())
    }
}
