//!
//! # Cluster commands
//!
//! Manage the registry of known OpenShift clusters and the current cluster.
//!
use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use cpo_auth::ClusterTarget;
use cpo_config::{ClusterData, ClusterType};
use cpo_types::defaults::{
    KEY_CLUSTER_NAME, KEY_INSECURE_SKIP_TLS_VERIFY, KEY_PASSWORD, KEY_SERVER, KEY_TOKEN,
    KEY_USERNAME,
};

use crate::context::CliContext;

const MASK: &str = "********";

#[derive(Debug, Subcommand)]
pub enum ClusterCmd {
    /// Register an OpenShift cluster
    #[command(name = "add")]
    Add(AddClusterOpt),
    /// Change attributes of a registered cluster
    #[command(name = "edit")]
    Edit(EditClusterOpt),
    /// Replace all attributes of a registered cluster
    #[command(name = "set-cluster-data")]
    SetClusterData(SetClusterDataOpt),
    /// Print a registered cluster
    #[command(name = "get")]
    Get(GetClusterOpt),
    /// List registered clusters
    #[command(name = "list")]
    List(ListClusterOpt),
    /// Set the current cluster
    #[command(name = "use")]
    Use(UseClusterOpt),
    /// Print the server URL of the current cluster
    #[command(name = "current")]
    Current(CurrentClusterOpt),
    /// Remove a registered cluster
    #[command(name = "remove")]
    Remove(RemoveClusterOpt),
    /// Print an `oc login` command for a cluster
    #[command(name = "login-command")]
    LoginCommand(LoginCommandOpt),
}

impl ClusterCmd {
    pub async fn process(self, context: &CliContext) -> Result<()> {
        match self {
            Self::Add(opt) => opt.process(context),
            Self::Edit(opt) => opt.process(context),
            Self::SetClusterData(opt) => opt.process(context),
            Self::Get(opt) => opt.process(context),
            Self::List(opt) => opt.process(context),
            Self::Use(opt) => opt.process(context),
            Self::Current(opt) => opt.process(context),
            Self::Remove(opt) => opt.process(context),
            Self::LoginCommand(opt) => opt.process(context),
        }
    }
}

/// attributes shared by `add` and `edit`
#[derive(Debug, Default, Args)]
pub struct ClusterAttributes {
    /// OpenShift username
    #[arg(long)]
    username: Option<String>,

    /// OpenShift password
    #[arg(long)]
    password: Option<String>,

    /// OpenShift OAuth access token
    #[arg(long)]
    token: Option<String>,

    /// Cluster name at the provisioning service
    #[arg(long)]
    cluster_name: Option<String>,
}

impl ClusterAttributes {
    fn into_data(self) -> ClusterData {
        let mut data = ClusterData::new();
        for (key, value) in [
            (KEY_USERNAME, self.username),
            (KEY_PASSWORD, self.password),
            (KEY_TOKEN, self.token),
            (KEY_CLUSTER_NAME, self.cluster_name),
        ] {
            if let Some(value) = value {
                data.insert(key, value);
            }
        }
        data
    }
}

#[derive(Debug, Parser)]
pub struct AddClusterOpt {
    /// OpenShift API server URL
    #[arg(long, value_name = "url")]
    server: String,

    /// Alias to refer to the cluster by
    #[arg(long)]
    alias: Option<String>,

    /// Cluster type
    #[arg(
        long = "type",
        value_name = "type",
        default_value = "openshift",
        value_parser = PossibleValuesParser::new(ClusterType::ALL.map(|t| t.type_id()))
    )]
    type_id: String,

    #[command(flatten)]
    attributes: ClusterAttributes,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure_skip_tls_verify: bool,
}

impl AddClusterOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        let mut data = self.attributes.into_data();
        if self.insecure_skip_tls_verify {
            data.insert(KEY_INSECURE_SKIP_TLS_VERIFY, true);
        }
        let cluster = context
            .registry()
            .add(self.alias.as_deref(), &self.server, &self.type_id, data)?;
        println!("Added cluster {}", cluster.server());
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct EditClusterOpt {
    /// Alias or server URL of the cluster
    alias_or_server: String,

    /// New alias; an empty string removes the alias
    #[arg(long)]
    alias: Option<String>,

    #[command(flatten)]
    attributes: ClusterAttributes,

    /// Skip TLS certificate verification
    #[arg(long, value_name = "bool")]
    insecure_skip_tls_verify: Option<bool>,
}

impl EditClusterOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        let mut patch = self.attributes.into_data();
        if let Some(alias) = self.alias {
            patch.insert(cpo_types::defaults::KEY_ALIAS, alias);
        }
        if let Some(insecure) = self.insecure_skip_tls_verify {
            patch.insert(KEY_INSECURE_SKIP_TLS_VERIFY, insecure);
        }
        context.registry().add_data(&self.alias_or_server, patch)?;
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct SetClusterDataOpt {
    /// Alias or server URL of the cluster
    alias_or_server: String,

    /// Complete attribute map as a JSON object
    #[arg(long, value_name = "json")]
    data: String,
}

impl SetClusterDataOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        let data: BTreeMap<String, Value> = serde_json::from_str(&self.data)
            .map_err(|err| anyhow!("--data must be a JSON object: {err}"))?;
        context
            .registry()
            .set_data(&self.alias_or_server, ClusterData::from(data))?;
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct GetClusterOpt {
    /// Alias or server URL of the cluster
    alias_or_server: String,

    /// Print passwords and tokens
    #[arg(long)]
    show_secrets: bool,
}

impl GetClusterOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        let cluster = context
            .registry()
            .get(&self.alias_or_server)?
            .ok_or_else(|| cpo_config::ConfigError::ClusterNotFound(self.alias_or_server.clone()))?;

        let mut output: BTreeMap<String, Value> = cluster.data().clone().into_inner();
        if !self.show_secrets {
            for key in [KEY_PASSWORD, KEY_TOKEN] {
                if let Some(value) = output.get_mut(key) {
                    *value = Value::from(MASK);
                }
            }
        }
        output.insert(KEY_SERVER.to_owned(), Value::from(cluster.server()));
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct ListClusterOpt {}

impl ListClusterOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        println!("{}", context.registry().list_as_table()?);
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct UseClusterOpt {
    /// Alias or server URL of the cluster
    alias_or_server: String,
}

impl UseClusterOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        context.registry().set_current(&self.alias_or_server)?;
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct CurrentClusterOpt {}

impl CurrentClusterOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        if let Some(cluster) = context.registry().get_current()? {
            println!("{}", cluster.server());
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct RemoveClusterOpt {
    /// Alias or server URL of the cluster
    alias_or_server: String,
}

impl RemoveClusterOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        let cluster = context.registry().remove(&self.alias_or_server)?;
        println!("Removed cluster {}", cluster.server());
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct LoginCommandOpt {
    #[command(flatten)]
    target: ClusterTarget,
}

impl LoginCommandOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        println!("{}", self.target.login_command(context.registry())?);
        Ok(())
    }
}
