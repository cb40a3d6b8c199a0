//! Credentials stored for the current user
use std::collections::BTreeMap;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use cpo_types::defaults::{KEY_IBM_CLOUD_API_KEY, KEY_IBM_CP_ENTITLEMENT_KEY};

use crate::context::CliContext;

#[derive(Debug, Subcommand)]
pub enum UserCmd {
    /// Store credentials used as option defaults
    #[command(name = "set-credentials")]
    SetCredentials(SetCredentialsOpt),
    /// Remove stored credentials
    #[command(name = "unset-credentials")]
    UnsetCredentials(UnsetCredentialsOpt),
    /// Print stored credentials
    #[command(name = "get-credentials")]
    GetCredentials(GetCredentialsOpt),
    /// Print the path of the credentials file
    #[command(name = "credentials-path")]
    CredentialsPath(CredentialsPathOpt),
}

impl UserCmd {
    pub fn process(self, context: &CliContext) -> Result<()> {
        match self {
            Self::SetCredentials(opt) => opt.process(context),
            Self::UnsetCredentials(opt) => opt.process(context),
            Self::GetCredentials(opt) => opt.process(context),
            Self::CredentialsPath(opt) => opt.process(context),
        }
    }
}

#[derive(Debug, Args)]
pub struct SetCredentialsOpt {
    /// IBM Cloud Pak entitlement key
    #[arg(long)]
    ibm_cp_entitlement_key: Option<String>,

    /// IBM Cloud API key
    #[arg(long)]
    ibm_cloud_api_key: Option<String>,
}

impl SetCredentialsOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        let credentials: BTreeMap<String, String> = [
            (KEY_IBM_CP_ENTITLEMENT_KEY, self.ibm_cp_entitlement_key),
            (KEY_IBM_CLOUD_API_KEY, self.ibm_cloud_api_key),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key.to_owned(), value)))
        .collect();
        if !credentials.is_empty() {
            context.registry().merge_credentials(credentials)?;
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct UnsetCredentialsOpt {
    /// Remove the IBM Cloud Pak entitlement key
    #[arg(long)]
    ibm_cp_entitlement_key: bool,

    /// Remove the IBM Cloud API key
    #[arg(long)]
    ibm_cloud_api_key: bool,
}

impl UnsetCredentialsOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        let credentials: BTreeMap<String, String> = [
            (KEY_IBM_CP_ENTITLEMENT_KEY, self.ibm_cp_entitlement_key),
            (KEY_IBM_CLOUD_API_KEY, self.ibm_cloud_api_key),
        ]
        .into_iter()
        .filter(|(_, unset)| *unset)
        .map(|(key, _)| (key.to_owned(), String::new()))
        .collect();
        if !credentials.is_empty() {
            context.registry().merge_credentials(credentials)?;
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct GetCredentialsOpt {}

impl GetCredentialsOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        let credentials = context.store().credentials()?;
        println!("{}", serde_json::to_string_pretty(&credentials)?);
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct CredentialsPathOpt {}

impl CredentialsPathOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        println!("{}", context.store().credentials_path().display());
        Ok(())
    }
}
