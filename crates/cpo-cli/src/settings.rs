//! Persistent settings
use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::Value;

use cpo_types::defaults::{SETTING_LOG_LEVEL, SETTING_WATCH_TIMEOUT_SECONDS};

use crate::LOG_LEVELS;
use crate::context::CliContext;

const SETTINGS: [&str; 2] = [SETTING_LOG_LEVEL, SETTING_WATCH_TIMEOUT_SECONDS];

#[derive(Debug, Subcommand)]
pub enum SettingsCmd {
    /// Print one or all settings
    #[command(name = "get")]
    Get(GetSettingOpt),
    /// Store a setting
    #[command(name = "set")]
    Set(SetSettingOpt),
    /// Remove a setting
    #[command(name = "unset")]
    Unset(UnsetSettingOpt),
}

impl SettingsCmd {
    pub fn process(self, context: &CliContext) -> Result<()> {
        match self {
            Self::Get(opt) => opt.process(context),
            Self::Set(opt) => opt.process(context),
            Self::Unset(opt) => opt.process(context),
        }
    }
}

#[derive(Debug, Parser)]
pub struct GetSettingOpt {
    /// Setting name; all settings when omitted
    #[arg(value_parser = SETTINGS)]
    name: Option<String>,
}

impl GetSettingOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        match self.name {
            Some(name) => {
                if let Some(value) = context.store().get_setting::<Value>(&name)? {
                    match value {
                        Value::String(value) => println!("{value}"),
                        other => println!("{other}"),
                    }
                }
            }
            None => {
                let settings = context.store().settings()?;
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct SetSettingOpt {
    /// Setting name
    #[arg(value_parser = SETTINGS)]
    name: String,

    /// Setting value
    value: String,
}

impl SetSettingOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        let value = setting_value(&self.name, &self.value)?;
        context.store().set_setting(&self.name, value)?;
        Ok(())
    }
}

/// Typed value of a known setting
fn setting_value(name: &str, raw: &str) -> Result<Value> {
    match name {
        SETTING_LOG_LEVEL if LOG_LEVELS.contains(&raw) => Ok(Value::from(raw)),
        SETTING_LOG_LEVEL => Err(anyhow!(
            "{name} must be one of {}",
            LOG_LEVELS.join(", ")
        )),
        SETTING_WATCH_TIMEOUT_SECONDS => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|err| anyhow!("{name} must be a number of seconds: {err}")),
        _ => Ok(Value::from(raw)),
    }
}

#[derive(Debug, Parser)]
pub struct UnsetSettingOpt {
    /// Setting name
    #[arg(value_parser = SETTINGS)]
    name: String,
}

impl UnsetSettingOpt {
    fn process(self, context: &CliContext) -> Result<()> {
        context.store().unset_setting(&self.name)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_setting_values_are_typed() {
        assert_eq!(
            setting_value(SETTING_WATCH_TIMEOUT_SECONDS, "600").expect("number"),
            Value::from(600)
        );
        assert!(setting_value(SETTING_WATCH_TIMEOUT_SECONDS, "ten").is_err());
        assert_eq!(
            setting_value(SETTING_LOG_LEVEL, "debug").expect("level"),
            Value::from("debug")
        );
        assert!(setting_value(SETTING_LOG_LEVEL, "loud").is_err());
    }
}
