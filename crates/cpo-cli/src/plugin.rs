use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::dispatch::CommandTree;

#[derive(Debug, Subcommand)]
pub enum PluginCmd {
    /// Print the command tree including plug-in commands
    #[command(name = "list")]
    List(ListPluginsOpt),
}

impl PluginCmd {
    pub fn process(self, tree: &CommandTree) -> Result<()> {
        match self {
            Self::List(opt) => opt.process(tree),
        }
    }
}

#[derive(Debug, Parser)]
pub struct ListPluginsOpt {}

impl ListPluginsOpt {
    fn process(self, tree: &CommandTree) -> Result<()> {
        print!("{}", tree.render()?);
        Ok(())
    }
}
