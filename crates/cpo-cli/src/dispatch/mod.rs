//!
//! # Command dispatcher
//!
//! The command tree merges the clap-derived built-in commands with the
//! commands of plug-in packages. Groups are materialized on first access.
//! Within a group, subgroups sort before commands and each class sorts by
//! name.
//!
mod exec;
mod package;

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Arg, Command};
use once_cell::sync::OnceCell;
use tracing::trace;

use cpo_types::defaults::CLI_NAME;

use crate::error::{DispatchError, Result};

pub use exec::run_plugin;
pub use package::{PluginPackage, cli_name, default_search_path, discover_plugins, installed_plugins};

use package::{package_entries, read_marker, read_module};

/// Distribution id of the built-in commands
pub const BUILTIN_DISTRIBUTION: &str = CLI_NAME;

#[derive(Debug, Clone)]
enum GroupSource {
    Builtin(Command),
    Package { distribution: String, path: PathBuf },
}

/// Program and arguments a plug-in command runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginExec {
    pub argv: Vec<String>,
    /// directory of the declaring module
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CommandLeaf {
    name: String,
    help: String,
    distribution: String,
    exec: Option<PluginExec>,
}

impl CommandLeaf {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn distribution(&self) -> &str {
        &self.distribution
    }

    /// `None` for built-in commands
    pub fn exec(&self) -> Option<&PluginExec> {
        self.exec.as_ref()
    }
}

#[derive(Debug)]
pub struct CommandGroup {
    name: String,
    help: String,
    distribution: String,
    path: Vec<String>,
    sources: Vec<GroupSource>,
    plugins: Arc<[PluginPackage]>,
    children: OnceCell<BTreeMap<String, CommandNode>>,
}

#[derive(Debug)]
pub enum CommandNode {
    Group(CommandGroup),
    Leaf(CommandLeaf),
}

impl CommandNode {
    pub fn name(&self) -> &str {
        match self {
            Self::Group(group) => &group.name,
            Self::Leaf(leaf) => &leaf.name,
        }
    }

    pub fn distribution(&self) -> &str {
        match self {
            Self::Group(group) => &group.distribution,
            Self::Leaf(leaf) => &leaf.distribution,
        }
    }

    pub fn help(&self) -> &str {
        match self {
            Self::Group(group) => &group.help,
            Self::Leaf(leaf) => &leaf.help,
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Help text with the contributing distribution of plug-in commands
    pub fn help_with_provenance(&self) -> String {
        let distribution = self.distribution();
        if distribution == BUILTIN_DISTRIBUTION {
            self.help().to_owned()
        } else if self.help().is_empty() {
            format!("(plug-in: {distribution})")
        } else {
            format!("{} (plug-in: {distribution})", self.help())
        }
    }
}

impl CommandGroup {
    fn new(
        name: String,
        help: String,
        distribution: String,
        path: Vec<String>,
        plugins: Arc<[PluginPackage]>,
    ) -> Self {
        Self {
            name,
            help,
            distribution,
            path,
            sources: Vec::new(),
            plugins,
            children: OnceCell::new(),
        }
    }

    fn with_source(mut self, source: GroupSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn is_materialized(&self) -> bool {
        self.children.get().is_some()
    }

    pub fn children(&self) -> Result<&BTreeMap<String, CommandNode>> {
        self.children.get_or_try_init(|| self.materialize())
    }

    pub fn child(&self, name: &str) -> Result<Option<&CommandNode>> {
        Ok(self.children()?.get(name))
    }

    /// Subgroups first, then commands, each by name
    pub fn ordered_children(&self) -> Result<Vec<&CommandNode>> {
        let mut children: Vec<_> = self.children()?.values().collect();
        children.sort_by_key(|node| node.is_leaf());
        Ok(children)
    }

    fn child_path(&self, name: &str) -> Vec<String> {
        let mut path = self.path.clone();
        path.push(name.to_owned());
        path
    }

    fn materialize(&self) -> Result<BTreeMap<String, CommandNode>> {
        trace!(path = ?self.path, "materializing command group");
        let mut children = BTreeMap::new();
        for source in &self.sources {
            match source {
                GroupSource::Builtin(command) => self.add_builtin(&mut children, command)?,
                GroupSource::Package { distribution, path } => {
                    self.add_package(&mut children, distribution, path)?
                }
            }
        }

        for plugin in self.plugins.iter() {
            if plugin.hierarchy_path == self.path {
                self.add_package(&mut children, &plugin.distribution, &plugin.path)?;
            } else if plugin.hierarchy_path.starts_with(&self.path) {
                // attaches further down; make sure the way there exists
                let name = &plugin.hierarchy_path[self.path.len()];
                let group = CommandGroup::new(
                    name.clone(),
                    String::new(),
                    plugin.distribution.clone(),
                    self.child_path(name),
                    self.plugins.clone(),
                );
                self.insert(&mut children, CommandNode::Group(group))?;
            }
        }
        Ok(children)
    }

    fn add_builtin(
        &self,
        children: &mut BTreeMap<String, CommandNode>,
        command: &Command,
    ) -> Result<()> {
        for sub in command.get_subcommands() {
            let name = sub.get_name().to_owned();
            if name == "help" {
                continue;
            }
            let help = sub.get_about().map(ToString::to_string).unwrap_or_default();
            let node = if sub.has_subcommands() {
                CommandNode::Group(
                    CommandGroup::new(
                        name.clone(),
                        help,
                        BUILTIN_DISTRIBUTION.to_owned(),
                        self.child_path(&name),
                        self.plugins.clone(),
                    )
                    .with_source(GroupSource::Builtin(sub.clone())),
                )
            } else {
                CommandNode::Leaf(CommandLeaf {
                    name,
                    help,
                    distribution: BUILTIN_DISTRIBUTION.to_owned(),
                    exec: None,
                })
            };
            self.insert(children, node)?;
        }
        Ok(())
    }

    fn add_package(
        &self,
        children: &mut BTreeMap<String, CommandNode>,
        distribution: &str,
        dir: &std::path::Path,
    ) -> Result<()> {
        let (subpackages, modules) = package_entries(dir)?;
        for subpackage in subpackages {
            let marker = read_marker(distribution, &subpackage)?;
            let name = subpackage
                .file_name()
                .map(|name| cli_name(&name.to_string_lossy()))
                .unwrap_or_default();
            let group = CommandGroup::new(
                name.clone(),
                marker.doc,
                distribution.to_owned(),
                self.child_path(&name),
                self.plugins.clone(),
            )
            .with_source(GroupSource::Package {
                distribution: distribution.to_owned(),
                path: subpackage,
            });
            self.insert(children, CommandNode::Group(group))?;
        }
        for module_path in modules {
            let module = read_module(distribution, &module_path)?;
            for (attr_name, spec) in module.commands {
                let leaf = CommandLeaf {
                    name: cli_name(&attr_name),
                    help: spec.help,
                    distribution: distribution.to_owned(),
                    exec: Some(PluginExec {
                        argv: spec.exec,
                        dir: dir.to_owned(),
                    }),
                };
                self.insert(children, CommandNode::Leaf(leaf))?;
            }
        }
        Ok(())
    }

    fn insert(&self, children: &mut BTreeMap<String, CommandNode>, node: CommandNode) -> Result<()> {
        let command = self.child_path(node.name()).join(" ");
        match children.entry(node.name().to_owned()) {
            Entry::Vacant(entry) => {
                entry.insert(node);
                Ok(())
            }
            Entry::Occupied(mut entry) => match (entry.get_mut(), node) {
                (CommandNode::Group(existing), CommandNode::Group(other)) => {
                    if existing.help.is_empty() {
                        existing.help = other.help;
                    }
                    existing.sources.extend(other.sources);
                    Ok(())
                }
                (CommandNode::Leaf(existing), CommandNode::Leaf(other)) => {
                    Err(DispatchError::DuplicateCommand {
                        command,
                        first: existing.distribution.clone(),
                        second: other.distribution,
                    })
                }
                (CommandNode::Leaf(leaf), CommandNode::Group(group)) => {
                    Err(DispatchError::CommandTypeConflict {
                        command,
                        leaf: leaf.distribution.clone(),
                        group: group.distribution,
                    })
                }
                (CommandNode::Group(group), CommandNode::Leaf(leaf)) => {
                    Err(DispatchError::CommandTypeConflict {
                        command,
                        leaf: leaf.distribution,
                        group: group.distribution.clone(),
                    })
                }
            },
        }
    }
}

/// Where a command line leads
#[derive(Debug)]
pub enum Resolution<'a> {
    /// handled by the clap-derived commands
    Builtin,
    Plugin {
        leaf: &'a CommandLeaf,
        args: Vec<String>,
    },
}

#[derive(Debug)]
pub struct CommandTree {
    root: CommandGroup,
}

impl CommandTree {
    pub fn new(builtin: Command, plugins: &[PluginPackage]) -> Self {
        let root = CommandGroup::new(
            builtin.get_name().to_owned(),
            builtin.get_about().map(ToString::to_string).unwrap_or_default(),
            BUILTIN_DISTRIBUTION.to_owned(),
            Vec::new(),
            plugins.into(),
        )
        .with_source(GroupSource::Builtin(builtin));
        Self { root }
    }

    pub fn root(&self) -> &CommandGroup {
        &self.root
    }

    /// Follow `args` (without the program name) down the tree. Only the
    /// groups on the way are materialized.
    pub fn resolve(&self, args: &[String]) -> Result<Resolution<'_>> {
        let mut group = &self.root;
        let mut words = args.iter().enumerate();
        while let Some((index, word)) = words.next() {
            if word == "--log-level" {
                words.next();
                continue;
            }
            if word.starts_with("--log-level=") {
                continue;
            }
            if word.starts_with('-') {
                return Ok(Resolution::Builtin);
            }
            match group.child(word)? {
                Some(CommandNode::Group(child)) => group = child,
                Some(CommandNode::Leaf(leaf)) if leaf.exec.is_some() => {
                    return Ok(Resolution::Plugin {
                        leaf,
                        args: args[index + 1..].to_vec(),
                    });
                }
                _ => return Ok(Resolution::Builtin),
            }
        }
        Ok(Resolution::Builtin)
    }

    /// `builtin` extended with the plug-in commands, for help and usage
    /// output. Materializes the whole tree.
    pub fn augment(&self, builtin: Command) -> Result<Command> {
        augment_group(&self.root, builtin)
    }

    /// Indented listing of the whole tree
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        render_group(&self.root, 0, &mut out)?;
        Ok(out)
    }
}

fn plugin_leaf_command(leaf: &CommandLeaf) -> Command {
    Command::new(leaf.name.clone())
        .about(CommandNode::Leaf(leaf.clone()).help_with_provenance())
        .arg(
            Arg::new("args")
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true),
        )
}

fn augment_group(group: &CommandGroup, mut command: Command) -> Result<Command> {
    for child in group.ordered_children()? {
        let name = child.name();
        match child {
            CommandNode::Leaf(leaf) if leaf.exec.is_some() => {
                command = command.subcommand(plugin_leaf_command(leaf));
            }
            CommandNode::Leaf(_) => {}
            CommandNode::Group(child_group) => match command.find_subcommand(name).cloned() {
                Some(existing) => {
                    let augmented = augment_group(child_group, existing)?;
                    command = command.mut_subcommand(name, |_| augmented);
                }
                None => {
                    let new_group = Command::new(name.to_owned())
                        .about(child.help_with_provenance())
                        .subcommand_required(true)
                        .arg_required_else_help(true);
                    command = command.subcommand(augment_group(child_group, new_group)?);
                }
            },
        }
    }
    Ok(command)
}

fn render_group(group: &CommandGroup, depth: usize, out: &mut String) -> Result<()> {
    for child in group.ordered_children()? {
        let indent = "  ".repeat(depth);
        let help = child.help_with_provenance();
        if help.is_empty() {
            writeln!(out, "{indent}{}", child.name())?;
        } else {
            writeln!(out, "{indent}{:<24} {help}", child.name())?;
        }
        if let CommandNode::Group(child_group) = child {
            render_group(child_group, depth + 1, out)?;
        }
    }
    Ok(())
}
