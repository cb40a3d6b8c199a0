use std::borrow::Cow;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::Result;

pub trait ProgressRenderedText {
    /// Rendered text of the last finished step
    fn text(&self) -> String;
    /// Rendered text of the step now running
    fn next_step_text(&self) -> Option<String> {
        None
    }
}

#[derive(Debug)]
pub enum InstallProgressMessage {
    CreatingProject(String),
    ProjectExists(String),
    PullSecretUpdated(String),
    CreatingCatalogSource(String),
    CreatingSubscription(String),
    SubscriptionExists(String),
    WaitingForDefinitions(Vec<String>),
    CreatingCustomResource(String),
    CustomResourceExists(String),
    WaitingForCompletion(String),
    Deleting(String),
    Success(String),
}

impl ProgressRenderedText for InstallProgressMessage {
    fn text(&self) -> String {
        use colored::*;

        match self {
            Self::CreatingProject(name) => format!("📁 {} {name}", "Created project".bold()),
            Self::ProjectExists(name) => format!("📁 Project {name} already exists"),
            Self::PullSecretUpdated(registry) => {
                format!("🔑 {} {registry}", "Updated global pull secret for".bold())
            }
            Self::CreatingCatalogSource(name) => {
                format!("📦 {} {name}", "Created catalog source".bold())
            }
            Self::CreatingSubscription(name) => {
                format!("📦 {} {name}", "Subscribed to".bold())
            }
            Self::SubscriptionExists(name) => format!("📦 Subscription {name} already exists"),
            Self::WaitingForDefinitions(kinds) => {
                format!("✅ {} {}", "Definitions available:".bold(), kinds.join(", "))
            }
            Self::CreatingCustomResource(name) => {
                format!("🖥️  {} {name}", "Created custom resource".bold())
            }
            Self::CustomResourceExists(name) => {
                format!("🖥️  Custom resource {name} already exists")
            }
            Self::WaitingForCompletion(name) => format!("✅ {} {name}", "Completed".bold()),
            Self::Deleting(name) => format!("🗑️  {} {name}", "Deleted".bold()),
            Self::Success(what) => format!("🎯 {}", format!("Successfully installed {what}!").bold()),
        }
    }

    fn next_step_text(&self) -> Option<String> {
        match self {
            Self::WaitingForDefinitions(kinds) => {
                Some(format!("⏳ Waiting for {}", kinds.join(", ")))
            }
            Self::WaitingForCompletion(name) => Some(format!("⏳ Waiting for {name} to complete")),
            _ => None,
        }
    }
}

/// Spinner or nothing
#[derive(Debug, Default)]
pub enum ProgressRenderer {
    #[default]
    Plain,
    Spinner(ProgressBar),
    Hidden,
}

impl From<ProgressBar> for ProgressRenderer {
    fn from(bar: ProgressBar) -> Self {
        Self::Spinner(bar)
    }
}

impl ProgressRenderer {
    pub fn println(&self, msg: impl Into<Cow<'static, str>>) {
        let msg = msg.into();
        match self {
            Self::Plain => println!("{msg}"),
            Self::Spinner(bar) => bar.println(msg),
            Self::Hidden => {}
        }
    }

    pub fn set_message(&self, msg: impl Into<Cow<'static, str>>) {
        if let Self::Spinner(bar) = self {
            bar.set_message(msg);
        }
    }

    /// Show the step about to run on the spinner
    pub fn start(&self, message: &impl ProgressRenderedText) {
        if let Some(next) = message.next_step_text() {
            self.set_message(next);
        }
    }

    /// Print a finished step
    pub fn render(&self, message: &impl ProgressRenderedText) {
        self.set_message("");
        self.println(message.text());
    }

    pub fn finish_and_clear(&self) {
        if let Self::Spinner(bar) = self {
            bar.finish_and_clear();
        }
    }
}

fn create_spinning_indicator() -> Result<ProgressBar> {
    let pb = ProgressBar::new(1);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} {spinner}")?
            .tick_chars("/-\\|"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

#[derive(Debug)]
pub struct ProgressBarFactory {
    hide: bool,
    plain: ProgressRenderer,
}

impl ProgressBarFactory {
    pub fn new(hide: bool) -> Self {
        Self {
            hide,
            plain: Default::default(),
        }
    }

    pub fn hidden() -> Self {
        Self {
            hide: true,
            plain: ProgressRenderer::Hidden,
        }
    }

    /// create new progress bar
    pub fn create(&self) -> Result<ProgressRenderer> {
        if self.hide {
            Ok(ProgressRenderer::Hidden)
        } else if std::env::var("CI").is_ok() {
            Ok(ProgressRenderer::Plain)
        } else {
            Ok(create_spinning_indicator()?.into())
        }
    }

    /// simple print
    pub fn println(&self, msg: impl Into<Cow<'static, str>>) {
        self.plain.println(msg);
    }
}
