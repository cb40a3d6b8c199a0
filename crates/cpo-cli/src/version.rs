use anyhow::Result;
use clap::Parser;

use cpo_installer::PLATFORM_VERSION;

use crate::VERSION;

#[derive(Debug, Parser)]
pub struct VersionOpt {}

impl VersionOpt {
    pub fn process(self) -> Result<()> {
        self.print("Cloud Pak Operations CLI", VERSION);
        self.print("Cloud Pak for Data", PLATFORM_VERSION);
        self.print("OS", std::env::consts::OS);
        self.print("Arch", std::env::consts::ARCH);
        Ok(())
    }

    fn print(&self, name: &str, version: &str) {
        println!("{name:24} : {version}");
    }
}
