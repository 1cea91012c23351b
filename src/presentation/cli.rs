// Command line arguments
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about = "Track the remaining data quota of a vendor account", propagate_version = true)]
pub struct Args {
    /// Settings file; the extension may be omitted.
    #[clap(long, env = "QUOTA_CONFIG", default_value = "config/quota")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Log into the portal, read the quota and append it to the store.
    Collect,

    /// Read the stored series and render the static chart.
    Render,

    /// Collect, then render. The default.
    Run,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_run() {
        let args = Args::try_parse_from(["quota-tracker"]).unwrap();
        assert_eq!(args.command(), Command::Run);
    }

    #[test]
    fn test_subcommand_and_config() {
        let args = Args::try_parse_from(["quota-tracker", "--config", "settings.toml", "render"]).unwrap();
        assert_eq!(args.command(), Command::Render);
        assert_eq!(args.config, PathBuf::from("settings.toml"));
    }

    #[test]
    fn test_unknown_subcommand() {
        assert!(Args::try_parse_from(["quota-tracker", "publish"]).is_err());
    }
}
