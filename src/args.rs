//! CLI argument parsing using clap

use clap::{Parser, Subcommand};

use crate::lifecycle::LifecycleCommand;

/// Service lifecycle control
///
/// Install, start, stop and query this application as a native OS
/// service, or run it in the foreground.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Lifecycle command to execute
    #[command(subcommand)]
    pub command: CliCommand,

    /// Verbose output (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output to file
    #[arg(long, global = true)]
    pub log: Option<String>,
}

/// Available lifecycle subcommands, 1:1 with [`LifecycleCommand`]
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    /// Installs service
    InstallService,

    /// Uninstalls service
    UninstallService,

    /// Execute in-place (no service)
    Run,

    /// Start service
    Start,

    /// Stop service
    Stop,

    /// Get service status
    Status,
}

impl CliCommand {
    /// The abstract lifecycle command this subcommand selects
    pub fn lifecycle(self) -> LifecycleCommand {
        match self {
            CliCommand::InstallService => LifecycleCommand::Install,
            CliCommand::UninstallService => LifecycleCommand::Uninstall,
            CliCommand::Run => LifecycleCommand::RunInPlace,
            CliCommand::Start => LifecycleCommand::Start,
            CliCommand::Stop => LifecycleCommand::Stop,
            CliCommand::Status => LifecycleCommand::Status,
        }
    }
}

impl Cli {
    /// Get the log level based on verbose/quiet flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else {
            match self.verbose {
                0 => tracing::Level::INFO,
                1 => tracing::Level::DEBUG,
                _ => tracing::Level::TRACE,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcommands_map_onto_lifecycle_commands() {
        let cases = [
            ("install-service", LifecycleCommand::Install),
            ("uninstall-service", LifecycleCommand::Uninstall),
            ("run", LifecycleCommand::RunInPlace),
            ("start", LifecycleCommand::Start),
            ("stop", LifecycleCommand::Stop),
            ("status", LifecycleCommand::Status),
        ];
        for (token, expected) in cases {
            let cli = Cli::try_parse_from(["demo", token]).unwrap();
            assert_eq!(cli.command.lifecycle(), expected, "token {token}");
        }
    }

    #[test]
    fn unknown_subcommand_is_a_parse_error() {
        assert!(Cli::try_parse_from(["demo", "restart"]).is_err());
    }

    #[test]
    fn missing_subcommand_is_a_parse_error() {
        assert!(Cli::try_parse_from(["demo"]).is_err());
    }

    #[test]
    fn version_flag_is_handled_by_the_parser() {
        let err = Cli::try_parse_from(["demo", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn verbosity_flags_select_log_level() {
        let cli = Cli::try_parse_from(["demo", "status"]).unwrap();
        assert_eq!(cli.log_level(), tracing::Level::INFO);

        let cli = Cli::try_parse_from(["demo", "-v", "status"]).unwrap();
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);

        let cli = Cli::try_parse_from(["demo", "-q", "status"]).unwrap();
        assert_eq!(cli.log_level(), tracing::Level::ERROR);
    }
}
