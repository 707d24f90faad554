//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// eventlens - Google Calendar event details for the calendar page
#[derive(Debug, Parser)]
#[command(name = "eventlens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "EVENTLENS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Browser-supplied arguments (extension origin, parent window)
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub browser_args: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run as the browser's native-messaging host (default)
    Serve,

    /// Authorize with Google and fetch the calendar list
    Install,

    /// Fetch the calendar list and store it
    RefreshCalendars,

    /// Check the stored access token with Google, refreshing it if rejected
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["eventlens"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn browser_launch_arguments_are_accepted() {
        let cli =
            Cli::try_parse_from(["eventlens", "chrome-extension://abcdefghijklmnop/"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.browser_args, vec!["chrome-extension://abcdefghijklmnop/"]);
    }

    #[test]
    fn parse_subcommands() {
        let cli = Cli::try_parse_from(["eventlens", "--debug", "install"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(cli.command, Some(Command::Install)));

        let cli = Cli::try_parse_from(["eventlens", "refresh-calendars"]).unwrap();
        assert!(matches!(cli.command, Some(Command::RefreshCalendars)));

        let cli =
            Cli::try_parse_from(["eventlens", "--config", "/tmp/c.toml", "validate"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Some(Command::Validate)));
    }
}
