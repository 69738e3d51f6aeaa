//! Command-line interface definitions for the `rulesync` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use camino::Utf8PathBuf;
use clap::Parser;

/// Top-level CLI for the `rulesync` binary.
#[derive(Debug, Parser)]
#[command(
    name = "rulesync",
    about = "Reconcile declarative rules configs against a remote account",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Push the desired rules configs to the remote account.
    #[command(
        name = "push",
        about = "Delete stale remote entries and upsert the desired ones"
    )]
    Push(PushCommand),
}

/// Arguments for the `rulesync push` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct PushCommand {
    /// Path to a JSON object mapping config keys to scalar values.
    #[arg(long, value_name = "FILE")]
    pub(crate) file: Utf8PathBuf,
    /// Override the cap on simultaneously in-flight remote calls.
    #[arg(long, value_name = "N")]
    pub(crate) concurrency: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_parses_file_and_concurrency() {
        let Cli::Push(command) = Cli::parse_from([
            "rulesync",
            "push",
            "--file",
            "configs.json",
            "--concurrency",
            "3",
        ]);
        assert_eq!(command.file, Utf8PathBuf::from("configs.json"));
        assert_eq!(command.concurrency, Some(3));
    }

    #[test]
    fn push_requires_a_file_argument() {
        let result = Cli::try_parse_from(["rulesync", "push"]);
        assert!(result.is_err());
    }
}
