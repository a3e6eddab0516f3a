//! CLI argument parsing for todobot

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "todobot")]
#[command(author, version, about = "Conversational to-do bot with scheduled backups", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bot (default)
    Run,

    /// Take one backup now and exit
    Backup,

    /// Prune old backups and exit
    Cleanup {
        /// How many recent backups to retain
        #[arg(short, long)]
        keep: Option<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::parse_from(["todobot"]);
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cleanup_keep_override() {
        let cli = Cli::parse_from(["todobot", "cleanup", "--keep", "3"]);
        match cli.command {
            Some(Command::Cleanup { keep }) => assert_eq!(keep, Some(3)),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
