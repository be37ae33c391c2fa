use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "modlink", version, about = "Resolve modules and their requirements")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve modules and print their values as JSON lines.
    Use(UseArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct UseArgs {
    /// Module names; comma separated lists are accepted too.
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Directory holding `<name>.toml` manifests.
    #[arg(long, default_value = ".")]
    pub base: PathBuf,

    /// Complete without deferring to the scheduler.
    #[arg(long)]
    pub sync: bool,

    /// Batch manifest fetches (overrides the config file).
    #[arg(long)]
    pub combine: bool,

    /// Print loader statistics to stderr when done.
    #[arg(long)]
    pub stats: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_use_command() {
        let args = Args::try_parse_from([
            "modlink", "use", "app,lib", "extra", "--base", "mods", "--sync", "--stats",
        ])
        .unwrap();
        let Commands::Use(use_args) = args.command;
        assert_eq!(use_args.names, vec!["app,lib", "extra"]);
        assert_eq!(use_args.base, PathBuf::from("mods"));
        assert!(use_args.sync);
        assert!(use_args.stats);
        assert!(!use_args.combine);
    }

    #[test]
    fn names_are_required() {
        assert!(Args::try_parse_from(["modlink", "use"]).is_err());
    }
}
