use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use gamepages_core::MigrationMode;

#[derive(Parser)]
#[command(
    name = "gamepages",
    about = "Generate, restyle and validate the static game page corpus",
    version
)]
pub struct Cli {
    /// Project root (overrides `paths.root` from configuration)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Extra configuration file layered over the user config
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the game feed and persist the metadata snapshot
    Fetch,

    /// Render one page per snapshot record
    Generate {
        /// Refresh the snapshot from the feed first
        #[arg(long)]
        fetch: bool,
    },

    /// Write the built-in page template
    InitTemplate {
        /// Overwrite an existing template
        #[arg(long)]
        force: bool,
    },

    /// Rewrite the stylesheet block of every generated page
    Migrate {
        /// Replace the whole block or only named rules
        #[arg(long, value_enum, default_value_t = ModeArg::Block)]
        mode: ModeArg,

        /// Revision file (defaults to the built-in canonical revision)
        #[arg(long)]
        revision: Option<PathBuf>,

        /// Report changes without writing
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Check tag balance, stylesheet braces and required elements
    Validate,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Whole `<style>` block
    Block,
    /// Named top-level rules only
    Rules,
}

impl From<ModeArg> for MigrationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Block => MigrationMode::WholeBlock,
            ModeArg::Rules => MigrationMode::NamedRules,
        }
    }
}
