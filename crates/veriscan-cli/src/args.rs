use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "veriscan")]
#[command(about = "Plugin manager for the veriscan host")]
#[command(version)]
pub struct Cli {
    /// Base directory (default: ~/.veriscan)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage veriscan plugins
    Plugin {
        #[command(subcommand)]
        action: PluginAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum PluginAction {
    /// List installed plugins
    List {
        /// Include plugins shipped with the host as well
        #[arg(short, long)]
        all: bool,
    },

    /// Search the package index. Exits 0 on a search hit, 2 on a miss
    Search {
        /// Search pattern (treated as a name prefix unless --exact)
        pattern: String,

        /// List every available version, not just the latest
        #[arg(short, long)]
        all: bool,

        /// Assume the pattern is exact; do not match on prefix
        #[arg(short, long)]
        exact: bool,
    },

    /// Install a plugin from the index, a .vpkg archive, or a source path
    Install {
        /// Plugin name, path to a .vpkg file, or path to local source
        plugin: String,

        /// When installing from the index, a specific version to install
        #[arg(short = 'v', long)]
        version: Option<String>,
    },

    /// Update a plugin to the latest version from the index
    Update {
        /// Plugin name
        plugin: String,
    },

    /// Uninstall a plugin
    Uninstall {
        /// Plugin name
        plugin: String,
    },
}
