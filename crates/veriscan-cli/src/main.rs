use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;

use veriscan_core::{
    Change, Config, FsBackend, HttpPackageIndex, InstallOrigin, InstallType, LifecycleManager,
    NoOp, Outcome, PluginRecord, PluginRegistry, SearchScope, VeriscanError,
};

mod args;
use args::{Cli, Commands, PluginAction, Shell};

/// Version reported for plugins shipped with the host itself
const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    let cli = Cli::parse();
    let base_dir = resolve_base_dir(cli.base_dir);

    match cli.command {
        Some(Commands::Plugin { action }) => handle_plugin(action, &base_dir),
        Some(Commands::Completions { shell }) => {
            handle_completions(shell);
            ExitCode::SUCCESS
        }
        None => {
            Cli::command().print_help().ok();
            ExitCode::SUCCESS
        }
    }
}

fn resolve_base_dir(cli_base: Option<PathBuf>) -> PathBuf {
    if let Some(base) = cli_base {
        return base;
    }

    if let Ok(base) = std::env::var("VERISCAN_BASE") {
        return PathBuf::from(base);
    }

    dirs::home_dir()
        .map(|h| h.join(".veriscan"))
        .unwrap_or_else(|| PathBuf::from(".veriscan"))
}

fn build_manager(base_dir: &Path) -> veriscan_core::Result<LifecycleManager> {
    let config = Config::load(base_dir)?;
    let registry = PluginRegistry::with_dir(base_dir.to_path_buf());
    let index = HttpPackageIndex::new(&config.index.url);
    let backend = FsBackend::new(base_dir.join("plugins"), &config.index.url);

    Ok(LifecycleManager::new(
        registry,
        Box::new(index),
        Box::new(backend),
    ))
}

fn handle_plugin(action: PluginAction, base_dir: &Path) -> ExitCode {
    let manager = match build_manager(base_dir) {
        Ok(manager) => manager,
        Err(e) => return fail(&e),
    };

    match action {
        PluginAction::List { all } => handle_list(&manager, all),
        PluginAction::Search {
            pattern,
            all,
            exact,
        } => handle_search(&manager, &pattern, all, exact),
        PluginAction::Install { plugin, version } => {
            report(manager.install(&plugin, version.as_deref()))
        }
        PluginAction::Update { plugin } => report(manager.update(&plugin)),
        PluginAction::Uninstall { plugin } => report(manager.uninstall(&plugin)),
    }
}

// ========== list ==========

fn handle_list(manager: &LifecycleManager, all: bool) -> ExitCode {
    let mut statuses = match manager.statuses() {
        Ok(statuses) => statuses,
        Err(e) => return fail(&e),
    };
    if !all {
        statuses.retain(|s| !matches!(s.install_type, InstallType::Core | InstallType::Bundle));
    }
    statuses.sort_by(|a, b| a.name.cmp(&b.name));

    println!();
    println!(
        "{}",
        format!(
            " {:<30}{:<12}{:<10}{:<6}",
            "Plugin Name", "Version", "Via", "ApiVer"
        )
        .bold()
    );
    println!("{}", "-".repeat(58));
    for status in &statuses {
        println!(
            " {:<30}{:<12}{:<10}{:<6}",
            status.name,
            pretty_version(manager, status),
            status.install_type,
            status.api_generation
        );
    }
    println!("{}", "-".repeat(58));
    println!(" {} plugin(s) total", statuses.len());
    println!();

    ExitCode::SUCCESS
}

/// Version column for the list table. Host-shipped plugins track the
/// host version; path installs are unversioned source; index installs
/// show the newest placed package.
fn pretty_version(manager: &LifecycleManager, status: &PluginRecord) -> String {
    match status.install_type {
        InstallType::Core | InstallType::Bundle => HOST_VERSION.to_string(),
        InstallType::Path => "src".to_string(),
        InstallType::Remote => {
            let mut versions = manager.installed_versions(&status.name).unwrap_or_default();
            versions.sort_by(|a, b| compare_versions(a, b));
            versions
                .pop()
                .or_else(|| status.version.clone())
                .unwrap_or_else(|| "?".to_string())
        }
    }
}

fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

// ========== search ==========

fn handle_search(manager: &LifecycleManager, pattern: &str, all: bool, exact: bool) -> ExitCode {
    let scope = if all {
        SearchScope::All
    } else {
        SearchScope::Latest
    };
    let results = match manager.search(pattern, exact, scope) {
        Ok(results) => results,
        Err(e) => return fail(&e),
    };

    println!();
    println!(
        "{}",
        format!(" {:<30}{:<50}", "Plugin Name", "Versions Available").bold()
    );
    println!("{}", "-".repeat(55));
    for (name, versions) in &results {
        println!(" {:<30}({})", name, versions.join(", "));
    }
    println!("{}", "-".repeat(55));
    println!(" {} plugin(s) found", results.len());
    println!();

    if results.is_empty() {
        // a search miss is not an error, but it is distinguishable
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}

// ========== outcome rendering ==========

fn report(outcome: Outcome) -> ExitCode {
    match &outcome {
        Outcome::Success(change) => print_change(change),
        Outcome::AlreadySatisfied(noop) => print_noop(noop),
        Outcome::Failure(err) => eprintln!("{} {}", "[ERROR]".red().bold(), err),
    }
    ExitCode::from(outcome.exit_code() as u8)
}

fn fail(err: &VeriscanError) -> ExitCode {
    eprintln!("{} {}", "[ERROR]".red().bold(), err);
    ExitCode::from(err.exit_code() as u8)
}

fn print_change(change: &Change) {
    match change {
        Change::Installed {
            name,
            version,
            origin,
        } => match origin {
            InstallOrigin::Archive => println!(
                "{} plugin, version {}, installed from local archive",
                name.bold(),
                version.as_deref().unwrap_or("?")
            ),
            InstallOrigin::SourcePath => {
                println!("{} plugin installed via source path reference", name.bold())
            }
            InstallOrigin::Index => println!(
                "{} plugin, version {}, installed from the package index",
                name.bold(),
                version.as_deref().unwrap_or("?")
            ),
        },
        Change::Updated {
            name,
            old_versions,
            new_version,
        } => println!(
            "{} plugin, version {} -> {}, updated from the package index",
            name.bold(),
            old_versions.join(", "),
            new_version
        ),
        Change::Uninstalled {
            name,
            versions,
            install_type,
        } => {
            if *install_type == InstallType::Path {
                println!(
                    "{} path-based plugin install has been uninstalled",
                    name.bold()
                );
            } else {
                println!(
                    "{} plugin, version {}, has been uninstalled",
                    name.bold(),
                    versions.join(", ")
                );
            }
        }
    }
}

fn print_noop(noop: &NoOp) {
    match noop {
        NoOp::AlreadyAtVersion {
            name,
            version,
            explicit,
        } => {
            let label = if *explicit {
                "Plugin already installed at requested version"
            } else {
                "Plugin already installed at latest version"
            };
            println!(
                "{} - plugin {} {} - refusing to install",
                label.red(),
                name,
                version
            );
        }
        NoOp::UpdateRequired {
            name,
            requested,
            installed,
        } => {
            println!(
                "{} - plugin {}, requested {}, have {}; use `veriscan plugin update` - refusing to install",
                "Update required".red(),
                name,
                requested.as_deref().unwrap_or("latest"),
                installed.join(", ")
            );
        }
        NoOp::AlreadyLatest { name, version } => {
            println!(
                "{} - {} is at {}, which is the latest - refusing to update",
                "Already installed at latest version".red(),
                name,
                version
            );
        }
    }
}

// ========== completions ==========

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let shell = match shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::PowerShell => clap_complete::Shell::PowerShell,
        Shell::Elvish => clap_complete::Shell::Elvish,
    };
    generate(shell, &mut cmd, "veriscan", &mut io::stdout());
}
