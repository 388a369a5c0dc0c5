use crate::cli::Commands;
use glaunch::config::{load_config, Config};
use glaunch::launchers::{LauncherProvider, LauncherRegistry};
use std::path::PathBuf;

mod completions;
mod list;
mod run;

pub fn handle_commands(config_path: &Option<PathBuf>, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run(run_args) => {
            let mut config = load_config(config_path.as_ref())?;
            run::apply_overrides(&mut config, &run_args)?;
            let registry = build_registry(&config)?;
            run::handle_run(&config, &registry, run_args)
        }
        Commands::List => {
            let config = load_config(config_path.as_ref())?;
            let registry = build_registry(&config)?;
            list::handle_list(&config, &registry)
        }
        Commands::Completion { shell } => completions::handle_completions(shell),
    }
}

/// Extra launchers compiled into this binary. None ship by default.
fn providers() -> Vec<Box<dyn LauncherProvider>> {
    Vec::new()
}

fn build_registry(config: &Config) -> anyhow::Result<LauncherRegistry> {
    Ok(LauncherRegistry::builtin(config)?.with_providers(&providers()))
}
