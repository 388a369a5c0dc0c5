use crate::cli::RunArgs;
use anyhow::{Context, Result};
use glaunch::config::Config;
use glaunch::launchers::LauncherRegistry;
use glaunch::utils::{parse_gpu_indices, read_commands};
use std::fs::File;
use std::io::{self, BufReader};

/// CLI flags override config file values
pub(crate) fn apply_overrides(config: &mut Config, args: &RunArgs) -> Result<()> {
    if let Some(ref gpu_spec) = args.gpus {
        config.multi_gpu.gpus = Some(parse_gpu_indices(gpu_spec)?);
    }
    if let Some(poll_interval) = args.poll_interval {
        config.multi_gpu.poll_interval_ms = poll_interval;
    }
    Ok(())
}

pub(crate) fn handle_run(config: &Config, registry: &LauncherRegistry, args: RunArgs) -> Result<()> {
    let commands = collect_commands(&args)?;
    let launcher = args
        .launcher
        .as_deref()
        .unwrap_or(config.launcher.default.as_str());

    tracing::info!("Launching {} command(s) with '{launcher}'", commands.len());
    registry.launch(launcher, commands)
}

/// Positional commands first, then the lines of `--file`.
fn collect_commands(args: &RunArgs) -> Result<Vec<String>> {
    let mut commands = args.commands.clone();

    match args.file.as_deref() {
        Some(path) if path.as_os_str() == "-" => {
            commands.extend(read_commands(io::stdin().lock())?);
        }
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open command file {}", path.display()))?;
            commands.extend(read_commands(BufReader::new(file))?);
        }
        None => {}
    }

    Ok(commands)
}
