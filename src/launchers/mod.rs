//! Launchers turn a list of shell commands into running (or printed, or
//! submitted) jobs.
//!
//! The set of launchers is an explicit [`LauncherRegistry`] value: the
//! built-ins come from [`LauncherKind`], and anything else is contributed by a
//! [`LauncherProvider`] that the host hands to the registry at startup.

pub mod dummy;
pub mod local;
pub mod multi_gpu;
pub mod slurm;

use crate::config::Config;
use crate::core::error::LaunchError;
use crate::core::gpu::NvmlProbe;
use crate::core::process::ShellSpawner;
use anyhow::Result;
use std::collections::BTreeMap;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, warn};

pub use dummy::DummyLauncher;
pub use local::SerialLauncher;
pub use multi_gpu::MultiGpuLauncher;
pub use slurm::SlurmLauncher;

pub trait Launcher {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Run, print or submit `commands`. Returns once the launcher is done with
    /// all of them; what "done" means is up to the launcher.
    fn launch(&self, commands: Vec<String>) -> Result<()>;
}

/// Contributes extra launchers to a registry.
#[cfg_attr(test, mockall::automock)]
pub trait LauncherProvider {
    fn launchers(&self) -> Vec<Box<dyn Launcher>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum LauncherKind {
    #[strum(to_string = "local")]
    Local,
    #[strum(to_string = "dummy")]
    Dummy,
    #[strum(to_string = "multi_gpu")]
    MultiGpu,
    #[strum(to_string = "slurm", serialize = "hpc")]
    Slurm,
}

impl LauncherKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Dummy => "dummy",
            Self::MultiGpu => "multi_gpu",
            Self::Slurm => "slurm",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Local => "Run commands one after another on this machine",
            Self::Dummy => "Print commands without running them",
            Self::MultiGpu => "Run one command per local GPU, backfilling freed GPUs",
            Self::Slurm => "Submit commands as a SLURM array job via sbatch",
        }
    }

    pub fn build(self, config: &Config) -> Result<Box<dyn Launcher>> {
        let launcher: Box<dyn Launcher> = match self {
            Self::Local => Box::new(SerialLauncher::new(ShellSpawner::new())),
            Self::Dummy => Box::new(DummyLauncher::stdout()),
            Self::MultiGpu => Box::new(
                MultiGpuLauncher::new(ShellSpawner::new(), Box::new(NvmlProbe))
                    .with_config(&config.multi_gpu),
            ),
            Self::Slurm => Box::new(SlurmLauncher::new(ShellSpawner::new(), &config.slurm)?),
        };
        Ok(launcher)
    }
}

#[derive(Default)]
pub struct LauncherRegistry {
    launchers: BTreeMap<String, Box<dyn Launcher>>,
}

impl LauncherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every [`LauncherKind`].
    pub fn builtin(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for kind in LauncherKind::iter() {
            registry.register(kind.build(config)?);
        }
        Ok(registry)
    }

    /// Add `launcher`, replacing any launcher registered under the same name.
    pub fn register(&mut self, launcher: Box<dyn Launcher>) {
        let name = launcher.name().to_string();
        if self.launchers.insert(name.clone(), launcher).is_some() {
            warn!("Launcher '{name}' was registered twice, keeping the latest");
        } else {
            debug!("Registered launcher '{name}'");
        }
    }

    pub fn with_providers(mut self, providers: &[Box<dyn LauncherProvider>]) -> Self {
        for provider in providers {
            for launcher in provider.launchers() {
                self.register(launcher);
            }
        }
        self
    }

    /// Look up a launcher by name, accepting the aliases of the built-ins.
    pub fn resolve(&self, name: &str) -> Result<&dyn Launcher, LaunchError> {
        if let Some(launcher) = self.launchers.get(name) {
            return Ok(launcher.as_ref());
        }

        LauncherKind::from_str(name)
            .ok()
            .and_then(|kind| self.launchers.get(kind.name()))
            .map(|launcher| launcher.as_ref())
            .ok_or_else(|| LaunchError::UnknownLauncher(name.to_string()))
    }

    pub fn launch(&self, name: &str, commands: Vec<String>) -> Result<()> {
        let launcher = self.resolve(name)?;
        debug!("Launching {} command(s) with '{}'", commands.len(), launcher.name());
        launcher.launch(commands)
    }

    pub fn launchers(&self) -> impl Iterator<Item = &dyn Launcher> {
        self.launchers.values().map(|launcher| launcher.as_ref())
    }

    pub fn len(&self) -> usize {
        self.launchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.launchers.is_empty()
    }
}
