use super::{Launcher, LauncherKind};
use crate::config::MultiGpuConfig;
use crate::core::dispatcher::{GpuDispatcher, DEFAULT_DEVICE_ENV, DEFAULT_POLL_INTERVAL};
use crate::core::gpu::{resolve_devices, GpuProbe};
use crate::core::process::Spawner;
use anyhow::Result;
use std::time::Duration;
use tracing::warn;

/// Runs commands in parallel on this machine, one per GPU.
///
/// The GPU list is resolved on every launch, so building the launcher on a
/// machine without GPUs is fine; launching on one is a [`NoSlots`] error.
///
/// [`NoSlots`]: crate::core::error::LaunchError::NoSlots
pub struct MultiGpuLauncher<S: Spawner + Clone> {
    spawner: S,
    probe: Box<dyn GpuProbe>,
    gpus: Option<Vec<u32>>,
    poll_interval: Duration,
    device_env: String,
}

impl<S: Spawner + Clone> MultiGpuLauncher<S> {
    pub fn new(spawner: S, probe: Box<dyn GpuProbe>) -> Self {
        Self {
            spawner,
            probe,
            gpus: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            device_env: DEFAULT_DEVICE_ENV.to_string(),
        }
    }

    pub fn with_config(mut self, config: &MultiGpuConfig) -> Self {
        self.gpus = config.gpus.clone();
        self.poll_interval = Duration::from_millis(config.poll_interval_ms);
        self.device_env = config.device_env.clone();
        self
    }

    pub fn devices(&self) -> Vec<u32> {
        resolve_devices(self.gpus.as_deref(), self.probe.as_ref())
    }
}

impl<S: Spawner + Clone> Launcher for MultiGpuLauncher<S> {
    fn name(&self) -> &str {
        LauncherKind::MultiGpu.name()
    }

    fn description(&self) -> &str {
        LauncherKind::MultiGpu.description()
    }

    fn launch(&self, commands: Vec<String>) -> Result<()> {
        warn!("Using experimental multi_gpu launcher");

        GpuDispatcher::new(self.spawner.clone(), self.devices())?
            .with_poll_interval(self.poll_interval)
            .with_device_env(self.device_env.clone())
            .dispatch(commands)
    }
}
