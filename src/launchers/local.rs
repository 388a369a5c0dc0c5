use super::{Launcher, LauncherKind};
use crate::core::process::{ProcessHandle, Spawner};
use anyhow::Result;
use tracing::{debug, info};

/// Runs commands one at a time on this machine.
///
/// A command that exits non-zero does not stop the ones after it.
pub struct SerialLauncher<S: Spawner> {
    spawner: S,
}

impl<S: Spawner> SerialLauncher<S> {
    pub fn new(spawner: S) -> Self {
        Self { spawner }
    }
}

impl<S: Spawner> Launcher for SerialLauncher<S> {
    fn name(&self) -> &str {
        LauncherKind::Local.name()
    }

    fn description(&self) -> &str {
        LauncherKind::Local.description()
    }

    fn launch(&self, commands: Vec<String>) -> Result<()> {
        let total = commands.len();
        for (index, command) in commands.iter().enumerate() {
            info!("[{}/{total}] Running: {command}", index + 1);
            let status = self.spawner.spawn(command, &[])?.wait()?;
            debug!("Command exited with {status}");
        }
        Ok(())
    }
}
