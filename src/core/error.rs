use thiserror::Error;

/// Errors a launcher reports before any command is executed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("No GPU slots available: configure `multi_gpu.gpus` or check that NVML sees a device")]
    NoSlots,
    #[error("Unknown launcher '{0}'. Run `glaunch list` to see the registered launchers")]
    UnknownLauncher(String),
    #[error("Command {index} spans several lines; a job list holds one command per line")]
    MultiLineCommand { index: usize },
}
