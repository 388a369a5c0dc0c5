use crate::core::get_config_dir;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

#[derive(Deserialize, Debug, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub launcher: LauncherConfig,
    #[serde(default)]
    pub multi_gpu: MultiGpuConfig,
    #[serde(default)]
    pub slurm: SlurmConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LauncherConfig {
    /// Launcher used when `--launcher` is not given
    #[serde(default = "default_launcher")]
    pub default: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MultiGpuConfig {
    /// Limit which GPUs get a slot (None = every device NVML reports)
    #[serde(default)]
    pub gpus: Option<Vec<u32>>,
    /// How long to sleep when every slot is busy
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Environment variable that pins a command to its GPU
    #[serde(default = "default_device_env")]
    pub device_env: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SlurmConfig {
    #[serde(default = "default_cpus_per_task")]
    pub cpus_per_task: u32,
    /// Memory per array task, e.g. "32G" or "32768M"
    #[serde(default = "default_mem")]
    pub mem: String,
    /// GPUs per array task (0 = no `--gres` line)
    #[serde(default = "default_slurm_gpus")]
    pub gpus: u32,
    /// Wall clock limit, e.g. "5-12:00:00"
    #[serde(default = "default_time")]
    pub time: String,
    #[serde(default)]
    pub partition: Option<String>,
    /// Nodes passed to `--exclude`
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Where the job list and submission script are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_sbatch")]
    pub sbatch: String,
    #[serde(default = "default_sbatch_args")]
    pub sbatch_args: Vec<String>,
}

fn default_launcher() -> String {
    "local".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_device_env() -> String {
    crate::core::dispatcher::DEFAULT_DEVICE_ENV.to_string()
}

fn default_cpus_per_task() -> u32 {
    8
}

fn default_mem() -> String {
    "32G".to_string()
}

fn default_slurm_gpus() -> u32 {
    1
}

fn default_time() -> String {
    "5-12:00:00".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_sbatch() -> String {
    "sbatch".to_string()
}

fn default_sbatch_args() -> Vec<String> {
    vec!["-vv".to_string()]
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            default: default_launcher(),
        }
    }
}

impl Default for MultiGpuConfig {
    fn default() -> Self {
        Self {
            gpus: None,
            poll_interval_ms: default_poll_interval_ms(),
            device_env: default_device_env(),
        }
    }
}

impl Default for SlurmConfig {
    fn default() -> Self {
        Self {
            cpus_per_task: default_cpus_per_task(),
            mem: default_mem(),
            gpus: default_slurm_gpus(),
            time: default_time(),
            partition: None,
            exclude: Vec::new(),
            output_dir: default_output_dir(),
            sbatch: default_sbatch(),
            sbatch_args: default_sbatch_args(),
        }
    }
}

pub fn load_config(config_path: Option<&PathBuf>) -> Result<Config, config::ConfigError> {
    let mut config_vec = vec![];

    // User-provided config file
    if let Some(config_path) = config_path {
        if config_path.exists() {
            config_vec.push(config_path.clone());
        } else {
            warn!("Config file {config_path:?} not found.");
        }
    }

    // Default config file
    if let Ok(default_config_path) = get_config_dir().map(|d| d.join("glaunch.toml")) {
        if default_config_path.exists() {
            config_vec.push(default_config_path);
        }
    }

    let settings = config::Config::builder();
    let settings = config_vec.iter().fold(settings, |s, path| {
        s.add_source(config::File::from(path.as_path()))
    });

    settings
        .add_source(
            config::Environment::with_prefix("GLAUNCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("multi_gpu.gpus")
                .with_list_parse_key("slurm.exclude")
                .with_list_parse_key("slurm.sbatch_args"),
        )
        .build()?
        .try_deserialize()
}
