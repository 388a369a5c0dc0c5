use clap::Parser;
use clap_complete::Shell;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "glaunch", author, version = glaunch::core::version(), about = "Dispatch sweep commands to a launcher")]
#[command(styles = glaunch::utils::STYLES)]
pub struct GLaunch {
    #[command(subcommand)]
    pub command: Commands,

    /// The configuration file to use
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

#[derive(Debug, Parser)]
pub enum Commands {
    /// Launch commands with one of the registered launchers
    Run(RunArgs),
    /// List the registered launchers
    List,
    /// Generate shell completion scripts
    Completion {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Launcher to use (defaults to `launcher.default` from the config)
    #[arg(short, long, value_name = "NAME")]
    pub launcher: Option<String>,

    /// Read commands from a file, one per line ("-" for stdin)
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Limit which GPUs multi_gpu may use (e.g., "0,2" or "0-2")
    #[arg(long, value_name = "INDICES")]
    pub gpus: Option<String>,

    /// Milliseconds multi_gpu sleeps while every GPU is busy
    #[arg(long, value_name = "MS")]
    pub poll_interval: Option<u64>,

    /// Commands to launch, one per argument
    #[arg(value_name = "COMMAND", required_unless_present = "file")]
    pub commands: Vec<String>,
}
