use super::{Launcher, LauncherKind};
use crate::config::SlurmConfig;
use crate::core::error::LaunchError;
use crate::core::process::{ProcessHandle, Spawner};
use crate::utils::{
    format_memory, format_slurm_memory, format_slurm_time, parse_memory_limit, parse_time_limit,
};
use anyhow::{Context, Result};
use shell_escape::escape;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const TIMESTAMP_FORMAT: &str = "%m-%d-%Y-%H-%M-%S";

/// Per array task resource requests, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlurmResources {
    pub cpus_per_task: u32,
    pub mem_mb: u64,
    pub gpus: u32,
    pub time: Duration,
    pub partition: Option<String>,
    pub exclude: Vec<String>,
}

impl SlurmResources {
    pub fn from_config(config: &SlurmConfig) -> Result<Self> {
        let mem_mb = parse_memory_limit(&config.mem)
            .with_context(|| format!("Invalid slurm.mem '{}'", config.mem))?;
        let time = parse_time_limit(&config.time)
            .with_context(|| format!("Invalid slurm.time '{}'", config.time))?;

        Ok(Self {
            cpus_per_task: config.cpus_per_task,
            mem_mb,
            gpus: config.gpus,
            time,
            partition: config.partition.clone().filter(|p| !p.is_empty()),
            exclude: config.exclude.clone(),
        })
    }
}

/// Files written for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub jobs_file: PathBuf,
    pub script: PathBuf,
}

/// Render an `sbatch` script running line `$SLURM_ARRAY_TASK_ID` of
/// `jobs_file` as array task `1..=num_tasks`.
pub fn render_submit_script(resources: &SlurmResources, jobs_file: &Path, num_tasks: usize) -> String {
    let mut script = String::from("#!/bin/bash\n");
    let mut directive = |line: String| {
        let _ = writeln!(script, "#SBATCH {line}");
    };

    directive(format!("--cpus-per-task={}", resources.cpus_per_task));
    if let Some(partition) = &resources.partition {
        directive(format!("--partition={partition}"));
    }
    directive(format!("--array=1-{num_tasks}"));
    if resources.gpus > 0 {
        directive(format!("--gres=gpu:{}", resources.gpus));
    }
    directive(format!("--mem={}", format_slurm_memory(resources.mem_mb)));
    directive(format!("--time={}", format_slurm_time(resources.time)));
    if !resources.exclude.is_empty() {
        directive(format!("--exclude={}", resources.exclude.join(",")));
    }

    let _ = writeln!(
        script,
        "srun $(head -n $SLURM_ARRAY_TASK_ID {} | tail -n 1)",
        escape(jobs_file.to_string_lossy())
    );
    script
}

/// Submits every command as one task of a SLURM array job.
///
/// The exit status of `sbatch` is logged but not treated as an error; the
/// scheduler owns the jobs once the script is handed over.
pub struct SlurmLauncher<S: Spawner> {
    spawner: S,
    resources: SlurmResources,
    output_dir: PathBuf,
    sbatch: String,
    sbatch_args: Vec<String>,
}

impl<S: Spawner> SlurmLauncher<S> {
    pub fn new(spawner: S, config: &SlurmConfig) -> Result<Self> {
        Ok(Self {
            spawner,
            resources: SlurmResources::from_config(config)?,
            output_dir: config.output_dir.clone(),
            sbatch: config.sbatch.clone(),
            sbatch_args: config.sbatch_args.clone(),
        })
    }

    pub fn resources(&self) -> &SlurmResources {
        &self.resources
    }

    /// Write `jobs_<stamp>.txt` and `submit_<stamp>.sh` into the output directory.
    ///
    /// Commands containing a line break are rejected before anything is written.
    pub fn write_submission(&self, commands: &[String], stamp: &str) -> Result<Submission> {
        if let Some(index) = commands
            .iter()
            .position(|command| command.contains(['\n', '\r']))
        {
            return Err(LaunchError::MultiLineCommand { index }.into());
        }

        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.output_dir.display()
            )
        })?;

        let jobs_file = self.output_dir.join(format!("jobs_{stamp}.txt"));
        let mut contents = commands.join("\n");
        contents.push('\n');
        fs::write(&jobs_file, contents)
            .with_context(|| format!("Failed to write job list {}", jobs_file.display()))?;

        let script = self.output_dir.join(format!("submit_{stamp}.sh"));
        fs::write(
            &script,
            render_submit_script(&self.resources, &jobs_file, commands.len()),
        )
        .with_context(|| format!("Failed to write submission script {}", script.display()))?;

        Ok(Submission { jobs_file, script })
    }

    /// Shell line submitting `script`. `sbatch` is taken as written, so it may
    /// carry its own arguments; the extra args and the script path are quoted.
    pub fn submit_command(&self, script: &Path) -> String {
        let mut command = self.sbatch.clone();
        for arg in &self.sbatch_args {
            command.push(' ');
            command.push_str(&escape(Cow::Borrowed(arg.as_str())));
        }
        command.push(' ');
        command.push_str(&escape(script.to_string_lossy()));
        command
    }

    fn submit(&self, script: &Path) -> Result<()> {
        let command = self.submit_command(script);
        info!("Submitting: {command}");
        let status = self.spawner.spawn(&command, &[])?.wait()?;
        if !status.success() {
            warn!("`{command}` exited with {status}");
        }
        Ok(())
    }
}

impl<S: Spawner> Launcher for SlurmLauncher<S> {
    fn name(&self) -> &str {
        LauncherKind::Slurm.name()
    }

    fn description(&self) -> &str {
        LauncherKind::Slurm.description()
    }

    fn launch(&self, commands: Vec<String>) -> Result<()> {
        if commands.is_empty() {
            warn!("No commands to submit, skipping sbatch");
            return Ok(());
        }

        let stamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let submission = self.write_submission(&commands, &stamp)?;
        info!(
            "Wrote {} task(s) to {} ({} CPUs, {} memory per task)",
            commands.len(),
            submission.jobs_file.display(),
            self.resources.cpus_per_task,
            format_memory(self.resources.mem_mb)
        );
        self.submit(&submission.script)
    }
}
