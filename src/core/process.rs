use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus};

/// Starts commands on behalf of a launcher.
///
/// Launchers never touch `std::process` directly, so the scheduling logic can
/// be exercised with in-memory handles.
pub trait Spawner {
    type Handle: ProcessHandle;

    /// Start `command` with `envs` added to the inherited environment.
    fn spawn(&self, command: &str, envs: &[(&str, &str)]) -> Result<Self::Handle>;
}

/// A started process that can be checked without blocking or waited on.
pub trait ProcessHandle {
    /// Returns the exit status if the process has exited, `None` if it is still running.
    fn poll(&mut self) -> Result<Option<ExitStatus>>;

    fn wait(&mut self) -> Result<ExitStatus>;
}

/// Runs each command through `sh -c`.
///
/// The command string is handed to the shell verbatim: pipes, redirections and
/// `&&` chains work, and so does anything else the string contains.
#[derive(Debug, Clone)]
pub struct ShellSpawner {
    shell: PathBuf,
}

impl Default for ShellSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellSpawner {
    pub fn new() -> Self {
        Self {
            shell: PathBuf::from("sh"),
        }
    }

    pub fn with_shell(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Spawner for ShellSpawner {
    type Handle = Child;

    fn spawn(&self, command: &str, envs: &[(&str, &str)]) -> Result<Child> {
        Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .envs(envs.iter().copied())
            .spawn()
            .with_context(|| format!("Failed to spawn `{command}` with {:?}", self.shell))
    }
}

impl ProcessHandle for Child {
    fn poll(&mut self) -> Result<Option<ExitStatus>> {
        let pid = self.id();
        self.try_wait()
            .with_context(|| format!("Failed to poll process {pid}"))
    }

    fn wait(&mut self) -> Result<ExitStatus> {
        let pid = self.id();
        Child::wait(self).with_context(|| format!("Failed to wait for process {pid}"))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Launch {
        pub command: String,
        pub envs: Vec<(String, String)>,
    }

    #[derive(Debug, Default)]
    struct Ledger {
        launches: Vec<Launch>,
        running: usize,
        max_running: usize,
    }

    /// Records every spawn and hands out handles that exit after a fixed number of polls.
    #[derive(Debug, Clone, Default)]
    pub struct FakeSpawner {
        ledger: Arc<Mutex<Ledger>>,
        polls_until_exit: u32,
        exit_code: i32,
        fail_on: Option<String>,
    }

    impl FakeSpawner {
        pub fn new(polls_until_exit: u32) -> Self {
            Self {
                polls_until_exit,
                ..Default::default()
            }
        }

        pub fn exiting_with(mut self, code: i32) -> Self {
            self.exit_code = code;
            self
        }

        pub fn failing_on(mut self, command: &str) -> Self {
            self.fail_on = Some(command.to_string());
            self
        }

        pub fn launches(&self) -> Vec<Launch> {
            self.ledger.lock().unwrap().launches.clone()
        }

        pub fn commands(&self) -> Vec<String> {
            self.launches().into_iter().map(|l| l.command).collect()
        }

        pub fn running(&self) -> usize {
            self.ledger.lock().unwrap().running
        }

        pub fn max_running(&self) -> usize {
            self.ledger.lock().unwrap().max_running
        }
    }

    impl Spawner for FakeSpawner {
        type Handle = FakeHandle;

        fn spawn(&self, command: &str, envs: &[(&str, &str)]) -> Result<FakeHandle> {
            if self.fail_on.as_deref() == Some(command) {
                anyhow::bail!("Mock spawn failed for `{command}`");
            }

            let mut ledger = self.ledger.lock().unwrap();
            ledger.launches.push(Launch {
                command: command.to_string(),
                envs: envs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });
            ledger.running += 1;
            ledger.max_running = ledger.max_running.max(ledger.running);

            Ok(FakeHandle {
                ledger: Arc::clone(&self.ledger),
                polls_left: self.polls_until_exit,
                status: ExitStatus::from_raw(self.exit_code << 8),
                exited: false,
            })
        }
    }

    pub struct FakeHandle {
        ledger: Arc<Mutex<Ledger>>,
        polls_left: u32,
        status: ExitStatus,
        exited: bool,
    }

    impl FakeHandle {
        fn finish(&mut self) -> ExitStatus {
            if !self.exited {
                self.exited = true;
                self.ledger.lock().unwrap().running -= 1;
            }
            self.status
        }
    }

    impl ProcessHandle for FakeHandle {
        fn poll(&mut self) -> Result<Option<ExitStatus>> {
            if self.exited || self.polls_left == 0 {
                return Ok(Some(self.finish()));
            }
            self.polls_left -= 1;
            Ok(None)
        }

        fn wait(&mut self) -> Result<ExitStatus> {
            Ok(self.finish())
        }
    }
}
