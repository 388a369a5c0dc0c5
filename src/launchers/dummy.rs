use super::{Launcher, LauncherKind};
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::io::{self, Stdout, Write};

/// Prints each command instead of running it. Useful for checking a sweep
/// before spending GPU time on it.
pub struct DummyLauncher<W: Write> {
    out: RefCell<W>,
}

impl DummyLauncher<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> DummyLauncher<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> Launcher for DummyLauncher<W> {
    fn name(&self) -> &str {
        LauncherKind::Dummy.name()
    }

    fn description(&self) -> &str {
        LauncherKind::Dummy.description()
    }

    fn launch(&self, commands: Vec<String>) -> Result<()> {
        let mut out = self.out.borrow_mut();
        for command in &commands {
            writeln!(out, "Dummy launcher: {command}").context("Failed to write command")?;
        }
        out.flush().context("Failed to flush output")
    }
}
