use crate::cli::GLaunch;
use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io::Write;

pub(crate) fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = GLaunch::command();
    let mut buf = Vec::<u8>::new();
    clap_complete::generate(shell, &mut cmd, env!("CARGO_PKG_NAME"), &mut buf);

    match std::io::stdout().write_all(&buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(e.into()),
    }
}
