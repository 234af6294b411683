use std::{future::Future, io, process::Stdio};

use tokio::process::Command;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
}

/// Launches the external shell and captures its output. An `Err` means the
/// program could not be run at all; SQL errors arrive on `stderr`.
pub trait ShellRunner: Send + Sync + 'static {
    fn run(&self, program: &str, args: &[String]) -> impl Future<Output = io::Result<Captured>> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ShellRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> impl Future<Output = io::Result<Captured>> + Send {
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        async move {
            let output = cmd.output().await?;
            Ok(Captured {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
