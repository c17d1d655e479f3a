//! Process execution helper for `exec-command`: a small `Task` builder
//! running a command to completion with stdio forwarded, adapted to run
//! under tokio since the runner is async end-to-end.

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A single command invocation, run to completion with stdout/stderr
/// forwarded to the runner's own stderr.
pub struct Task {
    description: String,
    cmd: Command,
}

impl Task {
    pub fn new(description: impl Into<String>, exe: impl AsRef<OsStr>) -> Self {
        let mut cmd = Command::new(exe);
        cmd.stdin(Stdio::null());
        Self {
            description: description.into(),
            cmd,
        }
    }

    pub fn args<S: AsRef<OsStr>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn envs<K: AsRef<OsStr>, V: AsRef<OsStr>>(
        mut self,
        vars: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.cmd.envs(vars);
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<std::path::Path>) -> Self {
        self.cmd.current_dir(dir);
        self
    }

    /// Run the command to completion. Both the child's stdout and stderr
    /// are forwarded onto the runner's own stderr, returning an error if
    /// it does not exit successfully.
    pub async fn run(mut self) -> Result<()> {
        tracing::debug!(description = %self.description, "exec: {:?}", self.cmd);
        self.cmd.stdout(Stdio::piped());
        self.cmd.stderr(Stdio::piped());
        let mut child = self
            .cmd
            .spawn()
            .with_context(|| format!("spawning {}", self.description))?;
        let mut stdout = child.stdout.take().expect("stdout was piped");
        let mut stderr = child.stderr.take().expect("stderr was piped");
        let stdout_forward = tokio::spawn(async move {
            tokio::io::copy(&mut stdout, &mut tokio::io::stderr()).await
        });
        let stderr_forward = tokio::spawn(async move {
            tokio::io::copy(&mut stderr, &mut tokio::io::stderr()).await
        });
        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for {}", self.description))?;
        stdout_forward
            .await
            .context("joining stdout forwarder")?
            .context("forwarding child stdout")?;
        stderr_forward
            .await
            .context("joining stderr forwarder")?
            .context("forwarding child stderr")?;
        tokio::io::stderr().flush().await.ok();
        if !status.success() {
            anyhow::bail!("{} failed: {status:?}", self.description);
        }
        Ok(())
    }
}
