use crate::ops::RunOp;
use crate::task::Task;
use anyhow::{ensure, Result};
use async_trait::async_trait;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Runs `name` with `args`, `env` appended to the ambient environment,
/// working directory `basedir`. A non-zero exit code is an error.
/// Idempotency of the underlying command is the caller's responsibility.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecCommand {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[async_trait]
impl RunOp for ExecCommand {
    fn type_tag(&self) -> &'static str {
        "ExecCommand"
    }

    fn hydrate(&mut self) -> Result<()> {
        ensure!(!self.name.is_empty(), "exec-command missing name");
        Ok(())
    }

    fn summary(&self) -> String {
        format!("exec {} {}", self.name, self.args.join(" "))
    }

    async fn run(&self, basedir: &Utf8Path) -> Result<()> {
        Task::new(self.summary(), &self.name)
            .args(&self.args)
            .envs(self.env.iter())
            .current_dir(basedir)
            .run()
            .await
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
