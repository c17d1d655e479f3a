use crate::ops::RunOp;
use crate::wait::WaitParams;
use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

const DEFAULT_STATUS_CODE: u16 = 200;

/// Periodically issues an HTTP GET against `url` (closing the body),
/// succeeding when the status equals `status_code`. Retries use the
/// embedded [`WaitParams`]; the last error observed is surfaced once
/// attempts are exhausted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(flatten)]
    pub wait: WaitParams,
}

#[async_trait]
impl RunOp for WaitUrl {
    fn type_tag(&self) -> &'static str {
        "WaitURL"
    }

    fn hydrate(&mut self) -> Result<()> {
        ensure!(!self.url.is_empty(), "wait-url missing url");
        if self.status_code.is_none() {
            self.status_code = Some(DEFAULT_STATUS_CODE);
        }
        self.wait.hydrate()
    }

    fn summary(&self) -> String {
        format!(
            "wait for {} to return {}",
            self.url,
            self.status_code.unwrap_or(DEFAULT_STATUS_CODE)
        )
    }

    async fn run(&self, _basedir: &Utf8Path) -> Result<()> {
        let want = self.status_code.unwrap_or(DEFAULT_STATUS_CODE);
        let client = reqwest::Client::new();

        tokio::time::sleep(self.wait.delay()).await;

        let mut last_err = None;
        for attempt in 1..=self.wait.attempts {
            match client.get(&self.url).send().await {
                Ok(resp) => {
                    let got = resp.status().as_u16();
                    drop(resp); // close the body without reading it
                    if got == want {
                        return Ok(());
                    }
                    last_err = Some(anyhow::anyhow!(
                        "attempt {attempt}/{}: {} returned {got}, wanted {want}",
                        self.wait.attempts,
                        self.url
                    ));
                }
                Err(e) => {
                    last_err = Some(anyhow::Error::new(e).context(format!(
                        "attempt {attempt}/{}: requesting {}",
                        self.wait.attempts, self.url
                    )));
                }
            }
            if attempt < self.wait.attempts {
                tokio::time::sleep(self.wait.interval()).await;
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("wait-url exhausted with no attempts")))
            .context("wait-url exhausted retries")
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
