use crate::ops::RunOp;
use anyhow::{bail, ensure, Context, Result};
use async_trait::async_trait;
use camino::Utf8Path;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

const DEFAULT_TIMEOUT_RESOURCE_SECS: u64 = 600;
const DEFAULT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_INTERVAL_SECS: u64 = 3;

/// Waits for a Kubernetes object `kind/name` to exist, then for a
/// kind-specific readiness condition. `kind` is matched case-insensitively
/// against the well-known built-ins (`deployment`, `job`, `daemonset`,
/// `control-agent`); anything else only waits for existence.
/// `api_version` (`group/version`) is required for kinds outside the
/// built-ins, since a generic kind name alone doesn't resolve to a
/// Kubernetes API group.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitKube {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_resource_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
}

impl WaitKube {
    fn namespace_or_default(&self) -> &str {
        self.namespace.as_deref().unwrap_or("default")
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    fn kind_lower(&self) -> String {
        self.kind.to_ascii_lowercase()
    }
}

#[async_trait]
impl RunOp for WaitKube {
    fn type_tag(&self) -> &'static str {
        "WaitKube"
    }

    fn hydrate(&mut self) -> Result<()> {
        ensure!(!self.kind.is_empty(), "wait-kube missing kind");
        ensure!(!self.name.is_empty(), "wait-kube missing name");
        if self.namespace.is_none() {
            self.namespace = Some("default".into());
        }
        if self.timeout_resource_secs.is_none() {
            self.timeout_resource_secs = Some(DEFAULT_TIMEOUT_RESOURCE_SECS);
        }
        if self.timeout_secs.is_none() {
            self.timeout_secs = Some(DEFAULT_TIMEOUT_SECS);
        }
        if self.interval_secs.is_none() {
            self.interval_secs = Some(DEFAULT_INTERVAL_SECS);
        }
        let known = matches!(
            self.kind_lower().as_str(),
            "deployment" | "job" | "daemonset" | "control-agent"
        );
        if !known {
            ensure!(
                self.api_version.as_deref().map_or(false, |v| !v.is_empty()),
                "wait-kube for unrecognized kind {} needs an explicit api_version",
                self.kind
            );
        }
        Ok(())
    }

    fn summary(&self) -> String {
        format!(
            "wait for {}/{} in {}",
            self.kind,
            self.name,
            self.namespace_or_default()
        )
    }

    async fn run(&self, _basedir: &Utf8Path) -> Result<()> {
        let client = Client::try_default()
            .await
            .context("connecting to Kubernetes")?;
        let ns = self.namespace_or_default();

        wait_for_existence(
            &client,
            self,
            ns,
            Duration::from_secs(
                self.timeout_resource_secs.unwrap_or(DEFAULT_TIMEOUT_RESOURCE_SECS),
            ),
        )
        .await?;

        wait_for_readiness(
            &client,
            self,
            ns,
            Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        )
        .await
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

fn dynamic_api(client: &Client, op: &WaitKube, ns: &str) -> Result<Api<DynamicObject>> {
    let (group, version) = op
        .api_version
        .as_deref()
        .and_then(|v| v.split_once('/'))
        .unwrap_or(("", "v1"));
    let gvk = GroupVersionKind::gvk(group, version, &op.kind);
    let resource = ApiResource::from_gvk(&gvk);
    Ok(Api::namespaced_with(client.clone(), ns, &resource))
}

async fn exists(client: &Client, op: &WaitKube, ns: &str) -> Result<bool> {
    match op.kind_lower().as_str() {
        "deployment" => Ok(Api::<Deployment>::namespaced(client.clone(), ns)
            .get_opt(&op.name)
            .await?
            .is_some()),
        "job" => Ok(Api::<Job>::namespaced(client.clone(), ns)
            .get_opt(&op.name)
            .await?
            .is_some()),
        "daemonset" => Ok(Api::<DaemonSet>::namespaced(client.clone(), ns)
            .get_opt(&op.name)
            .await?
            .is_some()),
        _ => Ok(dynamic_api(client, op, ns)?.get_opt(&op.name).await?.is_some()),
    }
}

async fn wait_for_existence(
    client: &Client,
    op: &WaitKube,
    ns: &str,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if exists(client, op, ns).await? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!(
                "timed out waiting for {}/{} to exist in {ns}",
                op.kind,
                op.name
            );
        }
        tokio::time::sleep(op.interval()).await;
    }
}

fn deployment_ready(d: &Deployment) -> bool {
    let wanted = d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    d.status
        .as_ref()
        .and_then(|s| s.available_replicas)
        .map(|available| available >= wanted)
        .unwrap_or(false)
}

fn job_ready(j: &Job) -> bool {
    j.status
        .as_ref()
        .and_then(|s| s.succeeded)
        .map(|n| n > 0)
        .unwrap_or(false)
}

fn daemonset_ready(d: &DaemonSet) -> bool {
    let Some(status) = d.status.as_ref() else {
        return false;
    };
    status.number_ready == status.desired_number_scheduled
        && status.updated_number_scheduled.unwrap_or(0) == status.desired_number_scheduled
}

/// Control-agent custom resources report readiness as a `status.conditions`
/// entry with `type: Applied, status: "True"`, the same Kubernetes
/// conditions idiom used by the built-in workload kinds.
fn control_agent_ready(obj: &DynamicObject) -> bool {
    let Some(conditions) = obj
        .data
        .get("status")
        .and_then(|s| s.get("conditions"))
        .and_then(|c| c.as_array())
    else {
        return false;
    };
    conditions.iter().any(|c| {
        c.get("type").and_then(|t| t.as_str()) == Some("Applied")
            && c.get("status").and_then(|s| s.as_str()) == Some("True")
    })
}

async fn wait_for_readiness(
    client: &Client,
    op: &WaitKube,
    ns: &str,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let ready = match op.kind_lower().as_str() {
            "deployment" => deployment_ready(
                &Api::<Deployment>::namespaced(client.clone(), ns)
                    .get(&op.name)
                    .await?,
            ),
            "job" => job_ready(&Api::<Job>::namespaced(client.clone(), ns).get(&op.name).await?),
            "daemonset" => daemonset_ready(
                &Api::<DaemonSet>::namespaced(client.clone(), ns)
                    .get(&op.name)
                    .await?,
            ),
            "control-agent" => {
                control_agent_ready(&dynamic_api(client, op, ns)?.get(&op.name).await?)
            }
            _ => return Ok(()), // existence-only kinds are already satisfied
        };
        if ready {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!(
                "timed out waiting for {}/{} to become ready in {ns}",
                op.kind,
                op.name
            );
        }
        tokio::time::sleep(op.interval()).await;
    }
}
