//! OCI transport: copying whole images between registries/local layout
//! directories via a forked `skopeo`, and pulling individual artifact
//! blobs (for `fetch-files-via-OCI`) via [`containers_image_proxy`].
//!
//! Image copy (`sync-OCI`, `push-OCI`) shells out to `skopeo copy` rather
//! than re-implementing the OCI distribution protocol, the same division
//! of labor the rest of the ecosystem uses it for.

use crate::refs::ArtifactRef;
use anyhow::{Context, Result};
use camino::Utf8Path;
use containers_image_proxy::{ImageProxy, ImageProxyConfig};
use fn_error_context::context;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Semaphore;

/// Bounded concurrency for in-flight blob fetches.
const MAX_CONCURRENT_BLOBS: usize = 3;
/// Blobs at or above this size get their own progress line.
const PROGRESS_THRESHOLD_BYTES: u64 = 1024 * 1024;

/// `docker://` transport string for a registry reference.
fn docker_transport(r: &ArtifactRef) -> String {
    format!("docker://{}:{}", r.repo_name(), r.tag)
}

/// `oci:` transport string for a local OCI layout directory.
fn oci_transport(dir: &Utf8Path, tag: &str) -> String {
    format!("oci:{dir}:{tag}")
}

fn new_cmd() -> Command {
    let mut cmd = Command::new("skopeo");
    cmd.stdin(Stdio::null());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);
    cmd
}

async fn run_skopeo(mut cmd: Command) -> Result<()> {
    let output = cmd.output().await.context("forking skopeo")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("skopeo failed: {stderr}");
    }
    Ok(())
}

/// Copies `src` (a registry reference) into `dest_dir` as an OCI Image
/// Layout under tag `tag`, all architectures included. No-op if
/// `dest_dir/index.json` already exists.
#[context("syncing {src} to {dest_dir}")]
pub async fn sync_to_layout(src: &ArtifactRef, dest_dir: &Utf8Path, tag: &str) -> Result<()> {
    if dest_dir.join("index.json").is_file() {
        return Ok(());
    }
    crate::fsutil::mkdir_p_mode(dest_dir, crate::file::DEFAULT_DIR_MODE)?;
    let mut cmd = new_cmd();
    cmd.arg("copy").arg("--all");
    cmd.arg(docker_transport(src));
    cmd.arg(oci_transport(dest_dir, tag));
    run_skopeo(cmd).await
}

/// Pushes a local OCI Image Layout at `src_dir` (tag `tag`) to the
/// registry reference `dest`, all architectures included.
#[context("pushing {src_dir} to {dest}")]
pub async fn push_from_layout(src_dir: &Utf8Path, tag: &str, dest: &ArtifactRef) -> Result<()> {
    let mut cmd = new_cmd();
    cmd.arg("copy").arg("--all");
    cmd.arg(oci_transport(src_dir, tag));
    cmd.arg(docker_transport(dest));
    run_skopeo(cmd).await
}

/// A single named blob pulled from an artifact manifest.
#[derive(Debug, Clone)]
pub struct PulledBlob {
    /// The `org.opencontainers.image.title` annotation, or the digest
    /// (sha256 hex) if no title was set.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Progress events emitted while pulling an artifact's layers.
#[derive(Debug, Clone)]
pub enum PullProgress {
    Started { name: String, total_bytes: u64 },
    Finished { name: String },
}

/// Pulls every layer blob of the OCI artifact manifest at `src`, decoded
/// into memory, reporting progress on `progress_tx` for blobs at or above
/// [`PROGRESS_THRESHOLD_BYTES`]. Concurrency is bounded to
/// [`MAX_CONCURRENT_BLOBS`] in-flight fetches.
#[context("pulling artifact blobs for {src}")]
pub async fn pull_artifact_blobs(
    src: &ArtifactRef,
    progress_tx: Option<tokio::sync::mpsc::UnboundedSender<PullProgress>>,
) -> Result<Vec<PulledBlob>> {
    let config = ImageProxyConfig {
        insecure_skip_tls_verification: Some(src.is_localhost()),
        ..Default::default()
    };
    let proxy = Arc::new(ImageProxy::new_with_config(config).await?);
    let imgref = docker_transport(src);
    let img = proxy.open_image(&imgref).await?;
    let (_digest, manifest) = proxy.fetch_manifest(&img).await?;

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_BLOBS));
    let mut tasks = Vec::new();
    for layer in manifest.layers().iter().cloned() {
        let proxy = proxy.clone();
        let img = img.clone();
        let tx = progress_tx.clone();
        let semaphore = semaphore.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let size = layer.size().max(0) as u64;
            let name = layer
                .annotations()
                .as_ref()
                .and_then(|a| a.get("org.opencontainers.image.title").cloned())
                .unwrap_or_else(|| layer.digest().to_string().replace(':', "-"));
            if size >= PROGRESS_THRESHOLD_BYTES {
                if let Some(tx) = &tx {
                    tx.send(PullProgress::Started {
                        name: name.clone(),
                        total_bytes: size,
                    })
                    .ok();
                }
            }
            let (mut blob, driver) = proxy.get_blob(&img, layer.digest(), size).await?;
            let mut bytes = Vec::with_capacity(size as usize);
            let read = blob.read_to_end(&mut bytes);
            let (read_result, driver_result) = tokio::join!(read, driver);
            read_result?;
            driver_result?;
            if size >= PROGRESS_THRESHOLD_BYTES {
                if let Some(tx) = &tx {
                    tx.send(PullProgress::Finished { name: name.clone() }).ok();
                }
            }
            anyhow::Ok(PulledBlob { name, bytes })
        }));
    }
    drop(progress_tx);

    let mut out = Vec::with_capacity(tasks.len());
    for t in tasks {
        out.push(t.await.context("joining blob fetch task")??);
    }
    proxy.close_image(&img).await?;
    Arc::try_unwrap(proxy)
        .map_err(|_| anyhow::anyhow!("image proxy still in use"))?
        .finalize()
        .await?;
    Ok(out)
}

/// Drains [`PullProgress`] events onto a [`indicatif::MultiProgress`] until
/// the channel closes. Spawn this before the blobs start fetching.
pub async fn drain_progress(mut rx: tokio::sync::mpsc::UnboundedReceiver<PullProgress>) {
    use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
    use std::collections::HashMap;

    let multi = MultiProgress::new();
    let style = ProgressStyle::with_template("{msg} {spinner} {bytes}/{total_bytes}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let mut bars: HashMap<String, ProgressBar> = HashMap::new();
    while let Some(ev) = rx.recv().await {
        match ev {
            PullProgress::Started { name, total_bytes } => {
                let bar = multi.add(ProgressBar::new(total_bytes));
                bar.set_style(style.clone());
                bar.set_message(name.clone());
                bars.insert(name, bar);
            }
            PullProgress::Finished { name } => {
                if let Some(bar) = bars.remove(&name) {
                    bar.finish_and_clear();
                }
            }
        }
    }
}
