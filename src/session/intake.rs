//! Deployment intake: parses the base-poll response and dispatches
//! to identify, process-deployment, or cancel-acknowledgement, enforcing
//! the single-session invariant before ever committing an action id.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;

use crate::config::AgentConfig;
use crate::error::{HttpError, SessionError};
use crate::http::{Execution, FeedbackEnvelope, FinishedResult, Transport, api_url};

use super::SessionContext;

/// A deployment's first chunk's first artifact — the only one this
/// agent ever processes.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub version: String,
    pub size: u64,
    pub sha1: String,
    pub download_url: String,
}

#[derive(Debug, Deserialize)]
struct BasePollResponse {
    config: Option<PollingConfigSection>,
    #[serde(rename = "_links")]
    links: Option<BasePollLinks>,
}

#[derive(Debug, Deserialize)]
struct PollingConfigSection {
    polling: Option<PollingSleep>,
}

#[derive(Debug, Deserialize)]
struct PollingSleep {
    sleep: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BasePollLinks {
    #[serde(rename = "configData")]
    config_data: Option<Href>,
    #[serde(rename = "deploymentBase")]
    deployment_base: Option<Href>,
    #[serde(rename = "cancelAction")]
    cancel_action: Option<Href>,
}

#[derive(Debug, Deserialize)]
struct Href {
    href: String,
}

#[derive(Debug, Deserialize)]
struct DeploymentResource {
    id: Option<String>,
    deployment: Option<DeploymentBody>,
}

#[derive(Debug, Deserialize)]
struct DeploymentBody {
    chunks: Option<Vec<ChunkResource>>,
}

#[derive(Debug, Deserialize)]
struct ChunkResource {
    name: Option<String>,
    version: Option<String>,
    artifacts: Option<Vec<ArtifactResource>>,
}

#[derive(Debug, Deserialize)]
struct ArtifactResource {
    size: Option<u64>,
    hashes: Option<HashesResource>,
    #[serde(rename = "_links")]
    links: Option<ArtifactLinksResource>,
}

#[derive(Debug, Deserialize)]
struct HashesResource {
    sha1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArtifactLinksResource {
    download: Option<Href>,
    #[serde(rename = "download-http")]
    download_http: Option<Href>,
}

/// Performs one base-poll tick: GETs the controller root, dispatches
/// to identify/process-deployment/cancel-ack as advertised, and returns the
/// interval the poller should use until the next tick. `Err` is returned
/// only when the base GET itself failed.
///
/// # Errors
///
/// Returns `SessionError::BasePollFailed` on a transport or HTTP-status
/// failure of the base GET.
pub async fn base_poll(ctx: &SessionContext) -> Result<Duration, SessionError> {
    let url = api_url(&ctx.config, None);
    let response = ctx
        .transport
        .rest::<()>(Method::GET, &url, None)
        .await
        .map_err(|source| {
            if matches!(source, HttpError::UnexpectedStatus { status: 401, .. }) {
                tracing::warn!("base poll rejected with HTTP 401; check the configured token");
            } else {
                tracing::warn!(%source, "base poll request failed");
            }
            SessionError::BasePollFailed { source }
        })?;

    let Some(body) = response else {
        tracing::debug!("base poll returned an empty body");
        return Ok(Duration::from_secs(ctx.config.retry_wait_sec));
    };

    let parsed: BasePollResponse = match serde_json::from_value(body) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(%err, "failed to parse base poll response");
            return Ok(Duration::from_secs(ctx.config.retry_wait_sec));
        }
    };

    let raw_sleep = parsed
        .config
        .as_ref()
        .and_then(|config| config.polling.as_ref())
        .and_then(|polling| polling.sleep.as_deref());
    let interval = match raw_sleep {
        Some(raw) => parse_hhmmss(raw).unwrap_or_else(|| {
            let err = SessionError::InvalidPollingSleep { raw: raw.to_owned() };
            tracing::debug!(%err, "keeping the retry-wait interval");
            Duration::from_secs(ctx.config.retry_wait_sec)
        }),
        None => {
            tracing::debug!(
                "base poll response had no 'config.polling.sleep'; keeping the retry-wait interval"
            );
            Duration::from_secs(ctx.config.retry_wait_sec)
        }
    };

    let Some(links) = parsed.links else {
        tracing::debug!("No new software.");
        return Ok(interval);
    };

    let configdata_href = links.config_data.map(|href| href.href);
    let deployment_href = links.deployment_base.map(|href| href.href);
    let cancel_href = links.cancel_action.map(|href| href.href);

    if configdata_href.is_none() && deployment_href.is_none() && cancel_href.is_none() {
        tracing::debug!("No new software.");
    }

    if let Some(href) = configdata_href {
        identify(ctx, &href).await;
    }
    if let Some(href) = deployment_href {
        process_deployment(ctx, &href).await;
    }
    if let Some(href) = cancel_href {
        acknowledge_cancel(ctx, &href).await;
    }

    Ok(interval)
}

fn parse_hhmmss(raw: &str) -> Option<Duration> {
    let mut parts = raw.splitn(3, ':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    Some(Duration::from_secs(
        hours
            .saturating_mul(3600)
            .saturating_add(minutes.saturating_mul(60))
            .saturating_add(seconds),
    ))
}

/// Identify: a one-shot PUT of device-identity attributes. Failures are
/// logged and never abort the tick.
async fn identify(ctx: &SessionContext, href: &str) {
    let data = (!ctx.config.device_attributes.is_empty()).then(|| ctx.config.device_attributes.clone());
    let envelope = FeedbackEnvelope::build(None, None, FinishedResult::Success, Execution::Closed, data);

    match ctx.transport.rest(Method::PUT, href, Some(&envelope)).await {
        Ok(_) => {
            tracing::info!(
                attributes = ctx.config.device_attributes.len(),
                "sent identify"
            );
        }
        Err(err) => tracing::warn!(%err, "identify request failed"),
    }
}

/// Process-deployment: fetches the deployment resource,
/// validates it, checks free space, and — only once both checks pass —
/// commits the action id and spawns the download worker.
async fn process_deployment(ctx: &SessionContext, href: &str) {
    if ctx.action.is_active().await {
        tracing::debug!(%href, "a deployment is already in progress; rejecting new offer");
        return;
    }

    let body = match ctx.transport.rest::<()>(Method::GET, href, None).await {
        Ok(Some(body)) => body,
        Ok(None) => {
            tracing::warn!("deployment resource had an empty body");
            return;
        }
        Err(source) => {
            let err = SessionError::DeploymentFetchFailed { source };
            tracing::warn!(%err, "failed to fetch deployment resource");
            return;
        }
    };

    let parsed: DeploymentResource = match serde_json::from_value(body) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(%err, "failed to parse deployment resource");
            return;
        }
    };

    // A parse failure before the action id itself is known is logged
    // only — there is no id to attach to a failure feedback.
    let Some(action_id) = parsed.id else {
        tracing::warn!("deployment resource was missing 'id'; logging only");
        return;
    };

    let artifact = match extract_artifact(parsed.deployment) {
        Ok(artifact) => artifact,
        Err(err) => {
            tracing::warn!(%err, action_id, "failed to parse deployment resource");
            post_and_log(
                ctx,
                &action_id,
                "Failed to parse deployment resource.",
                "parse-failure",
            )
            .await;
            return;
        }
    };

    if let Err(err) = check_free_space(&ctx.config.bundle_path, artifact.size) {
        tracing::warn!(%err, action_id, "insufficient free space for deployment");
        let detail = if let SessionError::InsufficientSpace { needed, available, .. } = &err {
            format!("Not enough free space. Need {needed} bytes, have {available} bytes.")
        } else {
            "Not enough free space.".to_owned()
        };
        post_and_log(ctx, &action_id, &detail, "no-space").await;
        return;
    }

    if let Err(err) = ctx.action.try_begin(action_id.clone()).await {
        tracing::debug!(%err, action_id, "a deployment is already in progress; rejecting new offer");
        return;
    }

    let mut last_worker = ctx.last_worker.lock().await;
    if let Some(previous) = last_worker.take() {
        if let Err(err) = previous.await {
            tracing::debug!(%err, "previous download worker task ended with an error");
        }
    }

    tracing::info!(
        action_id,
        name = %artifact.name,
        version = %artifact.version,
        size = artifact.size,
        "deployment accepted; spawning download worker"
    );

    let worker_ctx = ctx.clone();
    let worker_action_id = action_id;
    let handle = tokio::spawn(async move {
        super::download::run(&worker_ctx, worker_action_id, artifact).await;
    });
    *last_worker = Some(handle);
}

async fn post_and_log(ctx: &SessionContext, action_id: &str, detail: &str, situation: &str) {
    if let Err(err) = post_deployment_feedback(
        &ctx.transport,
        &ctx.config,
        action_id,
        Some(detail),
        FinishedResult::Failure,
        Execution::Closed,
        None,
    )
    .await
    {
        tracing::warn!(%err, action_id, situation, "failed to post failure feedback");
    }
}

fn extract_artifact(deployment: Option<DeploymentBody>) -> Result<Artifact, SessionError> {
    let chunk = deployment
        .and_then(|body| body.chunks)
        .and_then(|chunks| chunks.into_iter().next())
        .ok_or(SessionError::MalformedDeployment {
            field: "deployment.chunks[0]",
        })?;
    let name = chunk.name.ok_or(SessionError::MalformedDeployment {
        field: "deployment.chunks[0].name",
    })?;
    let version = chunk.version.ok_or(SessionError::MalformedDeployment {
        field: "deployment.chunks[0].version",
    })?;
    let artifact = chunk
        .artifacts
        .and_then(|artifacts| artifacts.into_iter().next())
        .ok_or(SessionError::MalformedDeployment {
            field: "deployment.chunks[0].artifacts[0]",
        })?;
    let size = artifact.size.ok_or(SessionError::MalformedDeployment {
        field: "artifacts[0].size",
    })?;
    let sha1 = artifact
        .hashes
        .and_then(|hashes| hashes.sha1)
        .ok_or(SessionError::MalformedDeployment {
            field: "artifacts[0].hashes.sha1",
        })?;
    let links = artifact.links.ok_or(SessionError::MalformedDeployment {
        field: "artifacts[0]._links",
    })?;
    let download_url = links
        .download
        .map(|href| href.href)
        .or_else(|| links.download_http.map(|href| href.href))
        .ok_or(SessionError::MalformedDeployment {
            field: "artifacts[0]._links.download",
        })?;

    Ok(Artifact {
        name,
        version,
        size,
        sha1: sha1.to_lowercase(),
        download_url,
    })
}

fn check_free_space(bundle_path: &Path, needed: u64) -> Result<(), SessionError> {
    let dir = bundle_path.parent().unwrap_or_else(|| Path::new("."));
    let stats =
        nix::sys::statvfs::statvfs(dir).map_err(|source| SessionError::StatvfsFailed { source })?;
    let available = stats.block_size().saturating_mul(stats.blocks_available());
    if available < needed {
        return Err(SessionError::InsufficientSpace {
            path: dir.display().to_string(),
            needed,
            available,
        });
    }
    Ok(())
}

/// Cancel-action acknowledgement: the server is told the request was
/// received, but no in-flight session is aborted — the agent does not
/// support aborting a download or install already underway.
async fn acknowledge_cancel(ctx: &SessionContext, href: &str) {
    tracing::warn!(
        %href,
        "cancellation requested by server but execution is not supported; acknowledging only"
    );

    let action_id = href.rsplit('/').next().unwrap_or_default();
    let envelope = FeedbackEnvelope::build(
        Some(action_id),
        Some("Cancellation is not supported; deployment continues."),
        FinishedResult::None,
        Execution::Canceled,
        None,
    );
    let feedback_url = format!("{href}/feedback");
    if let Err(err) = ctx
        .transport
        .rest(Method::POST, &feedback_url, Some(&envelope))
        .await
    {
        tracing::warn!(%err, "failed to post cancel acknowledgement feedback");
    }
}

/// POSTs a deployment-feedback envelope to `deploymentBase/{id}/feedback`.
///
/// # Errors
///
/// Returns an error on transport or HTTP-status failure; callers log and
/// otherwise ignore it rather than aborting the poll loop.
pub(super) async fn post_deployment_feedback(
    transport: &Transport,
    config: &AgentConfig,
    action_id: &str,
    detail: Option<&str>,
    finished: FinishedResult,
    execution: Execution,
    data: Option<BTreeMap<String, String>>,
) -> Result<(), HttpError> {
    let envelope = FeedbackEnvelope::build(Some(action_id), detail, finished, execution, data);
    let url = api_url(config, Some(&format!("deploymentBase/{action_id}/feedback")));
    transport.rest(Method::POST, &url, Some(&envelope)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hh_mm_ss() {
        assert_eq!(parse_hhmmss("00:05:00"), Some(Duration::from_secs(300)));
        assert_eq!(parse_hhmmss("01:00:00"), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn rejects_malformed_sleep() {
        assert_eq!(parse_hhmmss("not-a-time"), None);
        assert_eq!(parse_hhmmss("00:05"), None);
    }

    #[test]
    fn extract_artifact_prefers_https_download_link() {
        let deployment = DeploymentBody {
            chunks: Some(vec![ChunkResource {
                name: Some("firmware".to_owned()),
                version: Some("1.2.3".to_owned()),
                artifacts: Some(vec![ArtifactResource {
                    size: Some(1024),
                    hashes: Some(HashesResource {
                        sha1: Some("DA39A3EE5E6B4B0D3255BFEF95601890AFD80709".to_owned()),
                    }),
                    links: Some(ArtifactLinksResource {
                        download: Some(Href {
                            href: "https://example.com/bundle".to_owned(),
                        }),
                        download_http: Some(Href {
                            href: "http://example.com/bundle".to_owned(),
                        }),
                    }),
                }]),
            }]),
        };

        let artifact = extract_artifact(Some(deployment)).expect("artifact parses");
        assert_eq!(artifact.download_url, "https://example.com/bundle");
        assert_eq!(artifact.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn extract_artifact_reports_missing_field() {
        let err = extract_artifact(None).expect_err("missing chunk is an error");
        assert!(matches!(
            err,
            SessionError::MalformedDeployment {
                field: "deployment.chunks[0]"
            }
        ));
    }
}
