use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tokio::time;

use crate::config::{AgentConfig, AuthToken};
use crate::error::HttpError;

const USER_AGENT: &str = concat!("hawkbit-agent/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 8;
const MIN_THROUGHPUT_BPS: u64 = 100;
const STALL_WINDOW_SECS: u32 = 60;

/// Result of a successful artifact download: the hex-encoded SHA-1 of the
/// bytes written to disk and the average transfer rate observed.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub sha1_hex: String,
    pub bytes_per_second: f64,
}

/// Thin wrapper over a `reqwest::Client` implementing the two DDI transport
/// operations: JSON request/response and streaming artifact download.
/// Cheap to clone — `reqwest::Client` is internally reference-counted.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    auth: AuthToken,
}

impl Transport {
    /// Builds a transport from the resolved agent configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest::Client` cannot be built.
    pub fn new(config: &AgentConfig) -> Result<Self, HttpError> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

        if !config.tls_verify {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        let client = builder
            .build()
            .map_err(|source| HttpError::BuildClientFailed { source })?;

        Ok(Self {
            client,
            auth: config.auth.clone(),
        })
    }

    fn auth_header(&self) -> Result<Option<HeaderValue>, HttpError> {
        let raw = match &self.auth {
            AuthToken::Target(token) => format!("TargetToken {}", token),
            AuthToken::Gateway(token) => format!("GatewayToken {}", token),
            AuthToken::None => return Ok(None),
        };
        HeaderValue::from_str(&raw)
            .map(Some)
            .map_err(|_source| HttpError::InvalidAuthHeader)
    }

    /// Performs a JSON request and returns the parsed response body, or
    /// `None` when the server replied with an empty body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-200 status, or an
    /// unparseable JSON body.
    pub async fn rest<B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Option<Value>, HttpError>
    where
        B: Serialize + Sync,
    {
        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json;charset=UTF-8");

        if let Some(auth) = self.auth_header()? {
            request = request.header(AUTHORIZATION, auth);
        }

        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json;charset=UTF-8")
                .json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| HttpError::RequestFailed { source })?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| HttpError::RequestFailed { source })?;
        if bytes.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| HttpError::ParseResponse { source })
    }

    /// Streams the artifact at `url` to `dest`, truncating any existing
    /// file, while incrementally hashing the body. Aborts with
    /// `HttpError::DownloadStalled` if throughput stays below
    /// `MIN_THROUGHPUT_BPS` for `STALL_WINDOW_SECS` consecutive seconds.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-200 status, a local
    /// I/O failure, or a sustained low-throughput stall.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        expected_size: u64,
    ) -> Result<DownloadOutcome, HttpError> {
        let mut request = self.client.get(url).header(ACCEPT, "application/octet-stream");
        if let Some(auth) = self.auth_header()? {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|source| HttpError::RequestFailed { source })?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let path_display = dest.display().to_string();
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|source| HttpError::OpenDestination {
                path: path_display.clone(),
                source,
            })?;

        let mut hasher = Sha1::new();
        let mut stream = response.bytes_stream();
        let started_at = Instant::now();
        let mut downloaded: u64 = 0;
        let mut bytes_at_last_tick: u64 = 0;
        let mut low_speed_ticks: u32 = 0;
        let mut ticker = time::interval(Duration::from_secs(1));
        ticker.tick().await;

        loop {
            tokio::select! {
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(bytes)) => {
                            file.write_all(&bytes).await.map_err(|source| {
                                HttpError::WriteDestination { path: path_display.clone(), source }
                            })?;
                            hasher.update(&bytes);
                            downloaded = downloaded.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
                        }
                        Some(Err(source)) => return Err(HttpError::RequestFailed { source }),
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    let delta = downloaded.saturating_sub(bytes_at_last_tick);
                    bytes_at_last_tick = downloaded;
                    if delta < MIN_THROUGHPUT_BPS {
                        low_speed_ticks = low_speed_ticks.saturating_add(1);
                        if low_speed_ticks >= STALL_WINDOW_SECS {
                            return Err(HttpError::DownloadStalled);
                        }
                    } else {
                        low_speed_ticks = 0;
                    }
                }
            }
        }

        file.flush()
            .await
            .map_err(|source| HttpError::WriteDestination {
                path: path_display,
                source,
            })?;

        if downloaded != expected_size {
            tracing::debug!(
                downloaded,
                expected_size,
                "downloaded byte count differs from the artifact's advertised size"
            );
        }

        let elapsed = started_at.elapsed().as_secs_f64().max(f64::EPSILON);
        #[allow(clippy::cast_precision_loss)]
        let bytes_per_second = downloaded as f64 / elapsed;
        let sha1_hex = hasher
            .finalize()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<String>();

        Ok(DownloadOutcome {
            sha1_hex,
            bytes_per_second,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &str) -> AgentConfig {
        let url = url::Url::parse(server).expect("valid test server url");
        AgentConfig {
            server: url
                .host_str()
                .map(|host| match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_owned(),
                })
                .unwrap_or_default(),
            tenant: "DEFAULT".to_owned(),
            controller_id: "device-1".to_owned(),
            auth: AuthToken::Target("secret".to_owned()),
            ssl: false,
            tls_verify: true,
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(5),
            retry_wait_sec: 5,
            bundle_path: PathBuf::from("/tmp/hawkbit-agent-test-bundle"),
            reboot_after_install: false,
            device_attributes: BTreeMap::new(),
            install_command: None,
            run_once: false,
            systemd_notify: false,
        }
    }

    #[tokio::test]
    async fn rest_sends_target_token_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/probe"))
            .and(wiremock::matchers::header(
                "authorization",
                "TargetToken secret",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let transport = Transport::new(&config(&server.uri())).expect("transport builds");
        let result = transport
            .rest::<()>(Method::GET, &format!("{}/probe", server.uri()), None)
            .await
            .expect("request succeeds");
        assert_eq!(result, Some(serde_json::json!({"ok": true})));
    }

    #[tokio::test]
    async fn rest_returns_none_for_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/configData"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let transport = Transport::new(&config(&server.uri())).expect("transport builds");
        let result = transport
            .rest(
                Method::PUT,
                &format!("{}/configData", server.uri()),
                Some(&serde_json::json!({"id": "1"})),
            )
            .await
            .expect("request succeeds");
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn rest_surfaces_non_200_as_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/denied"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let transport = Transport::new(&config(&server.uri())).expect("transport builds");
        let err = transport
            .rest::<()>(Method::GET, &format!("{}/denied", server.uri()), None)
            .await
            .expect_err("401 should be an error");
        assert!(matches!(err, HttpError::UnexpectedStatus { status: 401, .. }));
    }

    #[tokio::test]
    async fn download_hashes_and_writes_body_to_disk() {
        let server = MockServer::start().await;
        let payload = vec![0_u8; 1024];
        Mock::given(method("GET"))
            .and(path("/bundle"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
            .mount(&server)
            .await;

        let dir = tempdir().expect("tempdir");
        let dest = dir.path().join("bundle.bin");
        let transport = Transport::new(&config(&server.uri())).expect("transport builds");
        let outcome = transport
            .download(&format!("{}/bundle", server.uri()), &dest, 1024)
            .await
            .expect("download succeeds");

        assert_eq!(outcome.sha1_hex, "60cacbf3d72e1e7834203da608037b1bf83b40e8");
        let written = std::fs::read(&dest).expect("file written");
        assert_eq!(written, payload);
    }
}
