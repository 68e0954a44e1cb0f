use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Raw, all-optional view of a TOML/JSON config file. Every field mirrors a
/// CLI flag on `AgentArgs`; a value set on the CLI always wins over the
/// value loaded from the file (see `config::apply::build_config`).
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub server: Option<String>,
    pub tenant: Option<String>,
    pub controller_id: Option<String>,
    pub target_token: Option<String>,
    pub gateway_token: Option<String>,
    pub ssl: Option<bool>,
    pub no_tls_verify: Option<bool>,
    pub connect_timeout: Option<u64>,
    pub timeout: Option<u64>,
    pub retry_wait: Option<u64>,
    pub bundle_path: Option<String>,
    pub reboot_after_install: Option<bool>,
    pub device_attributes: Option<BTreeMap<String, String>>,
    pub install_command: Option<String>,
    pub run_once: Option<bool>,
    pub systemd_notify: Option<bool>,
}

/// Resolved, validated configuration used throughout the agent. Built once
/// at startup by layering a `ConfigFile` under an `AgentArgs` CLI parse.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub server: String,
    pub tenant: String,
    pub controller_id: String,
    pub auth: AuthToken,
    pub ssl: bool,
    pub tls_verify: bool,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub retry_wait_sec: u64,
    pub bundle_path: PathBuf,
    pub reboot_after_install: bool,
    pub device_attributes: BTreeMap<String, String>,
    pub install_command: Option<String>,
    pub run_once: bool,
    pub systemd_notify: bool,
}

/// At most one of a target token or a gateway token is ever configured;
/// target takes precedence when both are present on the CLI and file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthToken {
    Target(String),
    Gateway(String),
    None,
}

impl AgentConfig {
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!(
            "{}://{}/{}/controller/v1/{}",
            scheme, self.server, self.tenant, self.controller_id
        )
    }
}
