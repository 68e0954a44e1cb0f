//! Shared scaffolding for the scenario tests: builds an `AgentConfig`
//! pointed at a local `wiremock` server and a `SessionContext` wired to a
//! `FakeInstaller`, mirroring the teacher's `tests/support_*.rs` helpers.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hawkbit_agent::config::{AgentConfig, AuthToken};
use hawkbit_agent::http::Transport;
use hawkbit_agent::installer::{FakeInstaller, Installer};
use hawkbit_agent::session::{InstallerBridge, SessionContext};

#[allow(dead_code)]
pub fn test_config(server_uri: &str, bundle_path: PathBuf) -> AgentConfig {
    let url = url::Url::parse(server_uri).expect("valid mock server url");
    let server = match url.port() {
        Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
        None => url.host_str().unwrap_or_default().to_owned(),
    };

    AgentConfig {
        server,
        tenant: "DEFAULT".to_owned(),
        controller_id: "device-1".to_owned(),
        auth: AuthToken::Target("secret".to_owned()),
        ssl: false,
        tls_verify: true,
        connect_timeout: Duration::from_secs(5),
        timeout: Duration::from_secs(5),
        retry_wait_sec: 5,
        bundle_path,
        reboot_after_install: false,
        device_attributes: BTreeMap::new(),
        install_command: None,
        run_once: false,
        systemd_notify: false,
    }
}

#[allow(dead_code)]
pub fn test_context(config: AgentConfig, installer: FakeInstaller) -> SessionContext {
    let transport = Transport::new(&config).expect("transport builds");
    let installer: Arc<dyn Installer> = Arc::new(installer);
    let (bridge, _events_rx) = InstallerBridge::new();
    SessionContext::new(Arc::new(config), transport, installer, bridge)
}
