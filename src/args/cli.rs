use clap::Parser;

use super::parsers::parse_device_attribute;

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Device-side update agent for the hawkBit Direct Device Integration protocol."
)]
pub struct AgentArgs {
    /// hawkBit server host (and optional port), e.g. hawkbit.example.com:8080
    #[arg(long)]
    pub server: Option<String>,

    /// Tenant ID
    #[arg(long)]
    pub tenant: Option<String>,

    /// Controller ID this device identifies as
    #[arg(long = "controller-id")]
    pub controller_id: Option<String>,

    /// Target security token (mutually exclusive with --gateway-token)
    #[arg(long = "target-token")]
    pub target_token: Option<String>,

    /// Gateway security token (mutually exclusive with --target-token)
    #[arg(long = "gateway-token")]
    pub gateway_token: Option<String>,

    /// Use HTTPS for all requests to the server
    #[arg(long)]
    pub ssl: bool,

    /// Disable TLS certificate/hostname verification (insecure, for test servers only)
    #[arg(long = "no-tls-verify")]
    pub no_tls_verify: bool,

    /// Connect timeout in seconds
    #[arg(long = "connect-timeout")]
    pub connect_timeout: Option<u64>,

    /// Total request timeout in seconds
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Seconds to wait between polls when the server has not advertised a sleep interval
    #[arg(long = "retry-wait")]
    pub retry_wait: Option<u64>,

    /// Path where the downloaded bundle is stored
    #[arg(long = "bundle-path")]
    pub bundle_path: Option<String>,

    /// Reboot the device after a successful install
    #[arg(long = "reboot-after-install")]
    pub reboot_after_install: bool,

    /// Device identity attribute in KEY=VALUE form, sent during identify (repeatable)
    #[arg(long = "device-attribute", value_parser = parse_device_attribute)]
    pub device_attributes: Vec<(String, String)>,

    /// Shell command template run against the downloaded bundle; `{path}` is substituted
    #[arg(long = "install-command")]
    pub install_command: Option<String>,

    /// Poll once, run at most one deployment to completion, then exit
    #[arg(long = "run-once")]
    pub run_once: bool,

    /// Send systemd readiness/watchdog notifications (no-op outside systemd)
    #[arg(long = "systemd-notify")]
    pub systemd_notify: bool,

    /// Path to config file (TOML/JSON). Defaults to ./hawkbit-agent.toml or ./hawkbit-agent.json if present.
    #[arg(long)]
    pub config: Option<String>,

    /// Enable verbose logging (sets log level to debug unless overridden by HAWKBIT_AGENT_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Install the agent as a system service (Linux only)
    #[arg(long = "install-service")]
    pub install_service: bool,

    /// Uninstall the agent system service (Linux only)
    #[arg(long = "uninstall-service")]
    pub uninstall_service: bool,

    /// Override system service name (Linux only)
    #[arg(long = "service-name")]
    pub service_name: Option<String>,
}
