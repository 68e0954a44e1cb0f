use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::args::AgentArgs;
use crate::error::ConfigError;

use super::types::{AgentConfig, AuthToken, ConfigFile};

const DEFAULT_CONNECT_TIMEOUT_SEC: u64 = 10;
const DEFAULT_TIMEOUT_SEC: u64 = 60;
const DEFAULT_RETRY_WAIT_SEC: u64 = 60;
const DEFAULT_BUNDLE_PATH: &str = "/tmp/hawkbit-bundle";

/// Layers CLI flags over an optional config file to produce a resolved,
/// validated `AgentConfig`. CLI values that were explicitly set always win;
/// otherwise the file's value is used; otherwise a built-in default.
///
/// # Errors
///
/// Returns an error if required fields are missing, tokens conflict, or a
/// numeric field fails validation.
pub fn build_config(args: &AgentArgs, file: Option<&ConfigFile>) -> Result<AgentConfig, ConfigError> {
    let server = args
        .server
        .clone()
        .or_else(|| file.and_then(|file| file.server.clone()))
        .ok_or(ConfigError::MissingField { field: "server" })?;

    let tenant = args
        .tenant
        .clone()
        .or_else(|| file.and_then(|file| file.tenant.clone()))
        .ok_or(ConfigError::MissingField { field: "tenant" })?;

    let controller_id = args
        .controller_id
        .clone()
        .or_else(|| file.and_then(|file| file.controller_id.clone()))
        .ok_or(ConfigError::MissingField {
            field: "controller_id",
        })?;
    if controller_id.trim().is_empty() {
        return Err(ConfigError::EmptyControllerId);
    }

    let target_token = args
        .target_token
        .clone()
        .or_else(|| file.and_then(|file| file.target_token.clone()));
    let gateway_token = args
        .gateway_token
        .clone()
        .or_else(|| file.and_then(|file| file.gateway_token.clone()));
    let auth = match (target_token, gateway_token) {
        (Some(target), _) => AuthToken::Target(target),
        (None, Some(gateway)) => AuthToken::Gateway(gateway),
        (None, None) => AuthToken::None,
    };

    let ssl = args.ssl || file.and_then(|file| file.ssl).unwrap_or(false);
    let tls_verify = !(args.no_tls_verify || file.and_then(|file| file.no_tls_verify).unwrap_or(false));

    let connect_timeout_sec = args
        .connect_timeout
        .or_else(|| file.and_then(|file| file.connect_timeout))
        .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SEC);
    let timeout_sec = args
        .timeout
        .or_else(|| file.and_then(|file| file.timeout))
        .unwrap_or(DEFAULT_TIMEOUT_SEC);
    if connect_timeout_sec == 0 || timeout_sec == 0 {
        return Err(ConfigError::NonPositiveTimeout);
    }

    let retry_wait_sec = args
        .retry_wait
        .or_else(|| file.and_then(|file| file.retry_wait))
        .unwrap_or(DEFAULT_RETRY_WAIT_SEC);

    let bundle_path = args
        .bundle_path
        .clone()
        .or_else(|| file.and_then(|file| file.bundle_path.clone()))
        .unwrap_or_else(|| DEFAULT_BUNDLE_PATH.to_owned());

    let reboot_after_install = args.reboot_after_install
        || file.and_then(|file| file.reboot_after_install).unwrap_or(false);

    let mut device_attributes: BTreeMap<String, String> = file
        .and_then(|file| file.device_attributes.clone())
        .unwrap_or_default();
    for (key, value) in &args.device_attributes {
        device_attributes.insert(key.clone(), value.clone());
    }

    let install_command = args
        .install_command
        .clone()
        .or_else(|| file.and_then(|file| file.install_command.clone()));

    let run_once = args.run_once || file.and_then(|file| file.run_once).unwrap_or(false);
    let systemd_notify =
        args.systemd_notify || file.and_then(|file| file.systemd_notify).unwrap_or(false);

    Ok(AgentConfig {
        server,
        tenant,
        controller_id,
        auth,
        ssl,
        tls_verify,
        connect_timeout: Duration::from_secs(connect_timeout_sec),
        timeout: Duration::from_secs(timeout_sec),
        retry_wait_sec,
        bundle_path: PathBuf::from(bundle_path),
        reboot_after_install,
        device_attributes,
        install_command,
        run_once,
        systemd_notify,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> AgentArgs {
        AgentArgs {
            server: Some("hawkbit.example.com".to_owned()),
            tenant: Some("DEFAULT".to_owned()),
            controller_id: Some("device-1".to_owned()),
            target_token: None,
            gateway_token: None,
            ssl: false,
            no_tls_verify: false,
            connect_timeout: None,
            timeout: None,
            retry_wait: None,
            bundle_path: None,
            reboot_after_install: false,
            device_attributes: Vec::new(),
            install_command: None,
            run_once: false,
            systemd_notify: false,
            config: None,
            verbose: false,
            install_service: false,
            uninstall_service: false,
            service_name: None,
        }
    }

    #[test]
    fn target_token_wins_over_gateway_token() {
        let mut args = base_args();
        args.target_token = Some("tgt".to_owned());
        args.gateway_token = Some("gw".to_owned());
        let config = build_config(&args, None).expect("valid config");
        assert_eq!(config.auth, AuthToken::Target("tgt".to_owned()));
    }

    #[test]
    fn missing_server_is_an_error() {
        let mut args = base_args();
        args.server = None;
        assert!(build_config(&args, None).is_err());
    }

    #[test]
    fn cli_device_attribute_overrides_file() {
        let mut args = base_args();
        args.device_attributes = vec![("hw".to_owned(), "v2".to_owned())];
        let mut file = ConfigFile::default();
        let mut attrs = BTreeMap::new();
        attrs.insert("hw".to_owned(), "v1".to_owned());
        attrs.insert("sw".to_owned(), "1.0".to_owned());
        file.device_attributes = Some(attrs);
        let config = build_config(&args, Some(&file)).expect("valid config");
        assert_eq!(config.device_attributes.get("hw").map(String::as_str), Some("v2"));
        assert_eq!(config.device_attributes.get("sw").map(String::as_str), Some("1.0"));
    }

    #[test]
    fn empty_controller_id_is_rejected() {
        let mut args = base_args();
        args.controller_id = Some("   ".to_owned());
        assert!(matches!(
            build_config(&args, None),
            Err(ConfigError::EmptyControllerId)
        ));
    }
}
