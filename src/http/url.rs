use crate::config::AgentConfig;

/// Builds `{base}[/suffix]` against the controller's DDI root. `suffix`, when
/// given, is appended with a single `/` separator (e.g. `"configData"`,
/// `"deploymentBase/42/feedback"`).
#[must_use]
pub fn api_url(config: &AgentConfig, suffix: Option<&str>) -> String {
    let base = config.base_url();
    match suffix {
        Some(suffix) => format!("{}/{}", base, suffix),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentConfig, AuthToken};
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config() -> AgentConfig {
        AgentConfig {
            server: "hawkbit.example.com".to_owned(),
            tenant: "DEFAULT".to_owned(),
            controller_id: "device-1".to_owned(),
            auth: AuthToken::None,
            ssl: true,
            tls_verify: true,
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
            retry_wait_sec: 60,
            bundle_path: PathBuf::from("/tmp/bundle"),
            reboot_after_install: false,
            device_attributes: BTreeMap::new(),
            install_command: None,
            run_once: false,
            systemd_notify: false,
        }
    }

    #[test]
    fn builds_base_url() {
        assert_eq!(
            api_url(&config(), None),
            "https://hawkbit.example.com/DEFAULT/controller/v1/device-1"
        );
    }

    #[test]
    fn appends_suffix() {
        assert_eq!(
            api_url(&config(), Some("configData")),
            "https://hawkbit.example.com/DEFAULT/controller/v1/device-1/configData"
        );
    }

    #[test]
    fn uses_plain_http_without_ssl() {
        let mut config = config();
        config.ssl = false;
        assert!(api_url(&config, None).starts_with("http://"));
    }
}
