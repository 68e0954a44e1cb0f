use crate::args::AgentArgs;
use crate::error::ServiceError;

/// Matched by `session::poller::WATCHDOG_PING_SEC`, which pings `sd_notify`
/// well inside this interval whenever `--systemd-notify` is set.
#[cfg(target_os = "linux")]
const WATCHDOG_SEC: u64 = 60;

#[cfg(target_os = "linux")]
/// Handles `--install-service`/`--uninstall-service` requests.
///
/// # Errors
///
/// Returns an error if the service operation fails or the arguments conflict.
pub fn handle_service_action(args: &AgentArgs) -> Result<(), ServiceError> {
    if args.install_service && args.uninstall_service {
        return Err(ServiceError::ConflictingServiceAction);
    }
    if args.install_service {
        return install_service(args);
    }
    if args.uninstall_service {
        return uninstall_service(args);
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
/// Handles `--install-service`/`--uninstall-service` requests.
///
/// # Errors
///
/// Returns an error when service actions are requested on non-Linux targets.
pub fn handle_service_action(args: &AgentArgs) -> Result<(), ServiceError> {
    if args.install_service || args.uninstall_service {
        return Err(ServiceError::UnsupportedPlatform);
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn install_service(args: &AgentArgs) -> Result<(), ServiceError> {
    let service_name = resolve_service_name(args)?;
    let unit_path = format!("/etc/systemd/system/{}.service", service_name);
    let exec_args = build_exec_args();
    let exec_start = build_exec_start(&exec_args)?;
    let working_dir =
        std::env::current_dir().map_err(|source| ServiceError::WorkingDirectory { source })?;
    let working_dir = working_dir
        .to_str()
        .ok_or(ServiceError::WorkingDirectoryNotUtf8)?;

    // WatchdogSec is only meaningful if the agent actually pings sd_notify,
    // which it only does under --systemd-notify (session::poller pings every
    // WATCHDOG_PING_SEC while that flag is set). Omit it otherwise so an
    // agent that never pings isn't restarted by systemd every WatchdogSec.
    let watchdog_line = if args.systemd_notify {
        format!("WatchdogSec={}\n", WATCHDOG_SEC)
    } else {
        String::new()
    };

    let unit_contents = format!(
        "[Unit]\nDescription=hawkBit update agent\nAfter=network-online.target\nWants=network-online.target\n\n[Service]\nType=notify\nWorkingDirectory={}\nExecStart={}\nRestart=on-failure\nRestartSec=2\nKillSignal=SIGTERM\nTimeoutStopSec=30\n{}\n[Install]\nWantedBy=multi-user.target\n",
        working_dir, exec_start, watchdog_line,
    );

    std::fs::write(&unit_path, unit_contents).map_err(|source| ServiceError::WriteUnit {
        path: unit_path.clone(),
        source,
    })?;

    run_systemctl(&["daemon-reload"])?;
    run_systemctl(&["enable", "--now", &format!("{}.service", service_name)])?;

    Ok(())
}

#[cfg(target_os = "linux")]
fn uninstall_service(args: &AgentArgs) -> Result<(), ServiceError> {
    let service_name = resolve_service_name(args)?;
    let unit_path = format!("/etc/systemd/system/{}.service", service_name);

    if let Err(err) = run_systemctl(&["disable", "--now", &format!("{}.service", service_name)]) {
        tracing::warn!(%err, "failed to disable service");
    }
    if std::fs::metadata(&unit_path).is_ok() {
        std::fs::remove_file(&unit_path).map_err(|source| ServiceError::RemoveUnit {
            path: unit_path.clone(),
            source,
        })?;
    }
    run_systemctl(&["daemon-reload"])?;

    Ok(())
}

/// Defaults to `hawkbit-agent` when `--service-name` was not given at all;
/// an explicitly-passed but blank (or all-`.service`) name is rejected
/// rather than silently substituting the default.
#[cfg(target_os = "linux")]
fn resolve_service_name(args: &AgentArgs) -> Result<String, ServiceError> {
    let Some(raw) = args.service_name.as_deref() else {
        return Ok("hawkbit-agent".to_owned());
    };
    let name = raw.trim().trim_end_matches(".service");
    if name.is_empty() {
        return Err(ServiceError::EmptyServiceName);
    }
    Ok(name.to_owned())
}

#[cfg(target_os = "linux")]
fn build_exec_args() -> Vec<String> {
    let mut filtered = Vec::new();
    let mut skip_next = false;
    for arg in std::env::args().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--install-service" || arg == "--uninstall-service" {
            continue;
        }
        if arg == "--service-name" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--service-name=") {
            continue;
        }
        filtered.push(arg);
    }
    filtered
}

#[cfg(target_os = "linux")]
fn build_exec_start(args: &[String]) -> Result<String, ServiceError> {
    let exe =
        std::env::current_exe().map_err(|source| ServiceError::ExecutablePath { source })?;
    let exe = exe.to_str().ok_or(ServiceError::ExecutablePathNotUtf8)?;
    let mut parts = Vec::new();
    parts.push(escape_systemd_arg(exe));
    for arg in args {
        parts.push(escape_systemd_arg(arg));
    }
    Ok(parts.join(" "))
}

#[cfg(target_os = "linux")]
fn escape_systemd_arg(arg: &str) -> String {
    if arg
        .chars()
        .all(|ch| !ch.is_whitespace() && ch != '"' && ch != '\\')
    {
        return arg.to_owned();
    }
    let mut escaped = String::with_capacity(arg.len().saturating_add(2));
    escaped.push('"');
    for ch in arg.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(ch),
        }
    }
    escaped.push('"');
    escaped
}

#[cfg(target_os = "linux")]
fn run_systemctl(args: &[&str]) -> Result<(), ServiceError> {
    let status = std::process::Command::new("systemctl")
        .args(args)
        .status()
        .map_err(|source| ServiceError::RunSystemctl {
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(ServiceError::SystemctlFailed {
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            status: status.to_string(),
        })
    }
}
