use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};

use hawkbit_agent::args::AgentArgs;
use hawkbit_agent::config;
use hawkbit_agent::error::{AppResult, ConfigError};
use hawkbit_agent::http::Transport;
use hawkbit_agent::installer::{CommandInstaller, Installer};
use hawkbit_agent::session::{self, InstallerBridge, PollLoopOutcome, SessionContext};
use hawkbit_agent::{logger, service, shutdown, system};

fn main() -> AppResult<ExitCode> {
    let mut cmd = AgentArgs::command();
    let raw_args: Vec<std::ffi::OsString> = std::env::args_os().collect();
    let treat_as_empty = raw_args.len() <= 1
        || (raw_args.len() == 2 && raw_args.get(1).map(|arg| arg == "--").unwrap_or(false));
    if treat_as_empty {
        let has_default_config =
            Path::new("hawkbit-agent.toml").exists() || Path::new("hawkbit-agent.json").exists();
        if !has_default_config {
            cmd.print_help()?;
            println!();
            return Ok(ExitCode::SUCCESS);
        }
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = AgentArgs::from_arg_matches(&matches)?;

    logger::init_logging(args.verbose);

    if args.install_service || args.uninstall_service {
        service::handle_service_action(&args)?;
        return Ok(ExitCode::SUCCESS);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(run(args))
}

async fn run(args: AgentArgs) -> AppResult<ExitCode> {
    let file = config::load_config(args.config.as_deref())?;
    let config = config::build_config(&args, file.as_ref())?;
    let config = Arc::new(config);

    session::cleanup_stale_bundle(&config.bundle_path);

    let transport = Transport::new(&config)?;

    let install_command = config.install_command.clone().ok_or(ConfigError::MissingField {
        field: "install_command",
    })?;
    let installer: Arc<dyn Installer> = Arc::new(CommandInstaller::new(install_command));

    let (bridge, events_rx) = InstallerBridge::new();
    let ctx = SessionContext::new(Arc::clone(&config), transport, installer, bridge);

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<u16>(1);
    let shutdown_handle = shutdown::setup_signal_shutdown_handler(&shutdown_tx);
    let shutdown_rx = shutdown_tx.subscribe();

    system::notify::notify_ready(config.systemd_notify);

    let outcome = session::run_poll_loop(ctx, events_rx, shutdown_rx).await;

    system::notify::notify_stopping(config.systemd_notify);
    shutdown_handle.abort();

    Ok(match outcome {
        PollLoopOutcome::Success => ExitCode::SUCCESS,
        PollLoopOutcome::Failure => ExitCode::FAILURE,
    })
}
