use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::{InstallHandle, Installer};

/// Reference installer: runs `config.install_command` — a shell
/// command template with `{path}` substituted for the bundle path — as a
/// child process, forwards its stdout lines as progress, and maps its exit
/// status to `complete(success)`.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    template: String,
}

impl CommandInstaller {
    #[must_use]
    pub fn new(template: String) -> Self {
        Self { template }
    }

    fn command_line(&self, bundle_path: &Path) -> String {
        let path = bundle_path.display().to_string();
        if self.template.contains("{path}") {
            self.template.replace("{path}", &path)
        } else {
            format!("{} {}", self.template, path)
        }
    }
}

#[async_trait]
impl Installer for CommandInstaller {
    async fn install(&self, handle: InstallHandle) {
        let command_line = self.command_line(&handle.bundle_path);
        tracing::info!(command = %command_line, "running installer command");

        let mut child = match Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(%err, "failed to spawn installer command");
                handle.complete(false);
                return;
            }
        };

        if let Some(stdout) = child.stdout.take() {
            let progress_handle = handle.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    progress_handle.progress(line);
                }
            });
        }

        let status = match child.wait().await {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(%err, "failed to wait on installer command");
                handle.complete(false);
                return;
            }
        };

        if !status.success() {
            tracing::warn!(?status, "installer command exited with a non-zero status");
        }
        handle.complete(status.success());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn substitutes_path_placeholder() {
        let installer = CommandInstaller::new("/usr/bin/install-bundle --file {path}".to_owned());
        let line = installer.command_line(&PathBuf::from("/tmp/bundle.bin"));
        assert_eq!(line, "/usr/bin/install-bundle --file /tmp/bundle.bin");
    }

    #[test]
    fn appends_path_without_placeholder() {
        let installer = CommandInstaller::new("/usr/bin/install-bundle".to_owned());
        let line = installer.command_line(&PathBuf::from("/tmp/bundle.bin"));
        assert_eq!(line, "/usr/bin/install-bundle /tmp/bundle.bin");
    }
}
