use std::process::Stdio;
use std::time::Duration;

use log::{info, warn};
use sqlharbor_core::{ToolsNotification, ToolsServiceConfig};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::{RpcClient, RpcError};

/// How long a freshly spawned service must stay alive before we talk to it.
const SETTLE_DELAY: Duration = Duration::from_millis(75);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The spawned tools service. Killed when dropped.
pub struct ToolsServiceProcess {
    program: String,
    child: Child,
}

impl ToolsServiceProcess {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub async fn shutdown(mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                info!(
                    "Tools service '{}' already exited before shutdown ({})",
                    self.program, status
                );
                return;
            }
            Ok(None) => {}
            Err(error) => {
                warn!("Failed to inspect tools service '{}': {}", self.program, error);
            }
        }

        if let Err(error) = self.child.start_kill() {
            warn!("Failed to kill tools service '{}': {}", self.program, error);
            return;
        }

        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => info!("Tools service '{}' stopped ({})", self.program, status),
            Ok(Err(error)) => warn!(
                "Failed to wait for tools service '{}' after kill: {}",
                self.program, error
            ),
            Err(_) => warn!("Tools service '{}' did not exit in time", self.program),
        }
    }
}

/// Spawns the configured tools service and connects a client to its stdio.
///
/// Each request waits at most `startup_timeout` for its acknowledgement.
pub async fn launch(
    config: &ToolsServiceConfig,
) -> Result<
    (
        ToolsServiceProcess,
        RpcClient,
        mpsc::UnboundedReceiver<ToolsNotification>,
    ),
    RpcError,
> {
    let program = config
        .command
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            RpcError::ConnectionFailed("No tools service command configured".into())
        })?;

    let mut command = Command::new(program);
    command
        .args(&config.args)
        .envs(config.env.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| {
        RpcError::ConnectionFailed(format!("Failed to start tools service '{}': {}", program, e))
    })?;

    info!(
        "Started tools service '{}' (pid={:?})",
        program,
        child.id()
    );

    tokio::time::sleep(SETTLE_DELAY).await;
    if let Some(status) = child.try_wait()? {
        return Err(RpcError::ConnectionFailed(format!(
            "Tools service '{}' exited during startup ({})",
            program, status
        )));
    }

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| RpcError::ConnectionFailed("Tools service stdin unavailable".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RpcError::ConnectionFailed("Tools service stdout unavailable".into()))?;

    let (client, notifications) = RpcClient::new(stdout, stdin, config.startup_timeout());

    let process = ToolsServiceProcess {
        program: program.to_string(),
        child,
    };

    Ok((process, client, notifications))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_command_is_rejected() {
        let config = ToolsServiceConfig::default();
        let err = launch(&config).await.err().expect("launch should fail");
        assert!(matches!(err, RpcError::ConnectionFailed(_)));

        let blank = ToolsServiceConfig {
            command: Some("   ".to_string()),
            ..ToolsServiceConfig::default()
        };
        assert!(launch(&blank).await.is_err());
    }

    #[tokio::test]
    async fn unknown_program_fails_to_start() {
        let config = ToolsServiceConfig {
            command: Some("sqlharbor-no-such-tools-service".to_string()),
            ..ToolsServiceConfig::default()
        };

        match launch(&config).await {
            Err(RpcError::ConnectionFailed(message)) => {
                assert!(message.contains("Failed to start"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("launch should fail"),
        }
    }
}
