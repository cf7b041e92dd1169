use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("command timed out after {timeout_secs}s: {cmd}")]
    Timeout { cmd: String, timeout_secs: u64 },
    #[error("failed to execute command {cmd}: {source}")]
    Io { cmd: String, source: std::io::Error },
    #[error("command exited with status {status}: {stderr}")]
    CommandFailed { status: i32, stderr: String },
    #[error("container {target} not running after {action}")]
    NotRunning { target: String, action: String },
}

/// Container lifecycle operations used by remediation. Every call takes an
/// explicit timeout so a wedged runtime cannot stall the monitor loop.
pub trait LifecycleProvider {
    async fn restart_container(&self, target: &str, timeout_secs: u64)
    -> Result<(), LifecycleError>;
    async fn start_container(&self, target: &str, timeout_secs: u64) -> Result<(), LifecycleError>;
    async fn stop_container(&self, target: &str, timeout_secs: u64) -> Result<(), LifecycleError>;
}

pub enum ActiveLifecycleProvider {
    Docker(DockerCliProvider),
    Simulated(SimulatedLifecycleProvider),
    #[cfg(test)]
    Mock(MockLifecycleProvider),
}

impl ActiveLifecycleProvider {
    pub fn new(simulation_enabled: bool) -> Self {
        if simulation_enabled {
            Self::Simulated(SimulatedLifecycleProvider::new())
        } else {
            Self::Docker(DockerCliProvider)
        }
    }
}

impl LifecycleProvider for ActiveLifecycleProvider {
    async fn restart_container(
        &self,
        target: &str,
        timeout_secs: u64,
    ) -> Result<(), LifecycleError> {
        match self {
            Self::Docker(provider) => provider.restart_container(target, timeout_secs).await,
            Self::Simulated(provider) => provider.restart_container(target, timeout_secs).await,
            #[cfg(test)]
            Self::Mock(provider) => provider.restart_container(target, timeout_secs).await,
        }
    }

    async fn start_container(&self, target: &str, timeout_secs: u64) -> Result<(), LifecycleError> {
        match self {
            Self::Docker(provider) => provider.start_container(target, timeout_secs).await,
            Self::Simulated(provider) => provider.start_container(target, timeout_secs).await,
            #[cfg(test)]
            Self::Mock(provider) => provider.start_container(target, timeout_secs).await,
        }
    }

    async fn stop_container(&self, target: &str, timeout_secs: u64) -> Result<(), LifecycleError> {
        match self {
            Self::Docker(provider) => provider.stop_container(target, timeout_secs).await,
            Self::Simulated(provider) => provider.stop_container(target, timeout_secs).await,
            #[cfg(test)]
            Self::Mock(provider) => provider.stop_container(target, timeout_secs).await,
        }
    }
}

/// Drives containers through the `docker` CLI.
pub struct DockerCliProvider;

impl DockerCliProvider {
    async fn verify_running(&self, target: &str, action: &str) -> Result<(), LifecycleError> {
        let output = run_cmd(
            "docker",
            &["inspect", "-f", "{{.State.Running}}", target],
            5,
        )
        .await?;
        if output.status != 0 || output.stdout.trim() != "true" {
            return Err(LifecycleError::NotRunning {
                target: target.to_string(),
                action: action.to_string(),
            });
        }
        Ok(())
    }
}

impl LifecycleProvider for DockerCliProvider {
    async fn restart_container(
        &self,
        target: &str,
        timeout_secs: u64,
    ) -> Result<(), LifecycleError> {
        // Leave docker a few seconds less than our own deadline for the
        // in-container stop grace period.
        let grace = timeout_secs.saturating_sub(2).max(1).to_string();
        let output = run_cmd("docker", &["restart", "-t", &grace, target], timeout_secs).await?;
        if output.status != 0 {
            return Err(LifecycleError::CommandFailed {
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        self.verify_running(target, "restart").await
    }

    async fn start_container(&self, target: &str, timeout_secs: u64) -> Result<(), LifecycleError> {
        let output = run_cmd("docker", &["start", target], timeout_secs).await?;
        if output.status != 0 {
            return Err(LifecycleError::CommandFailed {
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        self.verify_running(target, "start").await
    }

    async fn stop_container(&self, target: &str, timeout_secs: u64) -> Result<(), LifecycleError> {
        let output = run_cmd("docker", &["stop", target], timeout_secs).await?;
        if output.status != 0 {
            return Err(LifecycleError::CommandFailed {
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
struct CommandOutput {
    stdout: String,
    stderr: String,
    status: i32,
}

async fn run_cmd(
    cmd: &str,
    args: &[&str],
    timeout_secs: u64,
) -> Result<CommandOutput, LifecycleError> {
    let mut child = Command::new(cmd);
    // Reap the process if the deadline fires while it is still running.
    child.args(args).kill_on_drop(true);

    let output = timeout(Duration::from_secs(timeout_secs), child.output())
        .await
        .map_err(|_| LifecycleError::Timeout {
            cmd: format!("{} {}", cmd, args.join(" ")),
            timeout_secs,
        })?
        .map_err(|source| LifecycleError::Io {
            cmd: cmd.to_string(),
            source,
        })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        status: output.status.code().unwrap_or(-1),
    })
}

/// No-op lifecycle for simulation mode: every action "succeeds" after a short
/// pause, so the incident and breaker machinery can be exercised end to end.
pub struct SimulatedLifecycleProvider {
    actions: AtomicU64,
}

impl SimulatedLifecycleProvider {
    pub fn new() -> Self {
        Self {
            actions: AtomicU64::new(0),
        }
    }

    async fn simulate(&self, action: &str, target: &str) -> Result<(), LifecycleError> {
        let count = self.actions.fetch_add(1, Ordering::Relaxed) + 1;
        tokio::time::sleep(Duration::from_millis(50)).await;
        log::info!(
            "simulated_lifecycle action={} target={} total_actions={}",
            action,
            target,
            count
        );
        Ok(())
    }
}

impl LifecycleProvider for SimulatedLifecycleProvider {
    async fn restart_container(
        &self,
        target: &str,
        _timeout_secs: u64,
    ) -> Result<(), LifecycleError> {
        self.simulate("restart", target).await
    }

    async fn start_container(
        &self,
        target: &str,
        _timeout_secs: u64,
    ) -> Result<(), LifecycleError> {
        self.simulate("start", target).await
    }

    async fn stop_container(&self, target: &str, _timeout_secs: u64) -> Result<(), LifecycleError> {
        self.simulate("stop", target).await
    }
}


#[cfg(test)]
pub(crate) enum MockStep {
    Succeed,
    Fail(&'static str),
    /// Sleeps well past any test timeout; the executor deadline must fire.
    Hang,
}

#[cfg(test)]
pub(crate) struct MockLifecycleProvider {
    steps: std::sync::Mutex<Vec<MockStep>>,
    calls: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MockLifecycleProvider {
    pub(crate) fn new(steps: Vec<MockStep>) -> Self {
        Self {
            steps: std::sync::Mutex::new(steps),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("mock calls lock").clone()
    }

    async fn apply(&self, action: &str, target: &str) -> Result<(), LifecycleError> {
        self.calls
            .lock()
            .expect("mock calls lock")
            .push((action.to_string(), target.to_string()));
        let step = {
            let mut steps = self.steps.lock().expect("mock steps lock");
            if steps.is_empty() {
                MockStep::Succeed
            } else {
                steps.remove(0)
            }
        };
        match step {
            MockStep::Succeed => Ok(()),
            MockStep::Fail(message) => Err(LifecycleError::CommandFailed {
                status: 1,
                stderr: message.to_string(),
            }),
            MockStep::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
impl LifecycleProvider for MockLifecycleProvider {
    async fn restart_container(
        &self,
        target: &str,
        _timeout_secs: u64,
    ) -> Result<(), LifecycleError> {
        self.apply("restart", target).await
    }

    async fn start_container(
        &self,
        target: &str,
        _timeout_secs: u64,
    ) -> Result<(), LifecycleError> {
        self.apply("start", target).await
    }

    async fn stop_container(&self, target: &str, _timeout_secs: u64) -> Result<(), LifecycleError> {
        self.apply("stop", target).await
    }
}
