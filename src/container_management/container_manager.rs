use log::{debug, error, info, warn};
use std::time::Duration;

use crate::configuration::Config;
use crate::container_management::runtime::ContainerRuntime;
use crate::container_management::types::{
    ContainerRecord, ContainerState, Outcome, Report, RunSpec, StatusReport, Verb,
};
use crate::error_handling::types::{LifecycleError, RuntimeError};

/// How long to wait for a freshly started container to report running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl SettlePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.settle_secs),
            interval: Duration::from_secs(1),
        }
    }

    /// Number of checks to perform; never less than one.
    pub fn attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let n = self.timeout.as_millis().div_ceil(self.interval.as_millis());
        u32::try_from(n).unwrap_or(u32::MAX).max(1)
    }
}

/// Drives the single named database container towards the state a verb asks for.
///
/// The manager holds no container state of its own: each operation re-reads
/// the runtime before deciding what to do, which is what makes repeated verbs
/// idempotent. Concurrent invocations are not coordinated; the runtime's
/// refusal of duplicate names is the only guard.
pub struct ContainerManager<'a, R: ContainerRuntime> {
    runtime: R,
    config: &'a Config,
    settle: SettlePolicy,
}

impl<'a, R: ContainerRuntime> ContainerManager<'a, R> {
    pub fn new(runtime: R, config: &'a Config) -> Self {
        Self {
            runtime,
            config,
            settle: SettlePolicy::from_config(config),
        }
    }

    pub fn with_settle_policy(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    fn name(&self) -> &str {
        &self.config.container_name
    }

    /// Probes the runtime, then executes `verb`.
    ///
    /// An unreachable runtime fails every verb before any container query.
    pub async fn run(&self, verb: Verb) -> Result<Report, LifecycleError> {
        self.ensure_reachable().await?;

        match verb {
            Verb::Start => Ok(Report::Steps(vec![self.start().await?])),
            Verb::Stop => Ok(Report::Steps(vec![self.stop().await?])),
            Verb::Restart => Ok(Report::Steps(self.restart().await?)),
            Verb::Remove => Ok(Report::Steps(vec![self.remove().await?])),
            Verb::Status => Ok(Report::Status(self.status().await?)),
            Verb::Logs { tail } => Ok(Report::Logs(self.logs(tail).await?)),
        }
    }

    pub async fn ensure_reachable(&self) -> Result<(), LifecycleError> {
        self.runtime.ping().await.map_err(|e| {
            error!("Container runtime is not reachable: {}", e);
            LifecycleError::RuntimeUnreachable(e)
        })
    }

    async fn inspect(&self) -> Result<Option<ContainerRecord>, LifecycleError> {
        self.runtime
            .inspect(self.name())
            .await
            .map_err(LifecycleError::QueryFailed)
    }

    /// Current state as reported by the runtime.
    pub async fn state(&self) -> Result<ContainerState, LifecycleError> {
        let state = self
            .inspect()
            .await?
            .map(|r| r.container_state())
            .unwrap_or(ContainerState::Absent);
        debug!("Container {} is {}", self.name(), state);
        Ok(state)
    }

    pub async fn start(&self) -> Result<Outcome, LifecycleError> {
        let created = match self.state().await? {
            ContainerState::Running => {
                info!("Container {} is already running", self.name());
                return Ok(Outcome::AlreadyRunning);
            }
            ContainerState::Stopped => {
                info!("Starting existing container {}", self.name());
                self.runtime
                    .start(self.name())
                    .await
                    .map_err(|e| self.action_failed("start", e))?;
                false
            }
            ContainerState::Absent => {
                self.create().await?;
                true
            }
        };

        if self.wait_until_running().await? {
            info!(
                "Container {} is running on {}",
                self.name(),
                self.config.server()
            );
            Ok(Outcome::Started { created })
        } else {
            error!("Container {} failed to reach the running state", self.name());
            Err(LifecycleError::NotRunningAfterStart {
                name: self.name().to_string(),
                waited: self.settle.timeout,
            })
        }
    }

    async fn create(&self) -> Result<(), LifecycleError> {
        let image = &self.config.image;
        let present = self
            .runtime
            .image_present(image)
            .await
            .map_err(LifecycleError::QueryFailed)?;
        if !present {
            info!("Pulling image {}", image);
            self.runtime
                .pull(image)
                .await
                .map_err(|e| self.action_failed("pull image for", e))?;
        }

        info!(
            "Creating container {} from {} on port {}",
            self.name(),
            image,
            self.config.port
        );
        self.runtime
            .run(&RunSpec::from_config(self.config))
            .await
            .map_err(|e| self.action_failed("create", e))
    }

    /// Polls until the container reports running or the settle timeout is spent.
    async fn wait_until_running(&self) -> Result<bool, LifecycleError> {
        let attempts = self.settle.attempts();
        for attempt in 1..=attempts {
            tokio::time::sleep(self.settle.interval).await;
            if self.state().await? == ContainerState::Running {
                return Ok(true);
            }
            debug!(
                "Container {} not running yet ({}/{})",
                self.name(),
                attempt,
                attempts
            );
        }
        Ok(false)
    }

    pub async fn stop(&self) -> Result<Outcome, LifecycleError> {
        match self.state().await? {
            ContainerState::Running => {
                info!("Stopping container {}", self.name());
                self.runtime
                    .stop(self.name())
                    .await
                    .map_err(|e| self.action_failed("stop", e))?;
                Ok(Outcome::Stopped)
            }
            ContainerState::Stopped => {
                warn!("Container {} is not running", self.name());
                Ok(Outcome::AlreadyStopped)
            }
            ContainerState::Absent => {
                warn!("Container {} does not exist", self.name());
                Ok(Outcome::NotFound)
            }
        }
    }

    /// Stop followed by start. A failed start is not rolled back.
    pub async fn restart(&self) -> Result<Vec<Outcome>, LifecycleError> {
        let stopped = self.stop().await?;
        let started = self.start().await?;
        Ok(vec![stopped, started])
    }

    pub async fn remove(&self) -> Result<Outcome, LifecycleError> {
        let was_running = match self.state().await? {
            ContainerState::Absent => {
                warn!("Container {} does not exist", self.name());
                return Ok(Outcome::NotFound);
            }
            ContainerState::Running => {
                info!("Stopping container {} before removal", self.name());
                self.runtime
                    .stop(self.name())
                    .await
                    .map_err(|e| self.action_failed("stop", e))?;
                true
            }
            ContainerState::Stopped => false,
        };

        info!("Removing container {}", self.name());
        self.runtime
            .remove(self.name())
            .await
            .map_err(|e| self.action_failed("remove", e))?;
        Ok(Outcome::Removed { was_running })
    }

    pub async fn status(&self) -> Result<StatusReport, LifecycleError> {
        let record = self.inspect().await?;
        Ok(StatusReport::new(self.config, record))
    }

    /// Container output, or `None` when the container does not exist.
    pub async fn logs(&self, tail: Option<usize>) -> Result<Option<String>, LifecycleError> {
        if self.state().await? == ContainerState::Absent {
            return Ok(None);
        }
        self.runtime
            .logs(self.name(), tail)
            .await
            .map(Some)
            .map_err(LifecycleError::QueryFailed)
    }

    fn action_failed(&self, action: &'static str, source: RuntimeError) -> LifecycleError {
        error!("Failed to {} container {}: {}", action, self.name(), source);
        LifecycleError::ActionFailed {
            action,
            name: self.name().to_string(),
            source,
        }
    }
}
