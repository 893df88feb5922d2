//! In-memory [`ContainerRuntime`] shared by unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::container_management::{ContainerRecord, ContainerRuntime, RunSpec};
use crate::error_handling::types::RuntimeError;

#[derive(Default)]
pub struct FakeState {
    pub containers: HashMap<String, ContainerRecord>,
    pub images: HashSet<String>,
    /// Mutating calls in order, e.g. `run sqlserver-demo`.
    pub actions: Vec<String>,
    pub inspects: usize,
    pub created: usize,
    /// Inspections left before a just-started container reports running.
    pub pending_checks: usize,
}

/// Behaves like the docker CLI for one host. Clones share state, so one
/// fake can back several manager instances, one per simulated invocation.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    pub state: Arc<Mutex<FakeState>>,
    pub unreachable: bool,
    pub fail_inspect: bool,
    pub crash_on_start: bool,
    pub fail_action: Option<&'static str>,
    pub checks_before_running: usize,
}

impl FakeRuntime {
    pub fn with_image(image: &str) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().images.insert(image.to_string());
        fake
    }

    pub fn record(&self, name: &str) -> Option<ContainerRecord> {
        self.state.lock().unwrap().containers.get(name).cloned()
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn created(&self) -> usize {
        self.state.lock().unwrap().created
    }

    pub fn inspects(&self) -> usize {
        self.state.lock().unwrap().inspects
    }

    fn failure(command: &str, stderr: &str) -> RuntimeError {
        RuntimeError::CommandFailed {
            command: command.to_string(),
            code: Some(125),
            stderr: stderr.to_string(),
        }
    }

    fn act(&self, action: &'static str, name: &str) -> Result<(), RuntimeError> {
        if self.fail_action == Some(action) {
            return Err(Self::failure(&format!("docker {}", action), "simulated failure"));
        }
        self.state
            .lock()
            .unwrap()
            .actions
            .push(format!("{} {}", action, name));
        Ok(())
    }

    fn set_started(&self, state: &mut FakeState, name: &str) {
        let next = if self.crash_on_start {
            "exited"
        } else if self.checks_before_running > 0 {
            state.pending_checks = self.checks_before_running;
            "created"
        } else {
            "running"
        };
        if let Some(record) = state.containers.get_mut(name) {
            record.state = next.to_string();
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        if self.unreachable {
            return Err(Self::failure(
                "docker info",
                "Cannot connect to the Docker daemon",
            ));
        }
        Ok(())
    }

    async fn inspect(&self, name: &str) -> Result<Option<ContainerRecord>, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.inspects += 1;
        if self.fail_inspect {
            return Err(Self::failure("docker ps", "simulated failure"));
        }
        if state.pending_checks > 0 {
            state.pending_checks -= 1;
            if state.pending_checks == 0 {
                if let Some(record) = state.containers.get_mut(name) {
                    record.state = "running".to_string();
                }
            }
        }
        Ok(state.containers.get(name).cloned())
    }

    async fn image_present(&self, image: &str) -> Result<bool, RuntimeError> {
        Ok(self.state.lock().unwrap().images.contains(image))
    }

    async fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        self.act("pull", image)?;
        self.state.lock().unwrap().images.insert(image.to_string());
        Ok(())
    }

    async fn run(&self, spec: &RunSpec) -> Result<(), RuntimeError> {
        if self.record(&spec.name).is_some() {
            return Err(Self::failure(
                "docker run",
                &format!("Conflict. The container name \"/{}\" is already in use", spec.name),
            ));
        }
        self.act("run", &spec.name)?;
        let mut state = self.state.lock().unwrap();
        state.created += 1;
        let id = format!("fake-{}", state.created);
        state.containers.insert(
            spec.name.clone(),
            ContainerRecord {
                id,
                names: spec.name.clone(),
                image: spec.image.clone(),
                state: "created".to_string(),
                status: "Created".to_string(),
                ports: format!("0.0.0.0:{}->{}/tcp", spec.host_port, spec.container_port),
            },
        );
        self.set_started(&mut state, &spec.name);
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.act("start", name)?;
        let mut state = self.state.lock().unwrap();
        self.set_started(&mut state, name);
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.act("stop", name)?;
        if let Some(record) = self.state.lock().unwrap().containers.get_mut(name) {
            record.state = "exited".to_string();
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        if self.record(name).map(|r| r.is_running()).unwrap_or(false) {
            return Err(Self::failure("docker rm", "cannot remove a running container"));
        }
        self.act("rm", name)?;
        self.state.lock().unwrap().containers.remove(name);
        Ok(())
    }

    async fn logs(&self, name: &str, _tail: Option<usize>) -> Result<String, RuntimeError> {
        match self.record(name) {
            Some(_) => Ok("SQL Server is now ready for client connections.\n".to_string()),
            None => Err(Self::failure(
                "docker logs",
                &format!("No such container: {}", name),
            )),
        }
    }
}
