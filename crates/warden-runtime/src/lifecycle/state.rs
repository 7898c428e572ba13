//! Shared lifecycle state and transition publication.

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use warden_core::ports::ProcessHandle;
use warden_core::{Generation, ModelInfo, ServerHealth, ServerStatus, StatusTransition};

/// Capacity of the transition broadcast channel.
pub const TRANSITION_CHANNEL_CAPACITY: usize = 256;

/// Resources owned by one start cycle.
pub(crate) struct Cycle {
    pub generation: Generation,
    /// Parent of every task spawned for this cycle.
    pub token: CancellationToken,
    /// Child of `token`, cancelled on its own once the server is ready.
    pub progress: CancellationToken,
    pub handle: Option<ProcessHandle>,
}

impl Cycle {
    pub fn new(generation: Generation) -> Self {
        let token = CancellationToken::new();
        let progress = token.child_token();
        Self {
            generation,
            token,
            progress,
            handle: None,
        }
    }
}

/// Everything guarded by the state lock.
#[derive(Default)]
pub(crate) struct LifecycleState {
    pub status: ServerStatus,
    pub generation: Generation,
    pub cycle: Option<Cycle>,
    pub model: Option<ModelInfo>,
    pub last_error: Option<String>,
}

impl LifecycleState {
    /// The live cycle, if it belongs to `generation`.
    pub fn cycle_for(&mut self, generation: Generation) -> Option<&mut Cycle> {
        self.cycle
            .as_mut()
            .filter(|cycle| cycle.generation == generation)
    }

    /// Detach the live cycle and cancel all of its tasks.
    pub fn end_cycle(&mut self) -> Option<Cycle> {
        let cycle = self.cycle.take()?;
        cycle.token.cancel();
        Some(cycle)
    }
}

/// Output side of the state machine.
///
/// Callers hold the state lock while publishing, which is what makes the
/// order seen by observers match the order of the transitions.
pub(crate) struct Publisher {
    status: watch::Sender<ServerStatus>,
    health: watch::Sender<ServerHealth>,
    transitions: broadcast::Sender<StatusTransition>,
}

impl Publisher {
    pub fn new() -> Self {
        let (status, _) = watch::channel(ServerStatus::Stopped);
        let (health, _) = watch::channel(ServerHealth::Unknown);
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        Self {
            status,
            health,
            transitions,
        }
    }

    /// Move `state` to `to` and notify observers.
    pub fn transition(&self, state: &mut LifecycleState, to: ServerStatus) {
        if state.status == to {
            return;
        }
        let from = std::mem::replace(&mut state.status, to.clone());

        if matches!(to, ServerStatus::LoadingModel { .. }) && from.label() == to.label() {
            debug!(generation = state.generation, status = %to, "load progress");
        } else {
            info!(generation = state.generation, from = %from, to = %to, "server status changed");
        }

        self.status.send_replace(to.clone());
        // No subscribers is fine
        let _ = self.transitions.send(StatusTransition {
            generation: state.generation,
            from,
            to,
        });
    }

    pub fn set_health(&self, health: ServerHealth) {
        self.health.send_if_modified(|current| {
            if *current == health {
                return false;
            }
            debug!(%health, previous = %current, "server health changed");
            *current = health;
            true
        });
    }

    pub fn health(&self) -> ServerHealth {
        *self.health.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<ServerStatus> {
        self.status.subscribe()
    }

    pub fn watch_health(&self) -> watch::Receiver<ServerHealth> {
        self.health.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusTransition> {
        self.transitions.subscribe()
    }
}
