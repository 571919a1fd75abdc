//! Lifecycle state and the monitor guarding all shared bridge state.
//!
//! A single [`LifecycleMonitor`] owns the lifecycle value, both tracks, the
//! playback rate and the readiness latch behind one mutex, with a condition
//! variable signalled on every transition. Every wait re-checks its
//! predicate after waking and gives up as soon as a terminal state is seen.

use super::track::Tracks;
use crate::observability::trace_state_change;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

// ============================================================================
// PipelineState
// ============================================================================

/// Lifecycle of the bridge.
///
/// `Uninitialized < Tuning < Configured < Ready` is the forward order used
/// for readiness checks. `Error` and `ShuttingDown` are terminal: once
/// entered, no forward state is reachable again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineState {
    /// Constructed, nothing requested yet.
    #[default]
    Uninitialized,
    /// Tune requested, waiting for the engine to report formats.
    Tuning,
    /// Output formats negotiated, channels created.
    Configured,
    /// Channels exposed downstream, data may flow.
    Ready,
    /// Tune failed.
    Error,
    /// Host is tearing the bridge down.
    ShuttingDown,
}

impl PipelineState {
    /// Position in the forward order, `None` for terminal states.
    pub const fn rank(self) -> Option<u8> {
        match self {
            PipelineState::Uninitialized => Some(0),
            PipelineState::Tuning => Some(1),
            PipelineState::Configured => Some(2),
            PipelineState::Ready => Some(3),
            PipelineState::Error | PipelineState::ShuttingDown => None,
        }
    }

    /// Whether this state is `Error` or `ShuttingDown`.
    pub const fn is_terminal(self) -> bool {
        self.rank().is_none()
    }

    /// Whether this is a forward state at or beyond `threshold`.
    ///
    /// Terminal states never satisfy a threshold.
    pub fn reached(self, threshold: PipelineState) -> bool {
        match (self.rank(), threshold.rank()) {
            (Some(a), Some(b)) => a >= b,
            (Some(_), None) => false,
            (None, _) => self == threshold,
        }
    }

    /// Lowercase name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            PipelineState::Uninitialized => "uninitialized",
            PipelineState::Tuning => "tuning",
            PipelineState::Configured => "configured",
            PipelineState::Ready => "ready",
            PipelineState::Error => "error",
            PipelineState::ShuttingDown => "shutting-down",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Shared state
// ============================================================================

/// Everything the control and delivery threads share.
#[derive(Debug)]
pub struct BridgeState {
    /// Current lifecycle state.
    pub lifecycle: PipelineState,
    /// Video and audio tracks.
    pub tracks: Tracks,
    /// Current playback rate.
    pub rate: f64,
    /// Latched once the first chunk has seen the `Ready` state.
    pub ready_to_send: bool,
    /// Stream id announced in stream-start events.
    pub stream_id: String,
    /// Tune completion has been reported for the current tune.
    pub tune_reported: bool,
}

impl BridgeState {
    fn new() -> Self {
        Self {
            lifecycle: PipelineState::Uninitialized,
            tracks: Tracks::new(),
            rate: 1.0,
            ready_to_send: false,
            stream_id: String::new(),
            tune_reported: false,
        }
    }
}

// ============================================================================
// LifecycleMonitor
// ============================================================================

/// Mutex plus condition variable around [`BridgeState`].
///
/// There is no timeout on any wait; reaching a terminal state is the only
/// cancellation signal.
pub struct LifecycleMonitor {
    name: String,
    state: Mutex<BridgeState>,
    state_changed: Condvar,
}

impl LifecycleMonitor {
    /// Create a monitor in `Uninitialized` with both tracks empty.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(BridgeState::new()),
            state_changed: Condvar::new(),
        }
    }

    /// Lock the shared state.
    ///
    /// A panic on another thread while holding the lock does not wedge the
    /// bridge; the poisoned guard is recovered.
    pub fn lock(&self) -> MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.lock().lifecycle
    }

    /// Move to `new` and wake all waiters.
    ///
    /// Returns `false` if the transition was refused because the bridge is
    /// already terminal. The only move out of a terminal state is
    /// `Error -> ShuttingDown`.
    pub fn transition(&self, new: PipelineState) -> bool {
        let mut guard = self.lock();
        self.transition_locked(&mut guard, new)
    }

    /// [`transition`](Self::transition) with the lock already held.
    pub fn transition_locked(&self, state: &mut BridgeState, new: PipelineState) -> bool {
        let from = state.lifecycle;
        let allowed = !from.is_terminal()
            || from == new
            || (from == PipelineState::Error && new == PipelineState::ShuttingDown);
        if !allowed {
            tracing::debug!(
                element = %self.name,
                from = %from,
                to = %new,
                "transition refused from terminal state"
            );
            return false;
        }
        state.lifecycle = new;
        if from != new {
            trace_state_change(&self.name, from.name(), new.name());
        }
        self.state_changed.notify_all();
        true
    }

    /// Wake all waiters without changing state.
    pub fn signal(&self) {
        self.state_changed.notify_all();
    }

    /// Block until the state reaches `threshold` or turns terminal.
    ///
    /// Returns the state actually reached.
    pub fn wait_until_at_least(&self, threshold: PipelineState) -> PipelineState {
        let guard = self.lock();
        let guard = self.wait_until_at_least_locked(guard, threshold);
        guard.lifecycle
    }

    /// [`wait_until_at_least`](Self::wait_until_at_least) with the lock held.
    pub fn wait_until_at_least_locked<'a>(
        &'a self,
        mut guard: MutexGuard<'a, BridgeState>,
        threshold: PipelineState,
    ) -> MutexGuard<'a, BridgeState> {
        while !guard.lifecycle.reached(threshold) && !guard.lifecycle.is_terminal() {
            guard = self
                .state_changed
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
        guard
    }

    /// Block while the state equals `state`. Returns the state that ended
    /// the wait.
    pub fn wait_while(&self, state: PipelineState) -> PipelineState {
        let mut guard = self.lock();
        while guard.lifecycle == state {
            guard = self
                .state_changed
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
        guard.lifecycle
    }

    /// Block until the state is terminal.
    pub fn wait_until_terminal(&self) -> PipelineState {
        let mut guard = self.lock();
        while !guard.lifecycle.is_terminal() {
            guard = self
                .state_changed
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
        guard.lifecycle
    }
}

impl fmt::Debug for LifecycleMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleMonitor")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
