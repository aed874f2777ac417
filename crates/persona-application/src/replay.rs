//! Progressive presentation of an already computed answer.
//!
//! The four thinking steps are shown one after another with a simulated
//! token counter, then the final response is committed to the store. Each
//! replay owns a cancellation token; a cancelled replay never writes.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use persona_core::{Message, OrchestratorResult, Step};
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::store::ConversationStateStore;

/// Pacing of a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayTiming {
    pub ticks_per_step: usize,
    pub tick_interval: Duration,
    pub step_hold: Duration,
    pub base_tokens: usize,
    pub tokens_per_step: usize,
}

impl Default for ReplayTiming {
    fn default() -> Self {
        Self {
            ticks_per_step: 10,
            tick_interval: Duration::from_millis(100),
            step_hold: Duration::from_millis(800),
            base_tokens: 20,
            tokens_per_step: 30,
        }
    }
}

impl ReplayTiming {
    /// No pauses at all; used by non-interactive callers.
    pub fn instant() -> Self {
        Self {
            tick_interval: Duration::ZERO,
            step_hold: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Simulated token count shown at `tick` of the step at `index`.
    pub fn token_count(&self, index: usize, tick: usize, content_len: usize) -> usize {
        let increment = content_len.checked_div(self.ticks_per_step).unwrap_or(0);
        self.base_tokens + index * self.tokens_per_step + tick * increment
    }

    /// Total wall time of one replay, excluding the commit.
    pub fn total_duration(&self, thinking_steps: usize) -> Duration {
        let per_step = self.tick_interval * self.ticks_per_step as u32 + self.step_hold;
        per_step * thinking_steps as u32
    }
}

/// What a replay reports while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayEvent {
    StepStarted {
        request_id: Uuid,
        index: usize,
        step: Step,
        content: String,
    },
    Progress {
        request_id: Uuid,
        tokens: usize,
    },
    /// The thinking indicator is gone.
    Cleared { request_id: Uuid },
    Committed { request_id: Uuid, message: Message },
    Cancelled { request_id: Uuid },
}

impl ReplayEvent {
    pub fn request_id(&self) -> Uuid {
        match self {
            ReplayEvent::StepStarted { request_id, .. }
            | ReplayEvent::Progress { request_id, .. }
            | ReplayEvent::Cleared { request_id }
            | ReplayEvent::Committed { request_id, .. }
            | ReplayEvent::Cancelled { request_id } => *request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    Committed(Message),
    Cancelled,
}

/// Ticket for one replay, obtained from [`ReplayScheduler::begin`].
#[derive(Debug, Clone)]
pub struct ReplayHandle {
    request_id: Uuid,
    token: CancellationToken,
}

impl ReplayHandle {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub struct ReplayScheduler {
    timing: ReplayTiming,
    events: Option<mpsc::UnboundedSender<ReplayEvent>>,
    current: Mutex<Option<ReplayHandle>>,
}

impl ReplayScheduler {
    pub fn new(timing: ReplayTiming) -> Self {
        Self {
            timing,
            events: None,
            current: Mutex::new(None),
        }
    }

    /// Forwards every replay event to `sender`.
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<ReplayEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn timing(&self) -> &ReplayTiming {
        &self.timing
    }

    /// Registers a new replay, cancelling the one in flight.
    pub fn begin(&self, request_id: Uuid) -> ReplayHandle {
        let handle = ReplayHandle {
            request_id,
            token: CancellationToken::new(),
        };
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle.clone());
        if let Some(previous) = previous {
            tracing::debug!(target: "replay", "Replay {} superseded by {}", previous.request_id, request_id);
            previous.token.cancel();
        }
        handle
    }

    /// Cancels the replay in flight, if any. Returns its request id.
    pub fn cancel_current(&self) -> Option<Uuid> {
        let current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        current.map(|handle| {
            handle.token.cancel();
            handle.request_id
        })
    }

    /// Presents `result` and commits its final response as `persona`.
    pub async fn run(
        &self,
        handle: ReplayHandle,
        result: &OrchestratorResult,
        persona: &str,
        store: &RwLock<ConversationStateStore>,
    ) -> ReplayOutcome {
        let request_id = handle.request_id;

        for (index, step) in result.thinking_steps().iter().enumerate() {
            if handle.is_cancelled() {
                return self.cancelled(request_id);
            }
            self.emit(ReplayEvent::StepStarted {
                request_id,
                index,
                step: step.step,
                content: step.content.clone(),
            });

            let content_len = step.content.chars().count();
            for tick in 0..self.timing.ticks_per_step {
                self.emit(ReplayEvent::Progress {
                    request_id,
                    tokens: self.timing.token_count(index, tick, content_len),
                });
                if !pause(&handle.token, self.timing.tick_interval).await {
                    return self.cancelled(request_id);
                }
            }

            if !pause(&handle.token, self.timing.step_hold).await {
                return self.cancelled(request_id);
            }
        }

        let message = {
            let mut store = store.write().await;
            // Checked under the write lock so a concurrent clear or switch wins.
            if handle.is_cancelled() {
                drop(store);
                return self.cancelled(request_id);
            }
            self.emit(ReplayEvent::Cleared { request_id });
            store.append_assistant(result.final_response(), persona)
        };

        self.release(request_id);
        self.emit(ReplayEvent::Committed {
            request_id,
            message: message.clone(),
        });
        ReplayOutcome::Committed(message)
    }

    fn cancelled(&self, request_id: Uuid) -> ReplayOutcome {
        tracing::debug!(target: "replay", "Replay {} cancelled", request_id);
        self.release(request_id);
        self.emit(ReplayEvent::Cancelled { request_id });
        ReplayOutcome::Cancelled
    }

    /// Forgets the replay registered as `request_id` if it is still the current one.
    pub fn release(&self, request_id: Uuid) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|handle| handle.request_id == request_id) {
            *current = None;
        }
    }

    fn emit(&self, event: ReplayEvent) {
        if let Some(sender) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = sender.send(event);
        }
    }
}

/// Sleeps for `duration` unless cancelled first. Returns false on cancellation.
async fn pause(token: &CancellationToken, duration: Duration) -> bool {
    if duration.is_zero() {
        return !token.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
