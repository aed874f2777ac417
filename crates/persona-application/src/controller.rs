//! One conversation, from user input to committed answer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use persona_core::{ErrorKind, Message, OrchestratorResult, Result};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::chat_api::ChatApi;
use crate::display::GENERIC_FAILURE_MESSAGE;
use crate::replay::{ReplayOutcome, ReplayScheduler};
use crate::store::ConversationStateStore;

/// Default number of automatic retries for upstream failures.
pub const DEFAULT_UPSTREAM_RETRIES: u32 = 1;

/// Result of [`ChatController::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// Another turn is in flight; the input was not recorded.
    Busy,
    Committed(Message),
    /// The generic failure notice was appended.
    Failed(ErrorKind),
    /// A persona switch or clear overtook the turn.
    Cancelled,
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ChatController {
    api: Arc<dyn ChatApi>,
    store: Arc<RwLock<ConversationStateStore>>,
    replay: Arc<ReplayScheduler>,
    in_flight: AtomicBool,
    upstream_retries: u32,
}

impl ChatController {
    pub fn new(
        api: Arc<dyn ChatApi>,
        store: Arc<RwLock<ConversationStateStore>>,
        replay: Arc<ReplayScheduler>,
    ) -> Self {
        Self {
            api,
            store,
            replay,
            in_flight: AtomicBool::new(false),
            upstream_retries: DEFAULT_UPSTREAM_RETRIES,
        }
    }

    pub fn with_upstream_retries(mut self, retries: u32) -> Self {
        self.upstream_retries = retries;
        self
    }

    pub fn store(&self) -> Arc<RwLock<ConversationStateStore>> {
        self.store.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn active_persona(&self) -> String {
        self.store.read().await.active_persona().to_string()
    }

    /// Records `input`, asks the active persona, and replays the answer.
    pub async fn submit(&self, input: &str) -> SubmitOutcome {
        if input.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            return SubmitOutcome::Busy;
        };

        // Registering under the store lock orders this turn against switch and clear.
        let request_id = Uuid::new_v4();
        let (persona, history, handle) = {
            let mut store = self.store.write().await;
            store.append_user(input);
            let handle = self.replay.begin(request_id);
            (store.active_persona().to_string(), store.outbound_history(), handle)
        };
        tracing::info!(target: "chat", "[{}] Request {} ({} messages)", persona, request_id, history.len());

        let response = self.send_with_retries(&persona, &history).await;

        if handle.is_cancelled() {
            tracing::debug!(target: "chat", "Request {} overtaken before replay", request_id);
            return SubmitOutcome::Cancelled;
        }

        match response {
            Ok(result) => match self.replay.run(handle, &result, &persona, &self.store).await {
                ReplayOutcome::Committed(message) => SubmitOutcome::Committed(message),
                ReplayOutcome::Cancelled => SubmitOutcome::Cancelled,
            },
            Err(err) => {
                tracing::error!(target: "chat", "[{}] Request {} failed: {}", persona, request_id, err);
                self.replay.release(request_id);
                let mut store = self.store.write().await;
                if handle.is_cancelled() {
                    return SubmitOutcome::Cancelled;
                }
                store.append_system(GENERIC_FAILURE_MESSAGE);
                SubmitOutcome::Failed(err.kind())
            }
        }
    }

    /// Changes the persona for later turns and abandons the one in flight.
    pub async fn switch_persona(&self, persona_id: &str) {
        let mut store = self.store.write().await;
        self.replay.cancel_current();
        store.switch_persona(persona_id);
    }

    /// Empties the conversation and abandons the turn in flight.
    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        self.replay.cancel_current();
        store.clear();
    }

    async fn send_with_retries(
        &self,
        persona: &str,
        history: &[Message],
    ) -> Result<OrchestratorResult> {
        let mut attempt = 0;
        loop {
            match self.api.send(persona, history).await {
                Err(err) if err.is_retryable() && attempt < self.upstream_retries => {
                    attempt += 1;
                    tracing::warn!(
                        target: "chat",
                        "[{}] Upstream failure, retry {}/{}: {}",
                        persona,
                        attempt,
                        self.upstream_retries,
                        err
                    );
                }
                other => return other,
            }
        }
    }
}
