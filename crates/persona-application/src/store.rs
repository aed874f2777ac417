//! Client-side conversation state.
//!
//! The store is the only place a conversation lives; the server never keeps
//! one. It is shared as `Arc<tokio::sync::RwLock<ConversationStateStore>>`
//! so that one mutator runs at a time.

use persona_core::Message;

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

fn wall_clock_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Append-only message history plus the persona selected for the next send.
pub struct ConversationStateStore {
    messages: Vec<Message>,
    active_persona: String,
    clock: Clock,
}

impl ConversationStateStore {
    pub fn new(active_persona: impl Into<String>) -> Self {
        Self::with_clock(active_persona, wall_clock_millis)
    }

    /// Uses `clock` (epoch milliseconds) instead of the wall clock.
    pub fn with_clock(
        active_persona: impl Into<String>,
        clock: impl Fn() -> i64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            messages: Vec::new(),
            active_persona: active_persona.into(),
            clock: Box::new(clock),
        }
    }

    pub fn append_user(&mut self, content: impl Into<String>) -> Message {
        let timestamp = self.next_timestamp();
        self.push(Message::user(content, timestamp))
    }

    pub fn append_assistant(
        &mut self,
        content: impl Into<String>,
        persona: impl Into<String>,
    ) -> Message {
        let timestamp = self.next_timestamp();
        self.push(Message::assistant(content, persona, timestamp))
    }

    /// Appends a locally generated notice. System messages are shown but
    /// never sent to the server.
    pub fn append_system(&mut self, content: impl Into<String>) -> Message {
        let timestamp = self.next_timestamp();
        self.push(Message::system(content, timestamp))
    }

    /// Empties the conversation. The active persona is kept.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Selects the persona for subsequent sends; stored messages keep their tags.
    pub fn switch_persona(&mut self, persona_id: impl Into<String>) {
        self.active_persona = persona_id.into();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn active_persona(&self) -> &str {
        &self.active_persona
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The conversation as sent with a request: everything except system messages.
    pub fn outbound_history(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|message| message.is_outbound())
            .cloned()
            .collect()
    }

    // Wall clocks can step backwards; the stored sequence must not.
    fn next_timestamp(&self) -> i64 {
        let now = (self.clock)();
        match self.messages.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        }
    }

    fn push(&mut self, message: Message) -> Message {
        self.messages.push(message.clone());
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::MessageRole;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn store_with_clock(start: i64) -> (ConversationStateStore, Arc<AtomicI64>) {
        let now = Arc::new(AtomicI64::new(start));
        let clock = now.clone();
        let store = ConversationStateStore::with_clock("hitesh", move || clock.load(Ordering::SeqCst));
        (store, now)
    }

    #[test]
    fn appends_keep_order_and_tags() {
        let (mut store, _) = store_with_clock(1_000);
        store.append_user("What is a closure?");
        let reply = store.append_assistant("Closure ek function hai", "hitesh");

        assert_eq!(reply.persona.as_deref(), Some("hitesh"));
        let roles: Vec<MessageRole> = store.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, [MessageRole::User, MessageRole::Assistant]);
    }

    #[test]
    fn timestamps_never_decrease() {
        let (mut store, now) = store_with_clock(5_000);
        store.append_user("first");
        now.store(4_000, Ordering::SeqCst);
        let second = store.append_system("clock went backwards");
        now.store(6_000, Ordering::SeqCst);
        let third = store.append_user("later");

        assert_eq!(second.timestamp, 5_000);
        assert_eq!(third.timestamp, 6_000);
        assert!(
            store
                .messages()
                .windows(2)
                .all(|pair| pair[0].timestamp <= pair[1].timestamp)
        );
    }

    #[test]
    fn clear_is_idempotent() {
        let (mut store, _) = store_with_clock(1);
        store.append_user("hello");
        store.clear();
        assert!(store.is_empty());
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.active_persona(), "hitesh");
    }

    #[test]
    fn switch_persona_leaves_history_untouched() {
        let (mut store, _) = store_with_clock(1);
        store.append_user("q");
        store.append_assistant("a", "hitesh");
        let before = store.messages().to_vec();

        store.switch_persona("piyush");

        assert_eq!(store.messages(), before.as_slice());
        assert_eq!(store.active_persona(), "piyush");
    }

    #[test]
    fn outbound_history_drops_system_messages() {
        let (mut store, _) = store_with_clock(1);
        store.append_user("q1");
        store.append_system("Sorry, there was an error processing your request. Please try again later.");
        store.append_user("q2");

        let outbound = store.outbound_history();
        assert_eq!(outbound.len(), 2);
        assert!(outbound.iter().all(|m| m.role == MessageRole::User));
        assert_eq!(store.messages().len(), 3);
    }
}
