pub mod chat_api;
pub mod controller;
pub mod display;
pub mod profile;
pub mod replay;
pub mod store;

pub use chat_api::{ChatApi, HttpChatApi};
pub use controller::{ChatController, DEFAULT_UPSTREAM_RETRIES, SubmitOutcome};
pub use display::{GENERIC_FAILURE_MESSAGE, format_time, step_indicator};
pub use profile::{GitHubProfileLookup, Profile, ProfileLookup, RemoteProfile, resolve_profile};
pub use replay::{ReplayEvent, ReplayHandle, ReplayOutcome, ReplayScheduler, ReplayTiming};
pub use store::ConversationStateStore;
