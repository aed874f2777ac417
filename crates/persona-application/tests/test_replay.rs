use std::sync::Arc;
use std::time::Duration;

use persona_application::{
    ConversationStateStore, ReplayEvent, ReplayOutcome, ReplayScheduler, ReplayTiming,
};
use persona_core::{MessageRole, OrchestratorResult, Step, StepResult};
use tokio::sync::{RwLock, mpsc};
use tokio::time::Instant;
use uuid::Uuid;

fn result(final_response: &str) -> OrchestratorResult {
    let steps = Step::ALL
        .iter()
        .map(|step| match step {
            Step::Result => StepResult::new(*step, final_response),
            _ => StepResult::new(*step, format!("{step} content for the replay")),
        })
        .collect();
    OrchestratorResult::from_steps(steps).unwrap()
}

fn store() -> Arc<RwLock<ConversationStateStore>> {
    Arc::new(RwLock::new(ConversationStateStore::new("hitesh")))
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ReplayEvent>) -> Vec<ReplayEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn test_replay_paces_four_steps_then_commits() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = ReplayScheduler::new(ReplayTiming::default()).with_events(tx);
    let store = store();
    let request_id = Uuid::new_v4();

    let started = Instant::now();
    let outcome = scheduler
        .run(scheduler.begin(request_id), &result("Hanji! Final answer."), "hitesh", &store)
        .await;

    assert_eq!(started.elapsed(), Duration::from_millis(7_200));

    let ReplayOutcome::Committed(message) = outcome else {
        panic!("replay should commit");
    };
    assert_eq!(message.role, MessageRole::Assistant);
    assert_eq!(message.content, "Hanji! Final answer.");
    assert_eq!(message.persona.as_deref(), Some("hitesh"));
    assert_eq!(store.read().await.messages(), [message.clone()]);

    let events = drain(&mut rx);
    assert!(events.iter().all(|event| event.request_id() == request_id));

    let started: Vec<Step> = events
        .iter()
        .filter_map(|event| match event {
            ReplayEvent::StepStarted { step, .. } => Some(*step),
            _ => None,
        })
        .collect();
    assert_eq!(started, [Step::Analyze, Step::Think, Step::Output, Step::Validate]);

    let tokens: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            ReplayEvent::Progress { tokens, .. } => Some(*tokens),
            _ => None,
        })
        .collect();
    assert_eq!(tokens.len(), 40);
    // "analyze content for the replay" is 30 characters: +3 per tick.
    assert_eq!(&tokens[..3], [20, 23, 26]);
    assert!(tokens.windows(2).all(|pair| pair[0] < pair[1]));

    let tail = &events[events.len() - 2..];
    assert!(matches!(tail[0], ReplayEvent::Cleared { .. }));
    assert!(matches!(tail[1], ReplayEvent::Committed { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_replay_never_writes() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = Arc::new(ReplayScheduler::new(ReplayTiming::default()).with_events(tx));
    let store = store();

    let handle = scheduler.begin(Uuid::new_v4());
    let task = {
        let scheduler = scheduler.clone();
        let store = store.clone();
        tokio::spawn(async move {
            scheduler
                .run(handle, &result("never shown"), "hitesh", &store)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert!(scheduler.cancel_current().is_some());

    assert_eq!(task.await.unwrap(), ReplayOutcome::Cancelled);
    assert!(store.read().await.is_empty());

    let events = drain(&mut rx);
    assert!(matches!(events.last(), Some(ReplayEvent::Cancelled { .. })));
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, ReplayEvent::Committed { .. } | ReplayEvent::Cleared { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_new_replay_supersedes_the_old_one() {
    let scheduler = Arc::new(ReplayScheduler::new(ReplayTiming::default()));
    let store = store();

    let first = scheduler.begin(Uuid::new_v4());
    let stale = {
        let scheduler = scheduler.clone();
        let store = store.clone();
        tokio::spawn(async move { scheduler.run(first, &result("stale"), "hitesh", &store).await })
    };

    tokio::time::sleep(Duration::from_millis(500)).await;
    let second = scheduler.begin(Uuid::new_v4());
    let outcome = scheduler
        .run(second, &result("fresh"), "piyush", &store)
        .await;

    assert_eq!(stale.await.unwrap(), ReplayOutcome::Cancelled);
    assert!(matches!(outcome, ReplayOutcome::Committed(_)));

    let store = store.read().await;
    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.messages()[0].content, "fresh");
    assert_eq!(store.messages()[0].persona.as_deref(), Some("piyush"));
}

#[tokio::test]
async fn test_instant_timing_commits_without_waiting() {
    let scheduler = ReplayScheduler::new(ReplayTiming::instant());
    let store = store();

    let outcome = scheduler
        .run(scheduler.begin(Uuid::new_v4()), &result("done"), "hitesh", &store)
        .await;

    assert!(matches!(outcome, ReplayOutcome::Committed(ref m) if m.content == "done"));
    assert_eq!(scheduler.cancel_current(), None, "finished replays are released");
}
