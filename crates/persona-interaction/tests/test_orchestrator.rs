use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use persona_core::config::{GenerationConfig, OrchestratorSettings};
use persona_core::persona::{PersonaConfig, get_default_presets};
use persona_core::{ChatError, ErrorKind, Message, Step};
use persona_interaction::{GenerationClient, GenerationError, StepOrchestrator, Turn, TurnRole};

enum Behavior {
    Reply(String),
    Fail(GenerationError),
    Hang,
}

#[derive(Clone)]
struct RecordedCall {
    step: Step,
    history: Vec<Turn>,
    prompt: String,
}

/// Answers every step correctly unless a behavior is queued for it.
///
/// The result step echoes the affiliate link only when the prompt carries it,
/// the way a compliant model would.
struct ScriptedClient {
    affiliate_url: String,
    overrides: Mutex<HashMap<Step, VecDeque<Behavior>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    fn new(persona: &PersonaConfig) -> Self {
        Self {
            affiliate_url: persona.affiliate_url.clone(),
            overrides: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn queue(&self, step: Step, behavior: Behavior) {
        self.overrides
            .lock()
            .unwrap()
            .entry(step)
            .or_default()
            .push_back(behavior);
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

fn step_of(prompt: &str) -> Step {
    Step::ALL
        .into_iter()
        .find(|step| prompt.contains(&format!("\"step\": \"{step}\"")))
        .expect("prompt names a step")
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send_turn(
        &self,
        history: &[Turn],
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, GenerationError> {
        let step = step_of(prompt);
        self.calls.lock().unwrap().push(RecordedCall {
            step,
            history: history.to_vec(),
            prompt: prompt.to_string(),
        });

        let behavior = self
            .overrides
            .lock()
            .unwrap()
            .get_mut(&step)
            .and_then(|queue| queue.pop_front());

        match behavior {
            Some(Behavior::Reply(reply)) => Ok(reply),
            Some(Behavior::Fail(err)) => Err(err),
            Some(Behavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => {
                let mut content = format!("{step} content");
                if prompt.contains(&self.affiliate_url) {
                    content.push_str(&format!(" Enroll here: {}", self.affiliate_url));
                }
                Ok(serde_json::json!({ "step": step, "content": content }).to_string())
            }
        }
    }
}

fn hitesh() -> PersonaConfig {
    get_default_presets().remove(0)
}

fn orchestrator(client: &Arc<ScriptedClient>, max_reprompts: u32) -> StepOrchestrator {
    StepOrchestrator::new(
        client.clone(),
        OrchestratorSettings {
            call_timeout_secs: 30,
            max_reprompts,
        },
    )
}

#[tokio::test]
async fn test_plain_query_runs_five_steps_without_link() {
    let persona = hitesh();
    let client = Arc::new(ScriptedClient::new(&persona));

    let result = orchestrator(&client, 1)
        .run(&persona, &[Message::user("What is a closure?", 1)])
        .await
        .expect("run should succeed");

    let steps: Vec<Step> = result.steps().iter().map(|s| s.step).collect();
    assert_eq!(steps, Step::ALL);
    assert_eq!(result.final_response(), "result content");
    assert!(!result.final_response().contains(&persona.affiliate_url));
    assert_eq!(result.thinking_steps().len(), 4);

    let calls = client.calls();
    assert_eq!(calls.len(), 5);
    for (index, call) in calls.iter().enumerate() {
        assert_eq!(call.step, Step::ALL[index]);
        assert_eq!(call.history.len(), 2 + 2 * index, "history grows by one exchange per step");
        assert!(!call.prompt.contains(&persona.affiliate_url));
    }
    assert!(calls[0].prompt.contains(r#"User query: "What is a closure?""#));
}

#[tokio::test]
async fn test_handshake_opens_every_session() {
    let persona = hitesh();
    let client = Arc::new(ScriptedClient::new(&persona));

    orchestrator(&client, 1)
        .run(&persona, &[Message::user("hello", 1)])
        .await
        .unwrap();

    let calls = client.calls();
    let history = &calls[4].history;
    assert_eq!(history[0].role, TurnRole::User);
    assert!(history[0].text.starts_with("Please adopt the Hitesh Choudhary persona"));
    assert_eq!(history[1], Turn::model(persona.handshake_ack.clone()));

    // Accepted replies are stored as canonical step JSON after their prompt.
    assert_eq!(history[2].text, calls[0].prompt);
    assert_eq!(
        history[3].text,
        r#"{"step":"analyze","content":"analyze content"}"#
    );
    assert_eq!(history[9].role, TurnRole::Model);
}

#[tokio::test]
async fn test_promo_query_ends_with_affiliate_link() {
    let persona = hitesh();
    let client = Arc::new(ScriptedClient::new(&persona));

    let result = orchestrator(&client, 1)
        .run(&persona, &[Message::user("Should I join the GenAI cohort?", 1)])
        .await
        .unwrap();

    assert!(result.final_response().contains(&persona.affiliate_url));

    let calls = client.calls();
    assert!(calls[2].prompt.contains("recommend the GenAI cohort course"));
    assert!(calls[3].prompt.contains("GenAI cohort course recommendation"));
    assert!(calls[4].prompt.contains(&persona.affiliate_url));
    assert!(!calls[0].prompt.contains(&persona.affiliate_url));
}

#[tokio::test]
async fn test_prior_conversation_is_replayed_after_handshake() {
    let persona = hitesh();
    let client = Arc::new(ScriptedClient::new(&persona));
    let messages = [
        Message::user("What is a closure?", 1),
        Message::assistant("Closure ek function hai...", "hitesh", 2),
        Message::system("Sorry, there was an error processing your request. Please try again later.", 3),
        Message::user("Give an example", 4),
    ];

    orchestrator(&client, 1).run(&persona, &messages).await.unwrap();

    let first = &client.calls()[0];
    assert_eq!(first.history.len(), 4, "system messages are never forwarded");
    assert_eq!(first.history[2], Turn::user("What is a closure?"));
    assert_eq!(first.history[3], Turn::model("Closure ek function hai..."));
    assert!(first.prompt.contains("Give an example"));
    assert!(!first.prompt.contains("What is a closure?"));
}

#[tokio::test]
async fn test_invalid_conversation_makes_no_calls() {
    let persona = hitesh();
    let client = Arc::new(ScriptedClient::new(&persona));
    let orchestrator = orchestrator(&client, 1);

    for messages in [
        vec![],
        vec![Message::user("   ", 1)],
        vec![Message::user("q", 1), Message::assistant("a", "hitesh", 2)],
    ] {
        let err = orchestrator.run(&persona, &messages).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_reply_at_any_step_is_a_parse_error() {
    let persona = hitesh();

    for step in Step::ALL {
        let client = Arc::new(ScriptedClient::new(&persona));
        client.queue(step, Behavior::Reply("Sure! Let me explain.".to_string()));

        let err = orchestrator(&client, 0)
            .run(&persona, &[Message::user("What is a closure?", 1)])
            .await
            .unwrap_err();

        match err {
            ChatError::Parse { step: failed, .. } => assert_eq!(failed, step),
            other => panic!("expected parse error, got {other:?}"),
        }
        assert_eq!(client.calls().len(), step.position() + 1, "steps after {step} never run");
    }
}

#[tokio::test]
async fn test_wrong_step_name_is_rejected() {
    let persona = hitesh();
    let client = Arc::new(ScriptedClient::new(&persona));
    client.queue(
        Step::Think,
        Behavior::Reply(r#"{"step": "output", "content": "skipping ahead"}"#.to_string()),
    );

    let err = orchestrator(&client, 0)
        .run(&persona, &[Message::user("q", 1)])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("expected step 'think', got 'output'"));
}

#[tokio::test]
async fn test_reprompt_recovers_without_polluting_history() {
    let persona = hitesh();
    let client = Arc::new(ScriptedClient::new(&persona));
    client.queue(Step::Think, Behavior::Reply("not json".to_string()));

    let result = orchestrator(&client, 1)
        .run(&persona, &[Message::user("q", 1)])
        .await
        .expect("second attempt should succeed");
    assert_eq!(result.steps()[1].content, "think content");

    let calls = client.calls();
    assert_eq!(calls.len(), 6);
    assert_eq!(calls[1].step, Step::Think);
    assert_eq!(calls[2].step, Step::Think);
    assert_eq!(calls[1].history, calls[2].history);
    assert!(calls[2].prompt.starts_with(&calls[1].prompt));
    assert!(calls[2].prompt.contains("Your previous reply was rejected"));
    assert_eq!(calls[3].history.len(), 6);
}

#[tokio::test]
async fn test_empty_reply_is_reprompted_not_upstream() {
    let persona = hitesh();
    let client = Arc::new(ScriptedClient::new(&persona));
    client.queue(Step::Output, Behavior::Reply(String::new()));

    let result = orchestrator(&client, 1)
        .run(&persona, &[Message::user("q", 1)])
        .await
        .expect("empty reply should be corrected by a reprompt");
    assert_eq!(result.steps()[2].content, "output content");

    let calls = client.calls();
    assert_eq!(calls.len(), 6);
    assert!(calls[3].prompt.contains("Your previous reply was rejected"));

    let client = Arc::new(ScriptedClient::new(&persona));
    client.queue(Step::Output, Behavior::Reply(String::new()));
    let err = orchestrator(&client, 0)
        .run(&persona, &[Message::user("q", 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Parse { step: Step::Output, .. }));
}

#[tokio::test]
async fn test_reprompts_are_bounded() {
    let persona = hitesh();
    let client = Arc::new(ScriptedClient::new(&persona));
    for _ in 0..3 {
        client.queue(Step::Analyze, Behavior::Reply("{}".to_string()));
    }

    let err = orchestrator(&client, 2)
        .run(&persona, &[Message::user("q", 1)])
        .await
        .unwrap_err();
    assert!(err.is_parse());
    assert_eq!(client.calls().len(), 3);
}

#[tokio::test]
async fn test_result_must_honor_promo_trigger() {
    let persona = hitesh();

    let client = Arc::new(ScriptedClient::new(&persona));
    client.queue(
        Step::Result,
        Behavior::Reply(r#"{"step": "result", "content": "Great course, go for it!"}"#.to_string()),
    );
    let err = orchestrator(&client, 0)
        .run(&persona, &[Message::user("tell me about gen ai", 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Parse { step: Step::Result, .. }));

    let client = Arc::new(ScriptedClient::new(&persona));
    client.queue(
        Step::Result,
        Behavior::Reply(
            serde_json::json!({ "step": "result", "content": format!("See {}", persona.affiliate_url) })
                .to_string(),
        ),
    );
    let err = orchestrator(&client, 0)
        .run(&persona, &[Message::user("What is a closure?", 1)])
        .await
        .unwrap_err();
    assert!(err.is_parse());
}

#[tokio::test]
async fn test_transport_failure_is_upstream() {
    let persona = hitesh();
    let client = Arc::new(ScriptedClient::new(&persona));
    client.queue(
        Step::Output,
        Behavior::Fail(GenerationError::QuotaExceeded {
            message: "RESOURCE_EXHAUSTED".to_string(),
            retry_after: Some(Duration::from_secs(10)),
        }),
    );

    let err = orchestrator(&client, 3)
        .run(&persona, &[Message::user("q", 1)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(client.calls().len(), 3, "transport failures are not reprompted");
}

#[tokio::test(start_paused = true)]
async fn test_hung_call_times_out_as_upstream() {
    let persona = hitesh();
    let client = Arc::new(ScriptedClient::new(&persona));
    client.queue(Step::Validate, Behavior::Hang);

    let err = orchestrator(&client, 1)
        .run(&persona, &[Message::user("q", 1)])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert!(err.to_string().contains("timed out"));
    assert!(matches!(err, ChatError::Upstream { retryable: true, .. }));
}
