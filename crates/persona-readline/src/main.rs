use std::borrow::Cow::{self, Borrowed, Owned};
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::{RwLock, mpsc};
use tracing_subscriber::EnvFilter;

use persona_application::{
    ChatApi, ChatController, ConversationStateStore, GitHubProfileLookup, HttpChatApi, Profile,
    ProfileLookup, ReplayEvent, ReplayScheduler, ReplayTiming, SubmitOutcome, resolve_profile,
};
use persona_core::persona::{PersonaSummary, get_default_presets};

mod render;

use render::Renderer;

#[derive(Parser)]
#[command(name = "persona-chat")]
#[command(about = "Chat with a persona through the five-step protocol", long_about = None)]
struct Cli {
    /// Base URL of the persona server
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    /// Persona to start with
    #[arg(long, default_value = "hitesh")]
    persona: String,

    /// Skip GitHub profile lookups and use configured names
    #[arg(long)]
    no_profiles: bool,
}

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: vec![
                "/persona".to_string(),
                "/personas".to_string(),
                "/clear".to_string(),
            ],
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// Slash commands understood by the REPL.
enum Command<'a> {
    Quit,
    SwitchPersona(&'a str),
    ListPersonas,
    Clear,
    Unknown(&'a str),
    Ask(&'a str),
}

fn parse_command(input: &str) -> Command<'_> {
    match input {
        "quit" | "exit" => Command::Quit,
        "/personas" => Command::ListPersonas,
        "/clear" => Command::Clear,
        _ => match input.strip_prefix("/persona ") {
            Some(id) => Command::SwitchPersona(id.trim()),
            None if input.starts_with('/') => Command::Unknown(input),
            None => Command::Ask(input),
        },
    }
}

async fn load_personas(api: &HttpChatApi) -> Vec<PersonaSummary> {
    match api.list_personas().await {
        Ok(personas) if !personas.is_empty() => personas,
        Ok(_) => get_default_presets().iter().map(PersonaSummary::from).collect(),
        Err(err) => {
            tracing::warn!("Could not list personas from {}: {}", api.base_url(), err);
            get_default_presets().iter().map(PersonaSummary::from).collect()
        }
    }
}

async fn load_profiles(personas: &[PersonaSummary], lookup: Option<&dyn ProfileLookup>) -> HashMap<String, Profile> {
    let mut profiles = HashMap::new();
    for persona in personas {
        profiles.insert(persona.id.clone(), resolve_profile(lookup, persona).await);
    }
    profiles
}

/// Submits `input` while rendering replay events as they arrive.
async fn ask(
    controller: &ChatController,
    events: &mut mpsc::UnboundedReceiver<ReplayEvent>,
    renderer: &mut Renderer,
    input: &str,
) -> SubmitOutcome {
    let submit = controller.submit(input);
    tokio::pin!(submit);

    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            Some(event) = events.recv() => renderer.event(&event),
        }
    };
    while let Ok(event) = events.try_recv() {
        renderer.event(&event);
    }
    outcome
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // ===== Backend Initialization =====
    let api = HttpChatApi::new(&cli.server);
    let personas = load_personas(&api).await;
    if !personas.iter().any(|p| p.id == cli.persona) {
        bail!("Unknown persona '{}'", cli.persona);
    }

    let github = GitHubProfileLookup::default();
    let lookup: Option<&dyn ProfileLookup> = if cli.no_profiles { None } else { Some(&github) };
    let mut renderer = Renderer::new(load_profiles(&personas, lookup).await);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let replay = Arc::new(ReplayScheduler::new(ReplayTiming::default()).with_events(event_tx));
    let store = Arc::new(RwLock::new(ConversationStateStore::new(cli.persona.clone())));
    let controller = ChatController::new(Arc::new(api), store, replay);

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Persona Chat ===".bright_magenta().bold());
    println!(
        "{}",
        "Type a question, '/persona <id>' to switch, '/personas' to list, '/clear' to reset, or 'quit' to exit."
            .bright_black()
    );
    println!(
        "{}",
        format!("Talking to {}", renderer.display_name(&cli.persona)).bright_green()
    );
    println!();

    // ===== Main REPL Loop =====
    loop {
        let active = controller.active_persona().await;
        let readline = rl.readline(&format!("{active}> "));

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match parse_command(trimmed) {
                    Command::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Command::ListPersonas => {
                        for persona in &personas {
                            let marker = if persona.id == active { "*" } else { " " };
                            println!(
                                "{} {} {}",
                                marker,
                                persona.id.bright_cyan(),
                                renderer.display_name(&persona.id)
                            );
                        }
                    }
                    Command::SwitchPersona(id) => {
                        if personas.iter().any(|p| p.id == id) {
                            controller.switch_persona(id).await;
                            println!(
                                "{}",
                                format!("Switched to {}", renderer.display_name(id)).bright_green()
                            );
                        } else {
                            println!("{}", format!("Unknown persona '{id}'").yellow());
                        }
                    }
                    Command::Clear => {
                        controller.clear().await;
                        println!("{}", "Conversation cleared.".bright_black());
                    }
                    Command::Unknown(command) => {
                        println!("{}", format!("Unknown command {command}").bright_black());
                    }
                    Command::Ask(question) => {
                        match ask(&controller, &mut event_rx, &mut renderer, question).await {
                            SubmitOutcome::Committed(message) => renderer.message(&message),
                            SubmitOutcome::Failed(kind) => renderer.failure(kind),
                            SubmitOutcome::Busy => {
                                println!("{}", "Still answering the previous question...".yellow());
                            }
                            SubmitOutcome::Cancelled => {
                                println!("{}", "(answer discarded)".bright_black());
                            }
                            SubmitOutcome::Ignored => {}
                        }
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
