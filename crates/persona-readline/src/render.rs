//! Terminal rendering of replay events and conversation messages.

use std::collections::HashMap;
use std::io::Write;

use colored::Colorize;
use persona_application::{GENERIC_FAILURE_MESSAGE, Profile, ReplayEvent, format_time, step_indicator};
use persona_core::{ErrorKind, Message, MessageRole};

pub struct Renderer {
    profiles: HashMap<String, Profile>,
    progress_open: bool,
}

impl Renderer {
    pub fn new(profiles: HashMap<String, Profile>) -> Self {
        Self {
            profiles,
            progress_open: false,
        }
    }

    pub fn display_name<'a>(&'a self, persona_id: &'a str) -> &'a str {
        self.profiles
            .get(persona_id)
            .map(|profile| profile.display_name.as_str())
            .unwrap_or(persona_id)
    }

    pub fn event(&mut self, event: &ReplayEvent) {
        match event {
            ReplayEvent::StepStarted { step, content, .. } => {
                self.close_progress();
                println!("{}", step_indicator(*step).bright_yellow());
                for line in content.lines() {
                    println!("   {}", line.bright_black());
                }
            }
            ReplayEvent::Progress { tokens, .. } => {
                print!("\r   {}", format!("{tokens} tokens").bright_black());
                // Partial lines need an explicit flush.
                let _ = std::io::stdout().flush();
                self.progress_open = true;
            }
            ReplayEvent::Cleared { .. }
            | ReplayEvent::Committed { .. }
            | ReplayEvent::Cancelled { .. } => self.close_progress(),
        }
    }

    pub fn message(&mut self, message: &Message) {
        self.close_progress();
        let time = format_time(message.timestamp);
        match message.role {
            MessageRole::User => {
                println!("{}", format!("[{time}] You: {}", message.content).green());
            }
            MessageRole::Assistant => {
                let author = self.display_name(message.persona.as_deref().unwrap_or("assistant"));
                println!("{}", format!("[{time}] {author}").bright_magenta());
                for line in message.content.lines() {
                    println!("{}", line.bright_blue());
                }
                println!();
            }
            MessageRole::System => {
                println!("{}", format!("[{time}] {}", message.content).red());
            }
        }
    }

    pub fn failure(&mut self, kind: ErrorKind) {
        self.close_progress();
        println!("{} {}", GENERIC_FAILURE_MESSAGE.red(), format!("({kind:?})").bright_black());
    }

    fn close_progress(&mut self) {
        if self.progress_open {
            println!();
            self.progress_open = false;
        }
    }
}
