//! Rendering seam between the dispatcher and whatever displays the chat.
use crate::agent::{AgentEvent, AgentStatus};
use crate::history::{ChatMessage, Role};
use regex::Regex;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

pub const STATUS_ONLINE: &str = "IA Especializada en DLLs - Conectada";
pub const STATUS_OFFLINE: &str = "IA Especializada en DLLs - Modo Offline";

pub trait ChatWindow: Send + Sync {
    fn append(&self, message: &ChatMessage);
    fn emit(&self, event: AgentEvent);
    fn set_status(&self, connected: bool);
}

pub fn status_text(connected: bool) -> &'static str {
    if connected {
        STATUS_ONLINE
    } else {
        STATUS_OFFLINE
    }
}

/// Writes the chat to stdout.
#[derive(Default)]
pub struct TerminalWindow {
    pending: AtomicUsize,
}

impl TerminalWindow {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self, text: &str) {
        let mut out = io::stdout().lock();
        // A closed stdout only loses display output.
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const CODE: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

struct MarkdownRules {
    fence: Regex,
    bold: Regex,
    italic: Regex,
    code: Regex,
}

fn markdown_rules() -> &'static MarkdownRules {
    static RULES: OnceLock<MarkdownRules> = OnceLock::new();
    RULES.get_or_init(|| MarkdownRules {
        fence: Regex::new(r"```(?:[a-zA-Z0-9_+-]*\n)?([\s\S]*?)```").expect("fence pattern"),
        bold: Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern"),
        italic: Regex::new(r"\*([^*\n]+)\*").expect("italic pattern"),
        code: Regex::new(r"`([^`\n]+)`").expect("code pattern"),
    })
}

/// Turns the assistant's light markdown into ANSI styling.
pub fn render_markdown(text: &str) -> String {
    let rules = markdown_rules();
    let text = rules.fence.replace_all(text, format!("{CODE}${{1}}{RESET}"));
    let text = rules.code.replace_all(&text, format!("{CODE}${{1}}{RESET}"));
    let text = rules.bold.replace_all(&text, format!("{BOLD}${{1}}{RESET}"));
    rules
        .italic
        .replace_all(&text, format!("{ITALIC}${{1}}{RESET}"))
        .into_owned()
}

pub fn format_message(message: &ChatMessage) -> String {
    let time = message.timestamp.format("%H:%M:%S");
    match message.role {
        // User text is shown as typed.
        Role::User => format!("\n🧑 Tú • {}\n{}\n", time, message.content),
        Role::Assistant | Role::Error => format!(
            "\n🤖 xpe.manager.ai • {}\n{}\n",
            time,
            render_markdown(&message.content)
        ),
    }
}

/// Line to print when the pending count moves away from `previous`.
fn pending_line(previous: usize, status: AgentStatus) -> Option<&'static str> {
    match (status, previous) {
        (AgentStatus::Thinking, 0) => Some("🤖 escribiendo...\n"),
        (AgentStatus::Idle, 1) => Some("🤖 listo\n"),
        _ => None,
    }
}

impl ChatWindow for TerminalWindow {
    fn append(&self, message: &ChatMessage) {
        self.write(&format_message(message));
    }

    fn emit(&self, event: AgentEvent) {
        // One indicator covers any number of in-flight submissions.
        let previous = match event.status {
            AgentStatus::Thinking => self.pending.fetch_add(1, Ordering::SeqCst),
            // Saturating: an Idle without a Thinking must not wrap.
            AgentStatus::Idle => self
                .pending
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .unwrap_or(0),
        };
        if let Some(line) = pending_line(previous, event.status) {
            self.write(line);
        }
    }

    fn set_status(&self, connected: bool) {
        let dot = if connected { "🟢" } else { "🔴" };
        self.write(&format!("{} {}\n", dot, status_text(connected)));
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records everything the dispatcher renders.
    #[derive(Default)]
    pub struct RecordingWindow {
        pub messages: Mutex<Vec<ChatMessage>>,
        pub events: Mutex<Vec<AgentStatus>>,
        pub statuses: Mutex<Vec<bool>>,
    }

    impl RecordingWindow {
        pub fn messages(&self) -> Vec<ChatMessage> {
            self.messages.lock().unwrap().clone()
        }

        pub fn events(&self) -> Vec<AgentStatus> {
            self.events.lock().unwrap().clone()
        }

        pub fn statuses(&self) -> Vec<bool> {
            self.statuses.lock().unwrap().clone()
        }
    }

    impl ChatWindow for RecordingWindow {
        fn append(&self, message: &ChatMessage) {
            self.messages.lock().unwrap().push(message.clone());
        }

        fn emit(&self, event: AgentEvent) {
            self.events.lock().unwrap().push(event.status);
        }

        fn set_status(&self, connected: bool) {
            self.statuses.lock().unwrap().push(connected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_reflects_connectivity() {
        assert_eq!(status_text(true), STATUS_ONLINE);
        assert_eq!(status_text(false), STATUS_OFFLINE);
    }

    #[test]
    fn user_and_assistant_are_labelled() {
        let user = format_message(&ChatMessage::new(Role::User, "hola"));
        let ai = format_message(&ChatMessage::new(Role::Assistant, "respuesta"));
        assert!(user.contains("Tú") && user.ends_with("hola\n"));
        assert!(ai.contains("xpe.manager.ai") && ai.ends_with("respuesta\n"));
    }

    #[test]
    fn assistant_markdown_becomes_ansi() {
        let rendered = render_markdown("Soy **xpe** y uso `SIMD`, *rápido*");
        assert_eq!(
            rendered,
            format!("Soy {BOLD}xpe{RESET} y uso {CODE}SIMD{RESET}, {ITALIC}rápido{RESET}")
        );
        assert!(!render_markdown(crate::history::GREETING).contains('*'));
    }

    #[test]
    fn code_fence_keeps_body() {
        let rendered = render_markdown("ver:\n```cpp\nint a = 1;\n```");
        assert_eq!(rendered, format!("ver:\n{CODE}int a = 1;\n{RESET}"));
    }

    #[test]
    fn user_text_is_not_styled() {
        let user = format_message(&ChatMessage::new(Role::User, "**hola**"));
        assert!(user.ends_with("**hola**\n"));
    }

    #[test]
    fn indicator_shows_once_and_clears_at_zero() {
        assert!(pending_line(0, AgentStatus::Thinking).is_some());
        assert!(pending_line(1, AgentStatus::Thinking).is_none());
        assert!(pending_line(2, AgentStatus::Idle).is_none());
        assert_eq!(pending_line(1, AgentStatus::Idle), Some("🤖 listo\n"));
        assert!(pending_line(0, AgentStatus::Idle).is_none());
    }

    #[test]
    fn idle_without_thinking_does_not_underflow() {
        let window = TerminalWindow::new();
        window.emit(AgentEvent {
            status: AgentStatus::Idle,
        });
        assert_eq!(window.pending.load(Ordering::SeqCst), 0);
    }
}
