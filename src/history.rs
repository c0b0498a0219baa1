//! Manages the in-memory chat log of the current session.
use chrono::{DateTime, Local};
use rand::Rng;
use serde::{Deserialize, Serialize};

const SESSION_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub const GREETING: &str = "¡Hola! Soy **xpe.manager.ai** - tu asistente especializado en DLLs.\n\n\
Puedo ayudarte con:\n\
• 🔧 **Generar DLLs** de cualquier tipo\n\
• 🚀 **Optimizar** rendimiento con SIMD y memory pooling\n\
• 🔍 **Debuggear** memory leaks, stack corruption, etc.\n\
• 📚 **Explicar conceptos** y mejores prácticas\n\n\
*¿En qué proyecto DLL puedo ayudarte hoy?*";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default = "Local::now")]
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }
}

/// Per-run session identity. Never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Local>,
}

impl Session {
    pub fn generate() -> Self {
        let started_at = Local::now();
        Self {
            id: generate_session_id(started_at.timestamp_millis()),
            started_at,
        }
    }
}

/// `session_<millis>_<9 base36 chars>`
pub fn generate_session_id(millis: i64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("session_{}_{}", millis, suffix)
}

/// Append-only message list. Order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    /// A log holding only the assistant greeting.
    pub fn with_greeting() -> Self {
        Self {
            messages: vec![ChatMessage::new(Role::Assistant, GREETING)],
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Drops everything except a fresh greeting.
    pub fn reset(&mut self) {
        *self = Self::with_greeting();
    }
}
