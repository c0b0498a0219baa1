//! The core Agent logic module: connectivity probe and message dispatch.

use crate::backend::Backend;
use crate::history::{ChatLog, ChatMessage, Role, Session};
use crate::responses::ResponseTable;
use crate::window::ChatWindow;
use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

pub const SEND_FAILED_TEXT: &str = "❌ Error de conexión. Por favor intenta de nuevo.";

// --- Agent Event Structures ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEvent {
    pub status: AgentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    /// A submission is being resolved; the pending indicator is shown.
    Thinking,
    /// The submission finished, whatever the path.
    Idle,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("chat log is unavailable: a writer panicked")]
    LogPoisoned,
}

/// Which path resolved a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, nothing appended.
    Ignored,
    Remote,
    /// The backend was tried and failed; the canned table answered.
    Fallback,
    /// Disconnected; the backend was never tried.
    Offline,
    /// Even the local path could not run; an error bubble was rendered.
    Failed,
}

// --- Shared chat state ---

/// Session identity, connectivity flag and message log of one run.
pub struct ChatContext {
    pub session: Session,
    connected: AtomicBool,
    log: Mutex<ChatLog>,
}

impl ChatContext {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            connected: AtomicBool::new(false),
            log: Mutex::new(ChatLog::with_greeting()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn log(&self) -> Result<MutexGuard<'_, ChatLog>, AgentError> {
        self.log.lock().map_err(|_| AgentError::LogPoisoned)
    }

    pub fn append(&self, message: ChatMessage) -> Result<(), AgentError> {
        self.log()?.push(message);
        Ok(())
    }

    pub fn messages(&self) -> Result<Vec<ChatMessage>, AgentError> {
        Ok(self.log()?.messages().to_vec())
    }

    pub fn clear(&self) -> Result<(), AgentError> {
        self.log()?.reset();
        Ok(())
    }
}

// --- Injectable delay ---

#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// --- Agent Core Structures ---

pub struct Agent {
    context: Arc<ChatContext>,
    backend: Arc<dyn Backend>,
    window: Arc<dyn ChatWindow>,
    table: ResponseTable,
    delay: Arc<dyn Delay>,
    delay_min: Duration,
    delay_max: Duration,
}

impl Agent {
    pub fn new(
        context: Arc<ChatContext>,
        backend: Arc<dyn Backend>,
        window: Arc<dyn ChatWindow>,
    ) -> Self {
        Self {
            context,
            backend,
            window,
            table: ResponseTable::offline(),
            delay: Arc::new(TokioDelay),
            delay_min: Duration::from_millis(1000),
            delay_max: Duration::from_millis(2000),
        }
    }

    /// Bounds are swapped if given in the wrong order.
    pub fn with_delay(mut self, delay: Arc<dyn Delay>, min: Duration, max: Duration) -> Self {
        self.delay = delay;
        self.delay_min = min.min(max);
        self.delay_max = min.max(max);
        self
    }

    pub fn context(&self) -> &Arc<ChatContext> {
        &self.context
    }

    /// One-shot health check. Failure leaves the chat in offline mode for the rest of the run.
    #[instrument(skip(self), fields(session = %self.context.session.id))]
    pub async fn probe(&self) -> bool {
        let connected = match self.backend.health().await {
            Ok(()) => {
                info!("Assistant backend reachable");
                true
            }
            Err(e) => {
                warn!(error = %e, "Assistant backend unavailable, using offline mode");
                false
            }
        };
        self.context.set_connected(connected);
        self.window.set_status(connected);
        connected
    }

    #[instrument(skip(self, text), fields(session = %self.context.session.id))]
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let message = text.trim();
        if message.is_empty() {
            debug!("Ignoring blank input");
            return SubmitOutcome::Ignored;
        }

        let user = ChatMessage::new(Role::User, message);
        let outcome = match self.context.append(user.clone()) {
            Ok(()) => {
                self.window.append(&user);
                self.window.emit(AgentEvent {
                    status: AgentStatus::Thinking,
                });
                let outcome = match self.respond(message).await {
                    Ok(outcome) => outcome,
                    Err(e) => self.send_failed(e),
                };
                self.window.emit(AgentEvent {
                    status: AgentStatus::Idle,
                });
                outcome
            }
            Err(e) => self.send_failed(e),
        };

        info!(?outcome, "Submission resolved");
        outcome
    }

    fn send_failed(&self, e: AgentError) -> SubmitOutcome {
        error!(error = %e, "Send failed");
        let bubble = ChatMessage::new(Role::Error, SEND_FAILED_TEXT);
        self.window.append(&bubble);
        // The log is the thing that failed; the bubble is display-only then.
        let _ = self.context.append(bubble);
        SubmitOutcome::Failed
    }

    async fn respond(&self, message: &str) -> Result<SubmitOutcome, AgentError> {
        let (reply, outcome) = if self.context.is_connected() {
            match self.backend.chat(message, &self.context.session.id).await {
                Ok(reply) => (reply, SubmitOutcome::Remote),
                Err(e) => {
                    warn!(error = %e, "Remote assistant failed, falling back to canned response");
                    if e.is_transport() {
                        self.context.set_connected(false);
                        self.window.set_status(false);
                    }
                    (self.resolve_locally(message).await, SubmitOutcome::Fallback)
                }
            }
        } else {
            (self.resolve_locally(message).await, SubmitOutcome::Offline)
        };

        let reply = ChatMessage::new(Role::Assistant, reply);
        self.context.append(reply.clone())?;
        self.window.append(&reply);
        Ok(outcome)
    }

    async fn resolve_locally(&self, message: &str) -> String {
        let response = self.table.resolve(message).to_string();
        let delay = self.pick_delay();
        debug!(delay_ms = delay.as_millis() as u64, "Simulating processing latency");
        self.delay.wait(delay).await;
        response
    }

    fn pick_delay(&self) -> Duration {
        if self.delay_min == self.delay_max {
            return self.delay_min;
        }
        rand::thread_rng().gen_range(self.delay_min..=self.delay_max)
    }
}
