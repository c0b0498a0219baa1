//! Plain-text transcript export.
use crate::history::{ChatMessage, Role};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const TITLE: &str = "=== CHAT CON xpe.manager.ai ===";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write transcript to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn sender(role: Role) -> &'static str {
    match role {
        Role::User => "Usuario",
        Role::Assistant | Role::Error => "xpe.manager.ai",
    }
}

/// Header, then one `[time] Sender:\ntext\n\n` block per message in log order.
pub fn render(session_id: &str, exported_at: DateTime<Local>, messages: &[ChatMessage]) -> String {
    let mut text = format!(
        "{}\nSesión: {}\nFecha: {}\n\n",
        TITLE,
        session_id,
        exported_at.format("%d/%m/%Y, %H:%M:%S")
    );
    for message in messages {
        text.push_str(&format!(
            "[{}] {}:\n{}\n\n",
            message.timestamp.format("%H:%M:%S"),
            sender(message.role),
            message.content
        ));
    }
    text
}

pub fn file_name(exported_at: DateTime<Local>) -> String {
    format!("chat_xpe_manager_ai_{}.txt", exported_at.timestamp_millis())
}

/// Writes the transcript into `dir` and returns the file path.
pub fn export_to(
    dir: &Path,
    session_id: &str,
    messages: &[ChatMessage],
) -> Result<PathBuf, ExportError> {
    let now = Local::now();
    let path = dir.join(file_name(now));
    fs::write(&path, render(session_id, now, messages)).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), messages = messages.len(), "Transcript exported");
    Ok(path)
}
