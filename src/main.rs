mod agent;
mod backend;
mod commands;
mod history;
mod responses;
mod transcript;
mod window;

use agent::{Agent, ChatContext, TokioDelay};
use backend::HttpBackend;
use commands::Command;
use history::Session;
use responses::SUGGESTIONS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use window::{ChatWindow, TerminalWindow};

const APP_DIR: &str = "xpe-assistant";

// --- Configuration Structures ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
struct AppConfig {
    backend_url: String,
    health_timeout_secs: u64,
    fallback_delay_min_ms: u64,
    fallback_delay_max_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:9000".to_string(),
            health_timeout_secs: 5,
            fallback_delay_min_ms: 1000,
            fallback_delay_max_ms: 2000,
        }
    }
}

#[derive(Debug, Error)]
enum ConfigError {
    #[error("could not locate the platform {0} directory")]
    NoPlatformDir(&'static str),
    #[error("failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode default settings: {0}")]
    Encode(#[from] serde_json::Error),
}

// --- Filesystem and Config Logic ---

fn ensure_dir(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if !path.exists() {
        fs::create_dir_all(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
    }
    Ok(path)
}

fn get_app_data_dir() -> Result<PathBuf, ConfigError> {
    let data_dir = dirs_next::data_dir().ok_or(ConfigError::NoPlatformDir("data"))?;
    ensure_dir(data_dir.join(APP_DIR).join("data"))
}

fn get_app_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs_next::config_dir().ok_or(ConfigError::NoPlatformDir("config"))?;
    Ok(ensure_dir(config_dir.join(APP_DIR).join("configuration"))?.join("settings.json"))
}

fn write_default_config(config_path: &Path) -> Result<AppConfig, ConfigError> {
    let default_config = AppConfig::default();
    fs::write(config_path, serde_json::to_string_pretty(&default_config)?).map_err(|source| {
        ConfigError::Io {
            path: config_path.to_path_buf(),
            source,
        }
    })?;
    Ok(default_config)
}

/// Reads the settings file, writing defaults when it is missing or unreadable.
fn load_or_initialize_config(config_path: &Path) -> Result<AppConfig, ConfigError> {
    if !config_path.exists() {
        info!(path = %config_path.display(), "Writing default settings");
        return write_default_config(config_path);
    }

    let content = fs::read_to_string(config_path).unwrap_or_default();
    match serde_json::from_str(&content) {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "Settings unreadable, restoring defaults");
            write_default_config(config_path)
        }
    }
}

fn init_tracing(log_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "xpe-assistant.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .init();
    guard
}

fn print_suggestions() {
    println!("Sugerencias:");
    for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
        println!("  {}. {}", i + 1, suggestion);
    }
}

fn spawn_submit(tasks: &mut JoinSet<()>, agent: &Arc<Agent>, text: String) {
    let agent = agent.clone();
    tasks.spawn(async move {
        agent.submit(&text).await;
    });
}

/// Decodes one raw stdin line; bytes that aren't UTF-8 become U+FFFD.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

fn render_log(context: &ChatContext, window: &dyn ChatWindow) {
    match context.messages() {
        Ok(messages) => messages.iter().for_each(|m| window.append(m)),
        Err(e) => error!(error = %e, "Cannot render chat log"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = get_app_data_dir()?;
    let _log_guard = init_tracing(&ensure_dir(data_dir.join("logs"))?);
    let transcripts_dir = ensure_dir(data_dir.join("transcripts"))?;
    let config_path = get_app_config_path()?;
    let config = load_or_initialize_config(&config_path)?;

    let session = Session::generate();
    info!(session = %session.id, started_at = %session.started_at, backend = %config.backend_url, "Starting chat session");

    let window: Arc<dyn ChatWindow> = Arc::new(TerminalWindow::new());
    let backend = Arc::new(HttpBackend::new(
        config.backend_url.clone(),
        Duration::from_secs(config.health_timeout_secs),
    ));
    let agent = Arc::new(
        Agent::new(Arc::new(ChatContext::new(session)), backend, window.clone()).with_delay(
            Arc::new(TokioDelay),
            Duration::from_millis(config.fallback_delay_min_ms),
            Duration::from_millis(config.fallback_delay_max_ms),
        ),
    );
    let context = agent.context().clone();

    println!("🧠 xpe.manager.ai  (sesión {})", context.session.id);
    println!("Escribe /help para ver los comandos.");
    agent.probe().await;
    render_log(&context, window.as_ref());

    let mut tasks = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).split(b'\n');

    loop {
        let line = match lines.next_segment().await {
            Ok(Some(raw)) => decode_line(&raw),
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "Failed to read input, ending session");
                break;
            }
        };
        while tasks.try_join_next().is_some() {}

        match Command::parse(&line) {
            Command::Send(text) => spawn_submit(&mut tasks, &agent, text),
            Command::Suggest(None) => print_suggestions(),
            Command::Suggest(Some(n)) => match n.checked_sub(1).and_then(|i| SUGGESTIONS.get(i)) {
                Some(suggestion) => spawn_submit(&mut tasks, &agent, suggestion.to_string()),
                None => println!("No existe la sugerencia {}.", n),
            },
            Command::Clear => match context.clear() {
                Ok(()) => render_log(&context, window.as_ref()),
                Err(e) => error!(error = %e, "Cannot clear chat log"),
            },
            Command::Export => {
                let exported = context
                    .messages()
                    .map_err(anyhow::Error::from)
                    .and_then(|messages| {
                        transcript::export_to(&transcripts_dir, &context.session.id, &messages)
                            .map_err(anyhow::Error::from)
                    });
                match exported {
                    Ok(path) => println!("💾 Conversación exportada a {}", path.display()),
                    Err(e) => {
                        error!(error = %e, "Export failed");
                        println!("❌ No se pudo exportar la conversación.");
                    }
                }
            }
            Command::Status => window.set_status(context.is_connected()),
            Command::Config => {
                if let Err(e) = opener::open(&config_path) {
                    warn!(error = %e, "Failed to open config file");
                    println!("Archivo de configuración: {}", config_path.display());
                }
            }
            Command::Help => println!("{}", commands::HELP),
            Command::Quit => break,
            Command::Unknown(raw) => println!("Comando desconocido: {} (prueba /help)", raw),
        }
    }

    // Let in-flight answers land before exiting.
    while tasks.join_next().await.is_some() {}
    info!(session = %context.session.id, "Chat session ended");
    Ok(())
}
