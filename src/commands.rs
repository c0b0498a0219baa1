//! Parsing of the lines typed at the chat prompt.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the assistant.
    Send(String),
    Clear,
    Export,
    /// `None` lists the suggestions, `Some(n)` sends the 1-based n-th one.
    Suggest(Option<usize>),
    Status,
    Config,
    Help,
    Quit,
    Unknown(String),
}

pub const HELP: &str = "Comandos:
  /suggest [n]  lista las sugerencias o envía la n-ésima
  /clear        limpia el chat
  /export       exporta la conversación a un archivo de texto
  /status       muestra el estado de conexión
  /config       abre el archivo de configuración
  /help         muestra esta ayuda
  /quit         salir";

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Send(line.to_string());
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next();

        match name.as_str() {
            "clear" => Command::Clear,
            "export" => Command::Export,
            "suggest" => match arg.map(str::parse::<usize>) {
                None => Command::Suggest(None),
                Some(Ok(n)) => Command::Suggest(Some(n)),
                Some(Err(_)) => Command::Unknown(trimmed.to_string()),
            },
            "status" => Command::Status,
            "config" => Command::Config,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(trimmed.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_sent_untouched() {
        assert_eq!(
            Command::parse("  hola que tal "),
            Command::Send("  hola que tal ".to_string())
        );
        assert_eq!(Command::parse(""), Command::Send(String::new()));
    }

    #[test]
    fn slash_commands_are_recognized() {
        assert_eq!(Command::parse("/clear"), Command::Clear);
        assert_eq!(Command::parse(" /EXPORT "), Command::Export);
        assert_eq!(Command::parse("/status"), Command::Status);
        assert_eq!(Command::parse("/config"), Command::Config);
        assert_eq!(Command::parse("/?"), Command::Help);
        assert_eq!(Command::parse("/exit"), Command::Quit);
    }

    #[test]
    fn suggest_takes_optional_index() {
        assert_eq!(Command::parse("/suggest"), Command::Suggest(None));
        assert_eq!(Command::parse("/suggest 3"), Command::Suggest(Some(3)));
        assert_eq!(
            Command::parse("/suggest tres"),
            Command::Unknown("/suggest tres".to_string())
        );
    }

    #[test]
    fn unknown_and_bare_slash() {
        assert_eq!(Command::parse("/foo"), Command::Unknown("/foo".to_string()));
        assert_eq!(Command::parse("/"), Command::Unknown("/".to_string()));
    }
}
