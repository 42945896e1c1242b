use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use chatbridge::config::{ConfigSource, FileConfigSource};
use chatbridge::observability::init_tracing;
use chatbridge::protocol::NormalizedEvent;
use chatbridge::session::{ChatSession, Turn};
use chatbridge::transport::HttpTransport;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Send(&'a str),
    New,
    Save(&'a str),
    Load(&'a str),
    Quit,
    Empty,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line);
    };
    let (name, arg) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(name, arg)| (name, arg.trim()));
    match (name, arg) {
        ("new", _) => Command::New,
        ("quit" | "exit", _) => Command::Quit,
        ("save", path) if !path.is_empty() => Command::Save(path),
        ("load", path) if !path.is_empty() => Command::Load(path),
        _ => Command::Unknown(line),
    }
}

fn save_turns(path: &Path, turns: &[Turn]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(turns).map_err(io::Error::other)?;
    std::fs::write(path, json)
}

fn load_turns(path: &Path) -> io::Result<Vec<Turn>> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn print_event(event: &NormalizedEvent) {
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", event.to_json());
    let _ = stdout.flush();
}

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let source = FileConfigSource::new(&config_path);
    let config = source.snapshot().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        eprintln!("Please copy 'config.example.yaml' to 'config.yaml' and modify as needed.");
        std::process::exit(1);
    });

    init_tracing(&config.features.log_level, &config.features.log_format);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Failed to initialize Tokio runtime: {e}");
            std::process::exit(1);
        });

    let session = ChatSession::new(Arc::new(source), HttpTransport::new(&config.transport));
    tracing::info!(
        config = %config_path,
        session_id = %session.get_session_id(),
        "chat session ready"
    );

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Failed to read input: {e}");
                break;
            }
        };

        match parse_command(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::New => match session.new_session() {
                Ok(()) => eprintln!("Started session {}", session.get_session_id()),
                Err(e) => eprintln!("{e}"),
            },
            Command::Save(path) => match save_turns(Path::new(path), &session.get_messages()) {
                Ok(()) => eprintln!("Saved conversation to {path}"),
                Err(e) => eprintln!("Failed to save conversation: {e}"),
            },
            Command::Load(path) => match load_turns(Path::new(path)) {
                Ok(turns) => {
                    let count = turns.len();
                    match session.load_session(turns) {
                        Ok(()) => eprintln!("Loaded {count} turns from {path}"),
                        Err(e) => eprintln!("{e}"),
                    }
                }
                Err(e) => eprintln!("Failed to load conversation: {e}"),
            },
            Command::Unknown(input) => eprintln!("Unknown command: {input}"),
            Command::Send(text) => {
                let mut sink = |event: NormalizedEvent| print_event(&event);
                if let Err(e) = runtime.block_on(session.send_message(text, &mut sink)) {
                    eprintln!("Error: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  hello there "), Command::Send("hello there"));
        assert_eq!(parse_command("/new"), Command::New);
        assert_eq!(parse_command("/save chat.json"), Command::Save("chat.json"));
        assert_eq!(parse_command("/load  saved/chat.json "), Command::Load("saved/chat.json"));
        assert_eq!(parse_command("/save"), Command::Unknown("/save"));
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert_eq!(parse_command("   "), Command::Empty);
    }

    #[test]
    fn test_save_then_load_turns() {
        let path = std::env::temp_dir().join(format!(
            "chatbridge-turns-{}-{}.json",
            std::process::id(),
            fastrand::u64(..)
        ));
        let turns = vec![Turn::user("hi"), Turn::assistant("hello")];
        save_turns(&path, &turns).expect("save turns");
        assert_eq!(load_turns(&path).expect("load turns"), turns);
        let _ = std::fs::remove_file(&path);
    }
}
