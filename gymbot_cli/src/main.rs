use clap::{Parser, Subcommand};
use gymbot_core::*;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gymbot")]
#[command(about = "Gym training plan and workout chat bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session (default)
    Chat {
        /// Chat identity to converse as
        #[arg(long, default_value_t = 1)]
        user: i64,

        #[arg(long, default_value = "")]
        username: String,
    },

    /// Feed inputs as separate events and print the replies
    ///
    /// Inputs are commands (/createplan), plain text, or callback presses
    /// (>tag or >tag:id, as printed under replies). Each run is its own
    /// process, so an in-progress conversation continues across invocations.
    Send {
        #[arg(long)]
        user: i64,

        #[arg(long, default_value = "")]
        username: String,

        #[arg(required = true)]
        input: Vec<String>,
    },
}

fn main() -> Result<()> {
    gymbot_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Some(Commands::Chat { user, username }) => cmd_chat(&data_dir, user, &username, &config),
        Some(Commands::Send {
            user,
            username,
            input,
        }) => cmd_send(&data_dir, user, &username, &input, &config),
        None => cmd_chat(&data_dir, 1, "", &config),
    }
}

fn build_engine(data_dir: &Path, config: &Config) -> Result<Engine<LocalBackend>> {
    std::fs::create_dir_all(data_dir)?;
    let backend = LocalBackend::open(local_backend::backend_path(data_dir))?;
    let store = SessionStore::open(data_dir.join("sessions"))?;
    Ok(Engine::new(backend, store, config))
}

fn cmd_chat(data_dir: &Path, user: i64, username: &str, config: &Config) -> Result<()> {
    let engine = build_engine(data_dir, config)?;

    println!("Gym bot ready. Type /help for commands; Ctrl-D quits.");
    print!("> ");
    io::stdout().flush()?;

    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            match engine.handle(user, username, parse_event(line)) {
                Ok(replies) => print_replies(&replies),
                Err(e) => eprintln!("error: {}", e),
            }
        }
        print!("> ");
        io::stdout().flush()?;
    }

    println!();
    Ok(())
}

fn cmd_send(
    data_dir: &Path,
    user: i64,
    username: &str,
    inputs: &[String],
    config: &Config,
) -> Result<()> {
    let engine = build_engine(data_dir, config)?;

    for input in inputs {
        let replies = engine.handle(user, username, parse_event(input))?;
        print_replies(&replies);
    }
    Ok(())
}

/// Map a typed line onto an engine event.
///
/// Lines starting with `/` are commands, `>` marks a callback press; anything
/// else is free text (including unknown commands, which the engine answers
/// with a help hint).
fn parse_event(line: &str) -> Event {
    if let Some(command) = Command::parse(line) {
        return Event::Command(command);
    }
    if let Some(data) = line.strip_prefix('>') {
        if let Some(action) = Action::parse(data.trim()) {
            return Event::Callback(action);
        }
    }
    Event::Text(line.to_string())
}

fn print_replies(replies: &[Reply]) {
    for reply in replies {
        println!("{}", reply.text);
        if !reply.keyboard.is_empty() {
            println!("  [{}]", reply.keyboard.join(" | "));
        }
        for button in &reply.buttons {
            println!("  ({}) >{}", button.label, button.action.encode());
        }
        println!();
    }
}
