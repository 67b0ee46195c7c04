use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use loona_companion::interpreter::{CommandInterpreter, Intent};
use loona_companion::{Config, Session};

/// Loona - voice companion console
#[derive(Parser)]
#[command(name = "loona", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/loona/config.toml)
    #[arg(short, long, env = "LOONA_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run an interactive console session (default)
    Run,
    /// Show how an utterance would be interpreted
    Interpret {
        /// Utterance text, e.g. "Hello Loona, look left"
        text: Vec<String>,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,loona_companion=info",
        1 => "info,loona_companion=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => Session::new(config).run().await?,
        Command::Interpret { text } => interpret(&config, &text.join(" ")),
        Command::Config => println!("{config:#?}"),
    }

    Ok(())
}

/// Print the wake word and command classification of an utterance
fn interpret(config: &Config, text: &str) {
    let interpreter = CommandInterpreter::for_companion(
        &config.preferences.companion_name,
        &config.wake_words,
    );

    match interpreter.matcher().strip(text) {
        Some((wake, _)) => println!("wake word: {wake}"),
        None => println!("wake word: none"),
    }

    match interpreter.extract_command(text) {
        Some(command) => {
            println!("command:   {command}");
            match interpreter.classify(&command) {
                Intent::Hard(hard) => println!("intent:    {hard:?}"),
                Intent::Chat(content) => println!("intent:    chat ({content})"),
            }
        }
        None => println!("command:   none (say \"Hello {}\" first)", config.preferences.companion_name),
    }
}
