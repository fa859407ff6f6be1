use clap::{Parser, Subcommand};

mod app;
mod bell;
mod center;
mod commands;

#[derive(Parser)]
#[command(name = "medireminder-cli", version, about = "MediReminder CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Medication management
    Med {
        #[command(subcommand)]
        action: commands::med::MedAction,
    },
    /// Adherence history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Registered reminders
    Reminder {
        #[command(subcommand)]
        action: commands::reminder::ReminderAction,
    },
    /// Dose prompt control
    Prompt {
        #[command(subcommand)]
        action: commands::prompt::PromptAction,
    },
    /// Deliver reminders as they fall due and answer prompts from stdin
    Watch(commands::watch::WatchArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr so stdout stays machine-readable.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("medireminder=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Med { action } => commands::med::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Reminder { action } => commands::reminder::run(action).await,
        Commands::Prompt { action } => commands::prompt::run(action),
        Commands::Watch(args) => commands::watch::run(args).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
