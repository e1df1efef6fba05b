use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "habitroll", version, about = "Habitroll CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User management
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Habit management
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Reward catalog management
    Reward {
        #[command(subcommand)]
        action: commands::reward::RewardAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Complete a habit and draw a reward
    Complete {
        user: i64,
        habit: i64,
        /// Completion time (RFC3339); defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Current streak for each active habit
    Streaks { user: i64 },
    /// Claim an achieved reward
    Claim { user: i64, reward: i64 },
    /// Reward progress for a user
    Progress { user: i64 },
    /// Recent completions for a user
    History {
        user: i64,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Undo a completion (administrative)
    Revert { completion: i64 },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::User { action } => commands::user::run(action),
        Commands::Habit { action } => commands::habit::run(action),
        Commands::Reward { action } => commands::reward::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Complete { user, habit, at } => {
            commands::completion::complete(user, habit, at.as_deref())
        }
        Commands::Streaks { user } => commands::completion::streaks(user),
        Commands::Claim { user, reward } => commands::completion::claim(user, reward),
        Commands::Progress { user } => commands::completion::progress(user),
        Commands::History { user, limit } => commands::completion::history(user, limit),
        Commands::Revert { completion } => commands::completion::revert(completion),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
