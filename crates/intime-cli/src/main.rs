use clap::{CommandFactory, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "intime", version, about = "Intime: bank balance to remaining lifetime")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register today's balance and restart the countdown
    Register {
        /// Balance, e.g. "1,000,000" (non-digits are ignored)
        amount: String,
    },
    /// Delete a past entry by day key (the active entry cannot be deleted)
    Delete {
        /// Day key, e.g. "2025-06-20" (or "06-20" with the month_day policy)
        key: String,
    },
    /// List all entries
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the reconciled live state as JSON
    Status,
    /// Convert an amount without storing anything
    Convert {
        amount: String,
    },
    /// Run the live countdown; type an amount to register, "delete <key>" to delete
    Watch {
        /// Print every event as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("INTIME_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Register { amount } => commands::entry::register(&amount),
        Commands::Delete { key } => commands::entry::delete(&key),
        Commands::List { json } => commands::entry::list(json),
        Commands::Status => commands::status::status(),
        Commands::Convert { amount } => commands::status::convert(&amount),
        Commands::Watch { json } => commands::watch::run(json),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "intime", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
