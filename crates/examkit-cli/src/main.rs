//! examkit CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "examkit", version, about = "Timed multiple-choice exam runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take an exam interactively
    Take {
        /// Path to a JSON question bank
        #[arg(long)]
        bank: PathBuf,

        /// Number of questions (default: from config, else 25)
        #[arg(long)]
        size: Option<usize>,

        /// Time limit in seconds (default: from config)
        #[arg(long, conflicts_with = "untimed")]
        duration: Option<u64>,

        /// Run without a time limit
        #[arg(long)]
        untimed: bool,

        /// Test-taker name (blank submits as "Anonymous")
        #[arg(long)]
        name: Option<String>,

        /// Seed for reproducible question selection
        #[arg(long)]
        seed: Option<u64>,

        /// Show explanations in the answer review
        #[arg(long)]
        explanations: bool,

        /// Output directory
        #[arg(long, default_value = "./examkit-results")]
        output: PathBuf,

        /// Output format: json, html, all, none
        #[arg(long, default_value = "json")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a question bank
    Validate {
        /// Path to a JSON question bank
        #[arg(long)]
        bank: PathBuf,
    },

    /// Render a saved score report
    Review {
        /// Report JSON written by `examkit take`
        #[arg(long)]
        report: PathBuf,

        /// Output format: text, markdown, html
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create starter config and example question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examkit=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            bank,
            size,
            duration,
            untimed,
            name,
            seed,
            explanations,
            output,
            format,
            config,
        } => {
            commands::take::execute(
                bank,
                size,
                duration,
                untimed,
                name,
                seed,
                explanations,
                output,
                format,
                config,
            )
            .await
        }
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Review { report, format } => commands::review::execute(report, format),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
