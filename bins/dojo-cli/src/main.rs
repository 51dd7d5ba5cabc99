mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "dojo-cli")]
#[command(about = "Dojo CLI - Grade solutions locally, inspect harnesses and manage challenge config", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a local solution against a challenge via the execution service
    Grade {
        /// Challenge catalog file
        #[arg(short, long, default_value = "config/challenges.json")]
        challenge: PathBuf,

        /// File containing the solution code
        #[arg(long)]
        code: PathBuf,

        /// Challenge id (optional when the catalog holds a single challenge)
        #[arg(long)]
        id: Option<Uuid>,

        /// Execution service base URL (defaults to PISTON_URL)
        #[arg(long)]
        piston_url: Option<String>,

        /// Test cases executed concurrently
        #[arg(short, long, default_value = "1")]
        parallel: usize,

        /// Print the report as JSON
        #[arg(long, default_value = "false")]
        json: bool,

        /// Runtime table file
        #[arg(long, default_value = "config/languages.json")]
        languages: PathBuf,
    },

    /// Print the program that would be sent for one test case
    Harness {
        /// Language (python, javascript, typescript)
        #[arg(short, long)]
        language: String,

        /// Function the harness calls
        #[arg(short, long)]
        function: String,

        /// Argument literal, e.g. "2, 3" for python or "[2, 3]" for javascript
        #[arg(short, long)]
        input: String,

        /// File containing the solution code
        #[arg(long)]
        code: PathBuf,
    },

    /// Validate a challenge catalog
    Check {
        /// Catalog path
        #[arg(short, long, default_value = "config/challenges.json")]
        path: PathBuf,
    },

    /// List configured runtimes
    Langs {
        /// Runtime table file
        #[arg(short, long, default_value = "config/languages.json")]
        config: PathBuf,
    },

    /// Scaffold config/languages.json and a sample config/challenges.json
    Init {
        /// Project path
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Grade {
            challenge,
            code,
            id,
            piston_url,
            parallel,
            json,
            languages,
        } => {
            let passed = commands::grade(&commands::GradeArgs {
                catalog_path: challenge,
                code_path: code,
                challenge_id: id,
                piston_url,
                parallel,
                json,
                languages_path: languages,
            })
            .await?;
            if !passed {
                std::process::exit(1);
            }
        }
        Commands::Harness {
            language,
            function,
            input,
            code,
        } => {
            commands::print_harness(&language, &function, &input, &code)?;
        }
        Commands::Check { path } => {
            commands::check_catalog(&path)?;
        }
        Commands::Langs { config } => {
            commands::list_languages(&config)?;
        }
        Commands::Init { path } => {
            commands::init_project(&path)?;
        }
    }

    Ok(())
}
