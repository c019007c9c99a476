use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "hja")]
#[command(about = "Corporate-number check and registry reconciliation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one corporate number offline (normalization + check digit)
    CheckDigit {
        /// Number as written; separators and full-width digits are accepted
        number: String,
    },

    /// Reconcile a batch request file against the registry and print the result JSON
    Reconcile {
        /// JSON file: {"records": [{"corporate_number": "...", "name": "..."}]}
        #[arg(long)]
        input: String,

        /// Layered config paths in merge order (defaults when omitted)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Override reconcile.concurrency
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> overlays)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::CheckDigit { number } => commands::check_digit::run(&number)?,

        Commands::Reconcile {
            input,
            config_paths,
            concurrency,
        } => commands::reconcile::run(&input, &config_paths, concurrency).await?,

        Commands::ConfigHash { paths } => {
            let loaded = hja_config::load_layered_yaml(paths.as_slice())?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
