mod commands;
mod host;
mod ledger_file;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Bike-share workflow engine.
#[derive(Parser)]
#[command(name = "bikeshare", version, about = "Bike-share workflow engine")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log engine decisions at debug level (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the ledger lives and how the engine is configured.
#[derive(Args, Debug, Clone)]
pub(crate) struct EngineArgs {
    /// Ledger file; created on first successful write
    #[arg(long, default_value = "ledger.json")]
    pub ledger: PathBuf,

    /// TOML engine configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Development mode: skip identity extraction and access checks
    #[arg(long)]
    pub dev: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one operation against the ledger file
    Invoke {
        /// Operation name, e.g. startRide
        function: String,
        /// Operation arguments, in schema order
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,
        #[command(flatten)]
        engine: EngineArgs,
        /// Caller organization
        #[arg(long)]
        org: Option<String>,
        /// Common name of the caller certificate's issuer
        #[arg(long)]
        issuer: Option<String>,
    },

    /// Run a JSON script of invocations in order, stopping at the first failure
    Replay {
        /// Path to the script: [{"function", "args", "org"?, "issuer"?, "at"?}, ...]
        script: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// List every operation with its role and argument schema
    Operations,

    /// Parse and validate an engine configuration file
    CheckConfig {
        /// Path to the TOML configuration
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Invoke {
            function,
            args,
            engine,
            org,
            issuer,
        } => {
            commands::invoke::cmd_invoke(
                &function,
                &args,
                &engine,
                org.as_deref(),
                issuer.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
        Commands::Replay { script, engine } => {
            commands::replay::cmd_replay(&script, &engine, cli.output, cli.quiet);
        }
        Commands::Operations => {
            commands::operations::cmd_operations(cli.output, cli.quiet);
        }
        Commands::CheckConfig { file } => {
            commands::check_config::cmd_check_config(&file, cli.output, cli.quiet);
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Report an error in the requested output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
