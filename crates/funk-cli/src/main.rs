use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod inventory;
mod report;
mod settings;

use settings::{QueryArgs, SubmissionArgs};

#[derive(Parser)]
#[command(
    name = "funk",
    about = "Funk: find free slots and nodes on a federated testbed",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find a slot and print the reservation command.
    ///
    /// Modes: date finds the first slot where the resources are available,
    /// free lists every slot with the requested node counts, max finds the
    /// slot with the most nodes. The command is printed, never submitted.
    Plan {
        #[command(flatten)]
        query: QueryArgs,
        #[command(flatten)]
        submission: SubmissionArgs,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Print the slot table of the planning window
    Slots {
        #[command(flatten)]
        query: QueryArgs,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Write a funk.toml scaffold
    Init {
        #[arg(default_value = "funk.toml")]
        path: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "funk=debug"
    } else if cli.quiet {
        "funk=warn"
    } else {
        "funk=info"
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Plan {
            query,
            submission,
            format,
        } => commands::plan::plan(&query, &submission, &format),
        Commands::Slots { query, format } => commands::slots::slots(&query, &format),
        Commands::Init { path, force } => commands::init::init(&path, force),
    }
}
