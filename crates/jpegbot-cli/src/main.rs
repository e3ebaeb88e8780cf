mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "jpegbot",
    about = "Reply to jpeg requests with a freshly recompressed copy of the image",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest jpegbot.yaml in this or a parent directory)
    #[arg(long, global = true, env = "JPEGBOT_CONFIG")]
    config: Option<PathBuf>,

    /// JPEG quality for recompressed images, overriding the config
    #[arg(
        long,
        short = 'q',
        global = true,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    quality: Option<u8>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll for trigger comments and reply to them (the default)
    Run {
        /// Scan once, print the pass report and exit
        #[arg(long)]
        once: bool,
    },

    /// Write a default jpegbot.yaml if none exists
    Init,

    /// Validate the config for common mistakes
    Validate,

    /// Show how many comments have been processed
    Stats,
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run { once: false });

    let default_level = match &command {
        Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let config_path = root::resolve_config(cli.config.as_deref());

    let result = match command {
        Commands::Run { once } => cmd::run::run(&config_path, cli.quality, once, cli.json),
        Commands::Init => cmd::init::run(&config_path),
        Commands::Validate => cmd::config::validate(&config_path, cli.quality, cli.json),
        Commands::Stats => cmd::stats::run(&config_path, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
