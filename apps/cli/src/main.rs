mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Renders one static-site resource and its make dependencies", long_about = None)]
struct Cli {
    #[arg(long, global = true, default_value = "kiln.json")]
    config: PathBuf,

    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a source file to its output
    Render { source: PathBuf, output: PathBuf },
    /// Write the make rules of a source file
    Deps { source: PathBuf, output: PathBuf },
    /// Print the metadata of a source file as JSON
    Info { source: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render { source, output } => commands::render_page(&cli.config, &source, &output),
        Commands::Deps { source, output } => commands::write_deps(&cli.config, &source, &output),
        Commands::Info { source } => commands::print_info(&cli.config, &source),
    };

    if let Err(error) = result {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
