use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use vmdiag_core::config::load_settings;
use vmdiag_core::extensions::{find_diagnostics_extensions, parse_reference_list, DiagnosticsExtensionBuilder};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "vmdiag")]
#[command(about = "Configure the VM diagnostics agent extension")]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the extension reference list for the VM as JSON
    Set {
        /// Settings file (TOML)
        settings: PathBuf,
        /// Disable the diagnostics extension
        #[arg(long)]
        disabled: bool,
    },
    /// Print only the diagnostics configuration document
    Render {
        /// Settings file (TOML)
        settings: PathBuf,
        /// Disable the diagnostics extension
        #[arg(long)]
        disabled: bool,
    },
    /// Describe the diagnostics extensions in a JSON reference list
    Get {
        /// Extension reference list (JSON array)
        references: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Set { settings, disabled } => {
            let builder = builder_from_settings(&settings, disabled)?;
            let references = builder.resource_reference_list()?;
            println!("{}", serde_json::to_string_pretty(&references)?);
        }
        Commands::Render { settings, disabled } => {
            let builder = builder_from_settings(&settings, disabled)?;
            println!("{}", builder.to_document()?);
        }
        Commands::Get { references } => {
            let json = std::fs::read_to_string(&references)?;
            let references = parse_reference_list(&json)?;
            let contexts = find_diagnostics_extensions(&references)?;
            info!("{} diagnostics extension(s) found", contexts.len());
            println!("{}", serde_json::to_string_pretty(&contexts)?);
        }
    }

    Ok(())
}

fn builder_from_settings(settings_path: &Path, disabled: bool) -> Result<DiagnosticsExtensionBuilder> {
    if disabled {
        info!("Diagnostics extension will be disabled");
        return Ok(DiagnosticsExtensionBuilder::disabled());
    }

    let settings = load_settings(settings_path)?;
    let base_dir = settings_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(settings.into_builder(base_dir)?)
}
