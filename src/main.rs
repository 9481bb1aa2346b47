//! # Component Manifest CLI (`cmx`)
//!
//! ## Usage
//!
//! ```bash
//! cmx --config ./config/cmx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cmx extract <file>` | Extract structure and save the extraction checkpoint |
//! | `cmx generate <name>` | Generate metadata from the extraction checkpoint |
//! | `cmx build <name>` | Assemble the manifest from saved checkpoints |
//! | `cmx run <file>` / `cmx run --all` | All three phases |
//! | `cmx status [name]` | Which phases are saved |
//! | `cmx clean <name>` / `cmx clean --all` | Remove saved state |
//!
//! Results are JSON on stdout. Logs go to stderr, filtered by `CMX_LOG`
//! (default `warn`).

use std::path::{Path, PathBuf};

use anyhow::bail;
use clap::{Parser, Subcommand};
use component_manifest::commands::{self, SourceArgs};
use component_manifest::config;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_CONFIG: &str = "./config/cmx.toml";

/// Component Manifest CLI: extract, describe, and assemble manifests for
/// UI components.
#[derive(Parser)]
#[command(
    name = "cmx",
    about = "Component Manifest: AI-readable manifests for UI components",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cmx.toml`; built-in defaults are used when
    /// that file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct SourceOpts {
    /// Component source file.
    file: PathBuf,

    /// Component name (default: derived from the file name).
    #[arg(long)]
    name: Option<String>,

    /// Stories file for the component.
    #[arg(long)]
    stories: Option<PathBuf>,

    /// Framework label (default: `[extraction].framework`).
    #[arg(long)]
    framework: Option<String>,

    /// Existing component id to keep.
    #[arg(long)]
    id: Option<Uuid>,

    /// Organization id recorded in logs.
    #[arg(long)]
    org: Option<String>,
}

impl From<SourceOpts> for SourceArgs {
    fn from(opts: SourceOpts) -> Self {
        SourceArgs {
            file: opts.file,
            name: opts.name,
            stories: opts.stories,
            framework: opts.framework,
            id: opts.id,
            org: opts.org,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract props, variants, composition, and dependencies from a source file.
    Extract {
        #[command(flatten)]
        source: SourceOpts,
    },

    /// Generate semantic metadata from the saved extraction.
    Generate {
        /// Component name.
        name: String,
    },

    /// Assemble the manifest from the saved extraction and generation.
    Build {
        /// Component name.
        name: String,

        /// Comma-separated names allowed in `relatedComponents`.
        #[arg(long, value_delimiter = ',')]
        available: Option<Vec<String>>,
    },

    /// Extract, generate, and build in one go.
    Run {
        /// Component source file. Omit with `--all`.
        file: Option<PathBuf>,

        /// Run every component under `[components].root`.
        #[arg(long, conflicts_with = "file")]
        all: bool,

        /// Reuse checkpoints whose source hash still matches.
        #[arg(long)]
        resume: bool,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        stories: Option<PathBuf>,

        #[arg(long, value_delimiter = ',')]
        available: Option<Vec<String>>,
    },

    /// Show saved phases for one component, or all of them.
    Status {
        name: Option<String>,
    },

    /// Delete saved state for one component, or all with `--all`.
    Clean {
        #[arg(required_unless_present = "all")]
        name: Option<String>,

        #[arg(long, conflicts_with = "name")]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CMX_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::load_or_minimal(Path::new(DEFAULT_CONFIG), true)?,
    };

    match cli.command {
        Commands::Extract { source } => {
            commands::run_extract(&cfg, &SourceArgs::from(source)).await?;
        }
        Commands::Generate { name } => {
            commands::run_generate(&cfg, &name).await?;
        }
        Commands::Build { name, available } => {
            commands::run_build(&cfg, &name, available).await?;
        }
        Commands::Run {
            file,
            all,
            resume,
            name,
            stories,
            available,
        } => {
            if all {
                commands::run_all(&cfg, resume).await?;
            } else {
                let Some(file) = file else {
                    bail!("run needs a source file or --all");
                };
                let args = SourceArgs {
                    file,
                    name,
                    stories,
                    ..SourceArgs::default()
                };
                commands::run_one(&cfg, &args, available, resume).await?;
            }
        }
        Commands::Status { name } => {
            commands::run_status(&cfg, name.as_deref()).await?;
        }
        Commands::Clean { name, all } => {
            commands::run_clean(&cfg, if all { None } else { name.as_deref() }).await?;
        }
    }

    Ok(())
}
