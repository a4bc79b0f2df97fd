//! # Bilan CLI Module
//!
//! This module implements the CLI interface for Bilan.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database
//! - `create` / `list` / `show` - Manage assessments
//! - `parcours` - Show the phase gate and progress
//! - `save-step` - Merge a partial payload into a wizard step
//! - `completion` / `summary` / `export` - Inspect the wizard draft
//! - `answer` - Record a question answer
//! - `complete-phase` / `archive` - Drive the lifecycle

mod commands;

use crate::config::{BackendKind, BilanConfig};
use bilan_core::BilanError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Bilan - assessment progression engine
///
/// Tracks a career assessment through its three phases and its five-step
/// wizard draft.
#[derive(Parser, Debug)]
#[command(name = "bilan")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database (overrides the configuration file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides the configuration file)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the configuration file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the configuration file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Create an assessment
    Create {
        /// Owner (beneficiary) user id
        #[arg(short, long)]
        owner: String,

        /// Assigned consultant user id
        #[arg(short = 'C', long)]
        consultant: Option<String>,
    },

    /// List assessments
    List,

    /// Show one assessment
    Show {
        /// Assessment id
        id: String,
    },

    /// Show phase gate state and progress
    Parcours {
        /// Assessment id
        id: String,
    },

    /// Merge a partial payload into a wizard step
    SaveStep {
        /// Assessment id
        id: String,

        /// Step number (1-5)
        #[arg(short, long)]
        step: i64,

        /// Inline JSON object
        #[arg(short = 'j', long, conflicts_with = "file")]
        data: Option<String>,

        /// File holding a JSON object
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Expected draft version (optimistic concurrency)
        #[arg(long)]
        version: Option<u64>,
    },

    /// Show step completion of the draft
    Completion {
        /// Assessment id
        id: String,
    },

    /// Show the draft summary
    Summary {
        /// Assessment id
        id: String,
    },

    /// Export the draft as JSON
    Export {
        /// Assessment id
        id: String,

        /// Keep contact details (email, phone, address)
        #[arg(long)]
        include_personal_info: bool,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record an answer to a question
    Answer {
        /// Assessment id
        id: String,

        /// Question id
        #[arg(short = 'Q', long)]
        question: String,

        /// Step number (1-5)
        #[arg(short, long)]
        step: i64,

        /// Answer text
        #[arg(short, long)]
        text: String,
    },

    /// Complete a phase (name or number)
    CompletePhase {
        /// Assessment id
        id: String,

        /// Phase: preliminary, investigation, conclusion or 1-3
        #[arg(short, long)]
        phase: String,
    },

    /// Archive a completed assessment
    Archive {
        /// Assessment id
        id: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve the configuration: file, then environment, then global flags.
fn resolve_config(cli: &Cli) -> Result<BilanConfig, BilanError> {
    let mut config = BilanConfig::load(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        config.storage.database.clone_from(database);
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), BilanError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    if cli.verbose {
        tracing::debug!(?config, "resolved configuration");
    }

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(config).await
        }
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Create { owner, consultant }) => {
            cmd_create(&config, json_mode, &owner, consultant.as_deref())
        }
        Some(Commands::List) | None => cmd_list(&config, json_mode),
        Some(Commands::Show { id }) => cmd_show(&config, json_mode, &id),
        Some(Commands::Parcours { id }) => cmd_parcours(&config, json_mode, &id),
        Some(Commands::SaveStep {
            id,
            step,
            data,
            file,
            version,
        }) => cmd_save_step(
            &config,
            json_mode,
            &id,
            step,
            data.as_deref(),
            file.as_deref(),
            version,
        ),
        Some(Commands::Completion { id }) => cmd_completion(&config, json_mode, &id),
        Some(Commands::Summary { id }) => cmd_summary(&config, json_mode, &id),
        Some(Commands::Export {
            id,
            include_personal_info,
            output,
        }) => cmd_export(&config, &id, include_personal_info, output.as_deref()),
        Some(Commands::Answer {
            id,
            question,
            step,
            text,
        }) => cmd_answer(&config, json_mode, &id, &question, step, &text),
        Some(Commands::CompletePhase { id, phase }) => {
            cmd_complete_phase(&config, json_mode, &id, &phase)
        }
        Some(Commands::Archive { id }) => cmd_archive(&config, json_mode, &id),
    }
}
