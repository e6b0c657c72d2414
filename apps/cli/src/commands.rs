//! CLI command definitions, routing, collaborator adapters, and tracing
//! setup.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tracing::info;

use docmap_core::pipeline::{Collaborators, DocumentMapper, MapOutcome};
use docmap_core::services::{
    ConfirmDecision, ConfirmPrompt, ConfirmationService, PickOutcome, PickerGateway,
};
use docmap_core::LogSink;
use docmap_shared::{
    AppConfig, DocMapError, FileDescriptor, ParentRef, init_config, load_config,
};
use docmap_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docmap — attach picked files to a tracked entity as documents.
#[derive(Parser)]
#[command(
    name = "docmap",
    version,
    about = "Map externally picked files onto a tracked entity as documents.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the mapping pipeline for a selection of picked files.
    Map {
        /// Identifier of the parent entity to map onto.
        #[arg(long)]
        parent_id: String,

        /// Parent entity kind (used in prompt text).
        #[arg(long, default_value = "assessment")]
        parent_kind: String,

        /// Parent entity title (used in prompt text).
        #[arg(long)]
        parent_title: String,

        /// Picked file as EXTERNAL_ID=TITLE (repeatable).
        #[arg(long = "file", value_name = "ID=TITLE")]
        files: Vec<String>,

        /// JSON manifest of picked files: [{"external_id": ..., "title": ...}].
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Database path (defaults to the configured data_dir).
        #[arg(long)]
        db: Option<PathBuf>,

        /// Proceed through the reconciliation prompt without asking.
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List all tracked documents.
    List {
        /// Database path (defaults to the configured data_dir).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docmap=info",
        1 => "docmap=debug",
        _ => "docmap=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Map {
            parent_id,
            parent_kind,
            parent_title,
            files,
            manifest,
            db,
            yes,
        } => {
            cmd_map(
                &parent_id,
                &parent_kind,
                &parent_title,
                &files,
                manifest.as_deref(),
                db,
                yes,
            )
            .await
        }
        Command::List { db } => cmd_list(db).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Picker gateway adapter
// ---------------------------------------------------------------------------

/// Picker fed from CLI flags or a JSON manifest. Invoking `map` with no
/// file source at all is the picker-closed-without-selecting path.
struct CliPicker {
    selection: Option<Vec<FileDescriptor>>,
}

impl CliPicker {
    fn from_args(
        files: &[String],
        manifest: Option<&std::path::Path>,
    ) -> Result<Self> {
        let mut selection: Vec<FileDescriptor> = Vec::new();

        if let Some(path) = manifest {
            let content = std::fs::read_to_string(path)
                .map_err(|e| eyre!("cannot read manifest '{}': {e}", path.display()))?;
            let parsed: Vec<FileDescriptor> = serde_json::from_str(&content)
                .map_err(|e| eyre!("malformed manifest '{}': {e}", path.display()))?;
            selection.extend(parsed);
        }

        for entry in files {
            let (external_id, title) = entry
                .split_once('=')
                .ok_or_else(|| eyre!("invalid --file '{entry}': expected ID=TITLE"))?;
            selection.push(FileDescriptor::new(external_id, title));
        }

        Ok(Self {
            selection: if selection.is_empty() {
                None
            } else {
                Some(selection)
            },
        })
    }
}

#[async_trait]
impl PickerGateway for CliPicker {
    async fn pick(&self) -> docmap_shared::Result<PickOutcome> {
        match &self.selection {
            Some(files) => Ok(PickOutcome::Picked(files.clone())),
            None => Ok(PickOutcome::Cancelled),
        }
    }
}

// ---------------------------------------------------------------------------
// Confirmation gate adapter
// ---------------------------------------------------------------------------

/// Interactive confirmation gate. `--yes` (or `assume_yes` in config)
/// proceeds without prompting.
struct PromptGate {
    assume_yes: bool,
}

#[async_trait]
impl ConfirmationService for PromptGate {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> docmap_shared::Result<ConfirmDecision> {
        if self.assume_yes {
            info!("auto-confirming reconciliation (--yes)");
            return Ok(ConfirmDecision::Proceed);
        }

        let message = prompt.message.clone();
        let answer = tokio::task::spawn_blocking(move || {
            dialoguer::Confirm::new()
                .with_prompt(message)
                .default(false)
                .interact()
        })
        .await
        .map_err(|e| DocMapError::validation(format!("confirmation prompt failed: {e}")))?
        .map_err(|e| DocMapError::validation(format!("confirmation prompt failed: {e}")))?;

        Ok(if answer {
            ConfirmDecision::Proceed
        } else {
            ConfirmDecision::Decline
        })
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn resolve_db_path(config: &AppConfig, db: Option<PathBuf>) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path),
        None => Ok(config.db_path()?),
    }
}

async fn cmd_map(
    parent_id: &str,
    parent_kind: &str,
    parent_title: &str,
    files: &[String],
    manifest: Option<&std::path::Path>,
    db: Option<PathBuf>,
    yes: bool,
) -> Result<()> {
    let config = load_config()?;
    let db_path = resolve_db_path(&config, db)?;

    let picker = CliPicker::from_args(files, manifest)?;

    let storage = Arc::new(
        Storage::open(&db_path)
            .await?
            .with_actor(config.defaults.actor.clone()),
    );

    let parent = ParentRef::new(parent_kind, parent_title, parent_id);

    info!(
        parent = %parent,
        db = %db_path.display(),
        "starting mapping run"
    );

    let mapper = DocumentMapper::new(
        parent.clone(),
        Collaborators {
            existence: storage.clone(),
            confirmation: Arc::new(PromptGate {
                assume_yes: yes || config.defaults.assume_yes,
            }),
            grants: storage.clone(),
            persistence: storage.clone(),
            permissions: storage.clone(),
            sink: Arc::new(LogSink),
        },
    );

    match mapper.run_from_picker(&picker).await? {
        MapOutcome::Cancelled => {
            println!("Selection cancelled — nothing was mapped.");
        }
        MapOutcome::Completed(report) => {
            println!();
            println!("  Documents mapped!");
            println!("  Parent:   {parent}");
            println!("  Mapped:   {}", report.documents.len());
            println!("  Admitted: {}", report.existing_admitted);
            println!("  Created:  {}", report.created);
            println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
            println!();
        }
    }

    Ok(())
}

async fn cmd_list(db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let db_path = resolve_db_path(&config, db)?;

    let storage = Storage::open(&db_path).await?;
    let documents = storage.list_documents().await?;

    if documents.is_empty() {
        println!("No tracked documents.");
        return Ok(());
    }

    for doc in &documents {
        println!(
            "{}  {}  {}  ({})",
            doc.id,
            doc.source_external_id,
            doc.title,
            doc.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!("{} document(s)", documents.len());

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
