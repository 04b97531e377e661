//! # SB Notes CLI (`sbnotes`)
//!
//! Runs the interactive menu by default; the subcommands expose the same
//! operations non-interactively, and `serve` starts the web front end.
//!
//! ## Usage
//!
//! ```bash
//! sbnotes --config ./config/sbnotes.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sbnotes` / `sbnotes menu` | Interactive menu |
//! | `sbnotes upload <pdf> --class <name>` | Upload and analyze one PDF |
//! | `sbnotes search "<term>"` | Search summaries, topics, classes and types |
//! | `sbnotes view [class]` | Class overview, or one class in detail |
//! | `sbnotes combine <class>` | Build the combined class PDF |
//! | `sbnotes stats` | Library statistics |
//! | `sbnotes reindex` | Recompute class aggregates from the note list |
//! | `sbnotes serve` | Start the web front end |
//!
//! `menu`, `upload` and `serve` need the AI API key (`ANTHROPIC_API_KEY`
//! unless `[ai].api_key_env` says otherwise).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use sbnotes::ai::AnthropicClient;
use sbnotes::combine::CombineMode;
use sbnotes::config::{self, Config};
use sbnotes::models::NoteType;
use sbnotes::notebook::Notebook;
use sbnotes::report;
use sbnotes::upload::UploadRequest;
use sbnotes::{menu, server};

/// SB Notes: upload PDF class notes, analyze them with AI, search them and
/// combine them per class.
#[derive(Parser)]
#[command(name = "sbnotes", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./config/sbnotes.toml")]
    config: PathBuf,

    /// Debug-level logging on stderr (`RUST_LOG` takes precedence).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive menu (the default).
    Menu,

    /// Upload one PDF: extract, analyze, store.
    Upload {
        /// Path to the PDF file.
        path: PathBuf,

        /// Class the notes belong to.
        #[arg(long = "class")]
        class_name: String,

        /// Notes, Homework, Study Prep, Exam or Other.
        #[arg(long = "type", default_value = "Notes")]
        note_type: NoteType,
    },

    /// Search notes by class, type, summary and key topics.
    Search {
        term: String,

        /// Maximum number of results.
        #[arg(long, default_value_t = sbnotes::search::TERMINAL_RESULT_LIMIT)]
        limit: usize,

        /// Print matching records as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the class overview, or the notes of one class.
    View {
        class_name: Option<String>,
    },

    /// Write `{generated_dir}/{class}_combined_notes.pdf`.
    Combine {
        class_name: String,

        /// Concatenate the original PDFs without divider pages.
        #[arg(long)]
        originals_only: bool,
    },

    /// Note and class counts.
    Stats,

    /// Recompute class aggregates from the note list.
    Reindex,

    /// Start the web front end.
    Serve {
        /// Override `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("sbnotes={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the notebook with an AI client; fails early without a key.
fn notebook_with_ai(cfg: Config) -> Result<Notebook> {
    let client = AnthropicClient::from_config(&cfg)?;
    Ok(Notebook::open(cfg)?.with_ai(Arc::new(client)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut cfg = config::load_config(&cli.config)?;

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => {
            let mut notebook = notebook_with_ai(cfg)?;
            menu::run_menu(&mut notebook).await?;
        }
        Commands::Upload {
            path,
            class_name,
            note_type,
        } => {
            let mut notebook = notebook_with_ai(cfg)?;
            let outcome = notebook
                .upload(UploadRequest {
                    source: path,
                    class_name,
                    note_type,
                })
                .await?;
            report::print_upload(&outcome);
        }
        Commands::Search { term, limit, json } => {
            let notebook = Notebook::open(cfg)?;
            let results = notebook.search(&term, Some(limit));
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                report::print_search_results(&term, &results);
            }
        }
        Commands::View { class_name } => {
            let notebook = Notebook::open(cfg)?;
            match class_name {
                Some(class_name) => {
                    report::print_class_notes(&class_name, &notebook.class_notes(&class_name))
                }
                None => {
                    report::print_overview(&notebook.overview());
                }
            }
        }
        Commands::Combine {
            class_name,
            originals_only,
        } => {
            let notebook = Notebook::open(cfg)?;
            let mode = if originals_only {
                CombineMode::OriginalsOnly
            } else {
                CombineMode::WithDividers
            };
            let outcome = notebook.combine(&class_name, mode)?;
            report::print_combine(&class_name, &outcome);
        }
        Commands::Stats => {
            let notebook = Notebook::open(cfg)?;
            report::print_stats(&notebook.stats());
        }
        Commands::Reindex => {
            let mut notebook = Notebook::open(cfg)?;
            let changed = notebook.reindex()?;
            println!("Reindexed {} classes ({} changed).", notebook.data().classes.len(), changed);
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            let notebook = notebook_with_ai(cfg)?;
            server::run_server(notebook).await?;
        }
    }

    Ok(())
}
