//! # SB Notes
//!
//! Personal note management for class notes kept as PDFs.
//!
//! Uploaded PDFs are copied into a local library, their text is extracted
//! (falling back to AI vision for scanned pages), and an AI model turns the
//! text into a structured summary. Notes can then be searched, browsed per
//! class, and combined into one PDF per class. A terminal menu and a web
//! front end share this library.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌────────────┐
//! │  Upload  │──▶│  Extract  │──▶│ Analyze  │──▶│ NoteStore  │
//! │ (PDF in) │   │ text/vision│  │  (AI)    │   │ notes.json │
//! └──────────┘   └───────────┘   └──────────┘   └─────┬──────┘
//!                                                     │
//!                         ┌───────────────────────────┤
//!                         ▼                           ▼
//!                  ┌─────────────┐             ┌────────────┐
//!                  │ menu (CLI)  │             │ server     │
//!                  │ search/view │             │ (axum web) │
//!                  │ combine     │             └────────────┘
//!                  └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export ANTHROPIC_API_KEY=...
//! sbnotes                                  # interactive menu
//! sbnotes upload lecture3.pdf --class Physics --type notes
//! sbnotes search "projectile"
//! sbnotes combine Physics                  # generated_pdfs/Physics_combined_notes.pdf
//! sbnotes serve                            # web front end on 127.0.0.1:8501
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Note records, analysis, class aggregates |
//! | [`store`] | JSON note store with atomic, locked writes |
//! | [`ai`] | AI client abstraction and the Anthropic implementation |
//! | [`extract`] | PDF text extraction with vision fallback |
//! | [`analyze`] | Analysis prompt and reply parsing |
//! | [`upload`] | The upload workflow |
//! | [`search`] | Search and browse filters |
//! | [`view`] | Class overview and statistics |
//! | [`divider`] | Divider pages for combined PDFs |
//! | [`combine`] | Combined class PDFs |
//! | [`notebook`] | Facade shared by both front ends |
//! | [`report`] | Terminal tables |
//! | [`menu`] | Interactive terminal menu |
//! | [`pages`] | HTML rendering |
//! | [`server`] | Web server |

pub mod ai;
pub mod analyze;
pub mod combine;
pub mod config;
pub mod divider;
pub mod extract;
pub mod menu;
pub mod models;
pub mod notebook;
pub mod pages;
pub mod report;
pub mod search;
pub mod server;
pub mod store;
pub mod upload;
pub mod view;
