//! The interactive terminal menu.
//!
//! Loops over Upload / Search / View / Generate PDF / Exit until the user
//! exits. Each action reports its own failures and returns to the menu.

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use std::path::PathBuf;

use crate::combine::CombineMode;
use crate::models::NoteType;
use crate::notebook::Notebook;
use crate::report;
use crate::search::TERMINAL_RESULT_LIMIT;
use crate::upload::UploadRequest;

const ACTIONS: [&str; 5] = [
    "Upload New Notes",
    "Search Notes",
    "View Notes",
    "Generate Class PDF",
    "Exit",
];

pub async fn run_menu(notebook: &mut Notebook) -> Result<()> {
    let theme = ColorfulTheme::default();
    loop {
        println!();
        println!("SB Notes - Personal Note Management");
        let choice = Select::with_theme(&theme)
            .with_prompt("Choose an option")
            .items(&ACTIONS)
            .default(0)
            .interact()?;

        let result = match choice {
            0 => upload(notebook, &theme).await,
            1 => search(notebook, &theme),
            2 => view(notebook, &theme),
            3 => generate(notebook, &theme),
            _ => {
                println!("Goodbye!");
                return Ok(());
            }
        };
        if let Err(e) = result {
            println!("Error: {:#}", e);
        }
    }
}

async fn upload(notebook: &mut Notebook, theme: &ColorfulTheme) -> Result<()> {
    println!("Upload New Notes");
    let path: String = Input::with_theme(theme)
        .with_prompt("Enter the path to your PDF file")
        .interact_text()?;
    let class_name: String = Input::with_theme(theme)
        .with_prompt("Enter the class name")
        .allow_empty(true)
        .interact_text()?;
    let labels: Vec<&str> = NoteType::ALL.iter().map(|t| t.label()).collect();
    let type_index = Select::with_theme(theme)
        .with_prompt("Select note type")
        .items(&labels)
        .default(0)
        .interact()?;

    let request = UploadRequest {
        source: PathBuf::from(path.trim()),
        class_name,
        note_type: NoteType::ALL[type_index],
    };
    println!("Extracting text from PDF...");
    match notebook.upload(request).await {
        Ok(outcome) => report::print_upload(&outcome),
        Err(e) if e.is_user_error() => println!("Error: {}", e),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn search(notebook: &mut Notebook, theme: &ColorfulTheme) -> Result<()> {
    println!("Search Notes");
    let term: String = Input::with_theme(theme)
        .with_prompt("Enter search term")
        .allow_empty(true)
        .interact_text()?;
    notebook.reload()?;
    let results = notebook.search(&term, Some(TERMINAL_RESULT_LIMIT));
    report::print_search_results(&term, &results);
    Ok(())
}

fn view(notebook: &mut Notebook, theme: &ColorfulTheme) -> Result<()> {
    println!("View Notes");
    notebook.reload()?;
    if !report::print_overview(&notebook.overview()) {
        return Ok(());
    }
    let class_name: String = Input::with_theme(theme)
        .with_prompt("Enter class name to view detailed notes (or press Enter to skip)")
        .allow_empty(true)
        .interact_text()?;
    let class_name = class_name.trim();
    if !class_name.is_empty() && notebook.data().classes.contains_key(class_name) {
        report::print_class_notes(class_name, &notebook.class_notes(class_name));
    }
    Ok(())
}

fn generate(notebook: &mut Notebook, theme: &ColorfulTheme) -> Result<()> {
    println!("Generate Class PDF");
    notebook.reload()?;
    let classes = notebook.class_names();
    if classes.is_empty() {
        println!("No classes available");
        return Ok(());
    }
    let index = Select::with_theme(theme)
        .with_prompt("Select class")
        .items(&classes)
        .default(0)
        .interact()?;
    let class_name = &classes[index];
    let outcome = notebook.combine(class_name, CombineMode::WithDividers)?;
    report::print_combine(class_name, &outcome);
    Ok(())
}
