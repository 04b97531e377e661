//! Web front end.
//!
//! Server-rendered pages over the same [`Notebook`] the terminal uses, plus
//! a small JSON API. All notebook access is serialized behind one mutex.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Dashboard: class overview |
//! | `GET`/`POST` | `/upload` | Upload form / multipart upload |
//! | `GET`  | `/notes` | Browse with `class_name`, `note_type`, `q` filters |
//! | `GET`  | `/classes/{name}` | One class, newest first |
//! | `GET`/`POST` | `/generate` | Combined class PDF (originals only) |
//! | `GET`  | `/generated/{class}` | Download the combined PDF |
//! | `GET`  | `/api/notes` | Notes as JSON (same filters as `/notes`) |
//! | `GET`  | `/api/classes` | Class overview as JSON |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! JSON endpoints answer errors with
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "unknown note type 'x'" } }
//! ```
//!
//! HTML pages render the error as a notice with the same status code.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use crate::combine::{
    notes_for_class, output_file_name, output_path, CombineMode, CombineOutcome,
};
use crate::extract::ExtractionMethod;
use crate::models::{NoteRecord, NoteType};
use crate::notebook::Notebook;
use crate::pages::{self, Notice};
use crate::search::NoteFilter;
use crate::upload::{has_pdf_extension, UploadError, UploadRequest};
use crate::view::ClassSummary;

#[derive(Clone)]
struct AppState {
    notebook: Arc<Mutex<Notebook>>,
}

/// Builds the router. Exposed separately from [`run_server`] for tests.
pub fn router(notebook: Notebook) -> Router {
    let max_upload = notebook.config().server.max_upload_bytes;
    let state = AppState {
        notebook: Arc::new(Mutex::new(notebook)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_dashboard))
        .route("/upload", get(handle_upload_form).post(handle_upload))
        .route("/notes", get(handle_notes))
        .route("/classes/{name}", get(handle_class))
        .route("/generate", get(handle_generate_form).post(handle_generate))
        .route("/generated/{class}", get(handle_download))
        .route("/api/notes", get(handle_api_notes))
        .route("/api/classes", get(handle_api_classes))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload))
        .layer(cors)
        .with_state(state)
}

/// Serves the web front end on `[server].bind` until the process exits.
pub async fn run_server(notebook: Notebook) -> anyhow::Result<()> {
    let bind_addr = notebook.config().server.bind.clone();
    let app = router(notebook);

    println!("SB Notes web server listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "web server started");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error for JSON endpoints.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: format!("{:#}", err),
    }
}

/// An HTML page carrying `notice`, with `status`.
async fn notice_page(state: &AppState, status: StatusCode, title: &str, notice: Notice) -> Response {
    let nb = state.notebook.lock().await;
    let html = pages::layout(title, &nb.stats(), &notice.render());
    (status, Html(html)).into_response()
}

// ============ Filters ============

#[derive(Debug, Default, Deserialize)]
struct BrowseQuery {
    class_name: Option<String>,
    note_type: Option<String>,
    q: Option<String>,
}

/// Empty form fields mean "All".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl BrowseQuery {
    fn into_filter(self) -> Result<NoteFilter, String> {
        let note_type = match non_empty(self.note_type) {
            Some(raw) => Some(raw.parse::<NoteType>()?),
            None => None,
        };
        Ok(NoteFilter {
            class_name: non_empty(self.class_name),
            note_type,
            content: non_empty(self.q),
        })
    }
}

// ============ Pages ============

async fn handle_dashboard(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let mut nb = state.notebook.lock().await;
    nb.reload().map_err(internal)?;
    let body = pages::dashboard(&nb.overview());
    Ok(Html(pages::layout("Dashboard", &nb.stats(), &body)))
}

async fn handle_upload_form(State(state): State<AppState>) -> Html<String> {
    let nb = state.notebook.lock().await;
    Html(pages::layout(
        "Upload New Notes",
        &nb.stats(),
        &pages::upload_form(None),
    ))
}

/// Fields collected from the upload form.
#[derive(Default)]
struct UploadForm {
    file_name: Option<String>,
    bytes: Option<Vec<u8>>,
    class_name: String,
    note_type: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, String> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.bytes = Some(field.bytes().await.map_err(|e| e.to_string())?.to_vec());
            }
            "class_name" => form.class_name = field.text().await.map_err(|e| e.to_string())?,
            "note_type" => form.note_type = Some(field.text().await.map_err(|e| e.to_string())?),
            _ => {}
        }
    }
    Ok(form)
}

async fn upload_form_error(state: &AppState, message: String) -> Response {
    let nb = state.notebook.lock().await;
    let notice = Notice::Error(message);
    let html = pages::layout(
        "Upload New Notes",
        &nb.stats(),
        &pages::upload_form(Some(&notice)),
    );
    (StatusCode::BAD_REQUEST, Html(html)).into_response()
}

async fn handle_upload(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(e) => return upload_form_error(&state, format!("Invalid upload: {}", e)).await,
    };

    let (file_name, bytes) = match (form.file_name, form.bytes) {
        (Some(name), Some(bytes)) if !bytes.is_empty() => (name, bytes),
        _ => return upload_form_error(&state, "Please choose a PDF file".to_string()).await,
    };
    if !has_pdf_extension(&file_name) {
        return upload_form_error(&state, UploadError::NotPdf(file_name).to_string()).await;
    }
    let note_type = match non_empty(form.note_type) {
        Some(raw) => match raw.parse::<NoteType>() {
            Ok(t) => t,
            Err(e) => return upload_form_error(&state, e).await,
        },
        None => NoteType::Notes,
    };

    // spool to a .pdf temp file so the upload runs through the same workflow
    let spooled = tempfile::Builder::new()
        .prefix("upload_")
        .suffix(".pdf")
        .tempfile()
        .and_then(|mut tmp| {
            tmp.write_all(&bytes)?;
            tmp.flush()?;
            Ok(tmp)
        });
    let tmp = match spooled {
        Ok(tmp) => tmp,
        Err(e) => return internal(e.into()).into_response(),
    };

    let request = UploadRequest {
        source: tmp.path().to_path_buf(),
        class_name: form.class_name,
        note_type,
    };

    let mut nb = state.notebook.lock().await;
    match nb.upload(request).await {
        Ok(outcome) => {
            let warning = match outcome.method {
                ExtractionMethod::TextLayer => None,
                ExtractionMethod::Vision => Some(Notice::Info(
                    "Traditional text extraction failed. Used AI vision to read scanned notes.".into(),
                )),
                ExtractionMethod::Failed => Some(Notice::Warning(
                    "AI vision could not read this PDF; it was stored with placeholder text.".into(),
                )),
            };
            let body = pages::upload_result(&outcome, warning.as_ref());
            Html(pages::layout("Upload New Notes", &nb.stats(), &body)).into_response()
        }
        Err(e) if e.is_user_error() => {
            drop(nb);
            upload_form_error(&state, e.to_string()).await
        }
        Err(e) => internal(e.into()).into_response(),
    }
}

async fn handle_notes(State(state): State<AppState>, Query(query): Query<BrowseQuery>) -> Response {
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(e) => {
            return notice_page(&state, StatusCode::BAD_REQUEST, "View Notes", Notice::Error(e)).await
        }
    };
    let mut nb = state.notebook.lock().await;
    if let Err(e) = nb.reload() {
        return internal(e).into_response();
    }
    if nb.data().notes.is_empty() {
        let body = pages::dashboard(&[]);
        return Html(pages::layout("View Notes", &nb.stats(), &body)).into_response();
    }
    let notes = nb.filter(&filter);
    let body = pages::notes_page(&notes, &filter, &nb.class_names());
    Html(pages::layout("View Notes", &nb.stats(), &body)).into_response()
}

async fn handle_class(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let mut nb = state.notebook.lock().await;
    if let Err(e) = nb.reload() {
        return internal(e).into_response();
    }
    if !nb.data().classes.contains_key(&name) {
        drop(nb);
        return notice_page(
            &state,
            StatusCode::NOT_FOUND,
            &name,
            Notice::Error(format!("No notes found for {}", name)),
        )
        .await;
    }
    let notes = nb.class_notes(&name);
    let body = pages::class_page(&name, &notes);
    Html(pages::layout(&format!("Notes for {}", name), &nb.stats(), &body)).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct GenerateQuery {
    class_name: Option<String>,
}

async fn handle_generate_form(
    State(state): State<AppState>,
    Query(query): Query<GenerateQuery>,
) -> Result<Html<String>, AppError> {
    let mut nb = state.notebook.lock().await;
    nb.reload().map_err(internal)?;
    let classes = nb.class_names();
    let selected = non_empty(query.class_name)
        .filter(|c| classes.contains(c))
        .or_else(|| classes.first().cloned());
    let notes: Vec<&NoteRecord> = match selected.as_deref() {
        Some(class) => notes_for_class(nb.data(), class),
        None => Vec::new(),
    };
    let body = pages::generate_page(&classes, selected.as_deref(), &notes, None, None);
    Ok(Html(pages::layout("Generate Class PDFs", &nb.stats(), &body)))
}

async fn handle_generate(
    State(state): State<AppState>,
    Form(query): Form<GenerateQuery>,
) -> Response {
    let class_name = non_empty(query.class_name).unwrap_or_default();
    let mut nb = state.notebook.lock().await;
    if let Err(e) = nb.reload() {
        return internal(e).into_response();
    }
    let classes = nb.class_names();
    if !classes.contains(&class_name) {
        drop(nb);
        return notice_page(
            &state,
            StatusCode::NOT_FOUND,
            "Generate Class PDFs",
            Notice::Error(format!("No notes found for {}", class_name)),
        )
        .await;
    }

    let outcome = match nb.combine(&class_name, CombineMode::OriginalsOnly) {
        Ok(outcome) => outcome,
        Err(e) => return internal(e.context("Error generating PDF")).into_response(),
    };
    let (notice, download) = match &outcome {
        CombineOutcome::NoNotes => (
            Notice::Warning(format!("No notes found for {}", class_name)),
            None,
        ),
        CombineOutcome::NothingToCombine { missing } => (
            Notice::Warning(format!(
                "Original PDFs not found for: {}. Nothing was generated.",
                missing.join(", ")
            )),
            None,
        ),
        CombineOutcome::Written { path, missing, .. } => {
            let mut text = format!("Generated combined PDF: {}", path.display());
            if !missing.is_empty() {
                text.push_str(&format!(" (skipped missing originals: {})", missing.join(", ")));
            }
            (Notice::Success(text), Some(class_name.as_str()))
        }
    };
    let notes = notes_for_class(nb.data(), &class_name);
    let body = pages::generate_page(&classes, Some(&class_name), &notes, Some(&notice), download);
    Html(pages::layout("Generate Class PDFs", &nb.stats(), &body)).into_response()
}

async fn handle_download(State(state): State<AppState>, Path(class): Path<String>) -> Response {
    let nb = state.notebook.lock().await;
    if !nb.data().classes.contains_key(&class) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let path = output_path(nb.config(), &class);
    drop(nb);

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let disposition = format!("attachment; filename=\"{}\"", output_file_name(&class));
            (
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        Err(e) => internal(e.into()).into_response(),
    }
}

// ============ JSON API ============

#[derive(Serialize)]
struct NotesResponse {
    notes: Vec<NoteRecord>,
}

async fn handle_api_notes(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<NotesResponse>, AppError> {
    let filter = query.into_filter().map_err(bad_request)?;
    let mut nb = state.notebook.lock().await;
    nb.reload().map_err(internal)?;
    let notes = nb.filter(&filter).into_iter().cloned().collect();
    Ok(Json(NotesResponse { notes }))
}

#[derive(Serialize)]
struct ClassesResponse {
    classes: Vec<ClassSummary>,
}

async fn handle_api_classes(State(state): State<AppState>) -> Result<Json<ClassesResponse>, AppError> {
    let mut nb = state.notebook.lock().await;
    nb.reload().map_err(internal)?;
    Ok(Json(ClassesResponse {
        classes: nb.overview(),
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
