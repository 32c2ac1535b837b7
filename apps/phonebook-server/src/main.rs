//! phonebook-server — server-rendered phonebook over HTTP.
//!
//! Lists, creates and edits contacts (name, phone, email) and renders HTML
//! forms from the template directory.
//! - Storage: SQLite (file, default) when the `sqlite` feature is enabled, or
//!   in-memory via `STORAGE_PROVIDER=memory`.
//! - Routes: `/`, `/create`, `/add` (POST), `/edit?id=`, `/update` (POST).
//!   Non-POST requests to the write routes redirect to `/`.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p phonebook-server
//!
//! # no database file, JSON logs
//! STORAGE_PROVIDER=memory LOG_FORMAT=json cargo run -p phonebook-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;
mod views;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{any, post},
    Router,
};
use domain::adapters::memory_repo::InMemoryRepo;
use domain::service::ContactService;
use domain::validate::parse_contact_id;
use domain::{Contact, ContactRepository, CoreError, NewContact};
use http_common::FormValues;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use views::{ViewData, Views};

// Storage chosen at startup (sqlite is feature-gated).
type DynRepo = Box<dyn ContactRepository>;

#[derive(Clone)]
struct AppState {
    contacts: Arc<ContactService<DynRepo>>,
    views: Arc<Views>,
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_templates_missing();

    let repo = match build_repo(&cfg) {
        Ok(r) => r,
        Err(e) => {
            error!(err = %e, "storage unavailable, refusing to start");
            std::process::exit(1);
        }
    };
    info!(provider = ?cfg.storage_provider, "Connected to database!");

    let state = AppState {
        contacts: Arc::new(ContactService::new(repo)),
        views: Arc::new(Views::new(cfg.template_dir.clone())),
    };

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let app = routes(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "bind failed");
            std::process::exit(1);
        }
    };
    info!(%addr, "Server started at http://localhost:{}", cfg.port);
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct the repository named by config; any failure here is fatal.
fn build_repo(cfg: &config::Config) -> Result<DynRepo, CoreError> {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => {
            // prove the database answers before serving anything
            let repo = sqlite_adapter::SqliteRepo::connect(&cfg.db_path)?;
            repo.verify()?;
            Ok(Box::new(repo))
        }
        #[cfg(not(feature = "sqlite"))]
        config::StorageProvider::Sqlite => Err(CoreError::Connection(
            "STORAGE_PROVIDER=sqlite but this binary was built without the sqlite feature"
                .into(),
        )),
        config::StorageProvider::Memory => Ok(Box::new(InMemoryRepo::new())),
    }
}

fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", any(list_contacts))
        .route("/create", any(show_create_form))
        .route("/add", post(add_contact).fallback(redirect_home))
        .route("/edit", any(show_edit_form))
        .route("/update", post(update_contact).fallback(redirect_home))
        // unmatched paths show the listing, like a catch-all "/" pattern
        .fallback(list_contacts)
        .with_state(state)
}

// Field lookup over a urlencoded body, then the query string. A body with
// any other content type is ignored, so its fields read as empty.
fn request_values(headers: &HeaderMap, query: Option<&str>, body: &[u8]) -> FormValues {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let body = http_common::is_form_urlencoded(content_type).then_some(body);
    FormValues::parse(body, query)
}

async fn list_contacts(State(state): State<AppState>) -> Response {
    let contacts = match state.contacts.list_all() {
        Ok(c) => c,
        Err(e) => {
            error!(err = ?e, "list error");
            return plain_error(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };
    render_page(&state.views, views::CONTACTS, ViewData::Contacts(&contacts))
}

async fn show_create_form(State(state): State<AppState>) -> Response {
    render_page(&state.views, views::CREATE, ViewData::Empty)
}

async fn add_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let form = request_values(&headers, query.as_deref(), &body);
    let input = NewContact::new(form.get("name"), form.get("phone"), form.get("email"));
    match state.contacts.create(input) {
        Ok(id) => {
            info!(id = %id, "create ok");
            Redirect::to("/").into_response()
        }
        Err(e) => {
            error!(err = ?e, "create error");
            plain_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to insert contact")
        }
    }
}

async fn show_edit_form(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Response {
    let query = FormValues::parse(None, query.as_deref());
    let id = match parse_contact_id(query.get("id")) {
        Ok(id) => id,
        Err(e) => {
            warn!(err = %e, "edit: bad id");
            return plain_error(StatusCode::BAD_REQUEST, "Invalid ID");
        }
    };
    let contact = match state.contacts.find(id) {
        Ok(c) => c,
        Err(CoreError::NotFound) => {
            warn!(id = %id, "edit 404");
            return plain_error(StatusCode::NOT_FOUND, "Contact not found");
        }
        Err(e) => {
            error!(id = %id, err = ?e, "edit lookup error");
            return plain_error(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };
    render_page(&state.views, views::EDIT, ViewData::Contact(&contact))
}

async fn update_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let form = request_values(&headers, query.as_deref(), &body);
    let id = match parse_contact_id(form.get("id")) {
        Ok(id) => id,
        Err(e) => {
            warn!(err = %e, "update: bad id");
            return plain_error(StatusCode::BAD_REQUEST, "Invalid ID");
        }
    };
    let contact = Contact {
        id,
        name: form.take("name"),
        phone: form.take("phone"),
        email: form.take("email"),
    };
    match state.contacts.update(&contact) {
        Ok(()) => {
            info!(id = %id, "update ok");
            Redirect::to("/").into_response()
        }
        Err(e) => {
            error!(id = %id, err = ?e, "update error");
            plain_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update contact")
        }
    }
}

async fn redirect_home() -> Redirect {
    Redirect::to("/")
}

fn render_page(views: &Views, name: &str, data: ViewData<'_>) -> Response {
    match views.render(name, data) {
        Ok(html) => ([(header::CONTENT_TYPE, http_common::TEXT_HTML_UTF8)], html).into_response(),
        Err(e) => {
            error!(err = %e, "render error");
            plain_error(StatusCode::INTERNAL_SERVER_ERROR, "Template error")
        }
    }
}

fn plain_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, http_common::TEXT_PLAIN_UTF8),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        http_common::error_body(message),
    )
        .into_response()
}
