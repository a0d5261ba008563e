use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    serve, Json, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    path::{Path as FsPath, PathBuf},
    sync::Arc,
    time::Duration,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

use crate::chart::ChartSpec;
use crate::error::TurnError;
use crate::orchestrator::Orchestrator;
use crate::session::{ChatTurn, SessionId, SessionStore};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    sessions: Arc<SessionStore>,
    orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(templates_dir.into())),
            sessions: Arc::new(SessionStore::new()),
            orchestrator,
        }
    }

    /// Replace the session store with one that evicts after `idle_timeout`.
    pub fn with_session_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.sessions = Arc::new(SessionStore::with_idle_timeout(idle_timeout));
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: PathBuf) -> AutoReloader {
    // Use AutoReloader so template edits show up without a restart
    AutoReloader::new(move |notifier| {
        // Create the loader *inside* the closure
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub explanation: String,
    pub chart: Option<ChartSpec>,
    pub turns: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub turns: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

/// JSON error reply: `{"error": ..., "kind": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                kind,
            },
        }
    }

    fn unknown_session(id: &SessionId) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "session",
            format!("no open session {id}"),
        )
    }
}

// Every turn failure comes from upstream, so they all map to 502.
impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, e.kind(), e.user_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn index_handler(State(state): State<AppState>) -> Redirect {
    let id = state.sessions.create().await;
    Redirect::to(&format!("/chat/{id}"))
}

// Unknown or ended sessions start over with a fresh one.
async fn chat_page_handler(State(state): State<AppState>, Path(id): Path<SessionId>) -> Response {
    let Some(log) = state.sessions.get(&id).await else {
        info!(session_id = %id, "Unknown session, starting a new one");
        return Redirect::to("/").into_response();
    };
    let turns = log.lock().await.turns().to_vec();

    // Acquire env, get template, and render within the same block
    state
        .templates
        .acquire_env()
        .and_then(|env| {
            env.get_template("index.html").and_then(|tmpl| {
                let context = minijinja::context! {
                    title => "Smart Grid Chatbot",
                    session_id => id.to_string(),
                    turns => turns,
                };
                tmpl.render(context)
            })
        })
        .map(|html| Html(html).into_response())
        .unwrap_or_else(|e| {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
                .into_response()
        })
}

async fn transcript_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse, ApiError> {
    let log = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| ApiError::unknown_session(&id))?;
    let transcript = log.lock().await.transcript();
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        transcript,
    ))
}

async fn create_session_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.sessions.create().await;
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

async fn end_session_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.end(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::unknown_session(&id))
    }
}

async fn history_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let log = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| ApiError::unknown_session(&id))?;
    let turns = log.lock().await.turns().to_vec();
    Ok(Json(HistoryResponse { turns }))
}

#[instrument(skip_all, fields(session_id = %id))]
async fn turn_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    request: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let Json(request) = request.map_err(|rejection| {
        ApiError::new(StatusCode::BAD_REQUEST, "input", rejection.body_text())
    })?;
    if request.message.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "input",
            "Ask a question about the smart grid.",
        ));
    }

    let shared = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| ApiError::unknown_session(&id))?;
    // Held until the turn is recorded so a session never runs two turns at once.
    let mut log = shared.lock().await;

    let outcome = state
        .orchestrator
        .handle_turn(&request.message, &mut log)
        .await
        .map_err(|e| {
            warn!(kind = e.kind(), "Turn discarded");
            ApiError::from(e)
        })?;

    Ok(Json(TurnResponse {
        explanation: outcome.explanation,
        chart: outcome.chart,
        turns: log.turns().to_vec(),
    }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the application router.
pub fn router(state: AppState, static_dir: &FsPath) -> Router {
    // Serve static files from the static directory
    let static_files_service = ServeDir::new(static_dir).not_found_service(
        tower::service_fn(|_req: Request| async {
            Ok::<_, std::convert::Infallible>(
                (StatusCode::NOT_FOUND, "Not Found").into_response(),
            )
        }),
    );

    Router::new()
        .route("/", get(index_handler))
        .route("/chat/:id", get(chat_page_handler))
        .route("/chat/:id/transcript", get(transcript_handler))
        .route("/api/sessions", post(create_session_handler))
        .route("/api/sessions/:id", delete(end_session_handler))
        .route("/api/sessions/:id/history", get(history_handler))
        .route("/api/sessions/:id/turns", post(turn_handler))
        .route("/health", get(health_handler))
        // Route for static files must be nested under a path like /static
        // or it will conflict with other routes.
        .nest_service("/static", static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(port: u16, state: AppState, static_dir: &FsPath) -> Result<()> {
    let app = router(state, static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    // Bind using tokio::net::TcpListener
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    // Use axum::serve to run the application
    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
