//! HTTP glue: maps requests onto `TallyService` and results onto JSON.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{Path, Query, State, rejection::FormRejection},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use services::{NewSession, TallyError, TallyService};
use tally_core::ledger::{IncrementRequest, Snapshot, UndoOutcome};
use tally_core::model::{AnswerEvent, AnswerKind, Session};
use tally_core::LedgerError;

type AppState = Arc<TallyService>;

pub fn build_router(tally: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ORIGIN,
            header::ACCEPT,
        ]);

    Router::new()
        .route("/", get(dashboard))
        .route("/add", post(add_session_form))
        .route("/delete/:index", get(delete_session_form))
        .route("/api/increment", post(increment))
        .route("/api/undo", post(undo))
        .route("/api/status", get(status))
        .route("/api/reset", post(reset))
        .route("/api/stats", get(detailed_stats))
        .route("/api/commit", post(commit))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/:index", delete(delete_session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(tally)
}

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    Internal(String),
}

impl From<TallyError> for ApiError {
    fn from(err: TallyError) -> Self {
        match err {
            TallyError::Ledger(LedgerError::InvalidKind(None)) => {
                ApiError::BadRequest("Dados inválidos")
            }
            TallyError::Ledger(LedgerError::InvalidKind(Some(_))) => {
                ApiError::BadRequest("Tipo inválido")
            }
            TallyError::Ledger(LedgerError::MissingMetadata) => {
                ApiError::BadRequest("Informações da questão não fornecidas")
            }
            other => {
                tracing::error!(error = %other, "request failed");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.to_owned()),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

//
// ─── RESPONSES ────────────────────────────────────────────────────────────────
//

#[derive(Serialize)]
struct Counters {
    acertos: u32,
    erros: u32,
    total: u32,
}

impl From<Snapshot> for Counters {
    fn from(s: Snapshot) -> Self {
        Self {
            acertos: s.correct,
            erros: s.incorrect,
            total: s.total,
        }
    }
}

#[derive(Serialize)]
struct IncrementResponse {
    success: bool,
    message: &'static str,
    #[serde(flatten)]
    counters: Counters,
    operation_id: Option<usize>,
}

#[derive(Serialize)]
struct UndoResponse {
    success: bool,
    message: String,
    #[serde(flatten)]
    counters: Counters,
    #[serde(skip_serializing_if = "Option::is_none")]
    operacao_desfeita: Option<AnswerEvent>,
}

#[derive(Serialize)]
struct StatusResponse {
    #[serde(flatten)]
    counters: Counters,
    historico: Vec<AnswerEvent>,
}

#[derive(Serialize)]
struct SessionResponse {
    success: bool,
    message: &'static str,
    session: Session,
}

//
// ─── LEDGER HANDLERS ──────────────────────────────────────────────────────────
//

async fn increment(State(tally): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request: IncrementRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::BadRequest("Dados inválidos"))?;
    let kind = request.kind.as_deref().and_then(|k| AnswerKind::from_wire(k).ok());

    let snapshot = tally.increment(request).await?;

    let message = match kind {
        Some(AnswerKind::Incorrect) => "Erro contabilizado",
        _ => "Acerto contabilizado",
    };
    Ok(Json(IncrementResponse {
        success: true,
        message,
        counters: snapshot.into(),
        operation_id: snapshot.last_event_index,
    })
    .into_response())
}

async fn undo(State(tally): State<AppState>) -> Json<UndoResponse> {
    let response = match tally.undo().await {
        UndoOutcome::NothingToUndo { snapshot } => UndoResponse {
            success: false,
            message: "Não há operações para desfazer".to_owned(),
            counters: snapshot.into(),
            operacao_desfeita: None,
        },
        UndoOutcome::Undone { event, snapshot } => UndoResponse {
            success: true,
            message: format!("Última operação ({}) desfeita", event.kind().as_wire()),
            counters: snapshot.into(),
            operacao_desfeita: Some(event),
        },
    };
    Json(response)
}

async fn status(State(tally): State<AppState>) -> Json<StatusResponse> {
    let status = tally.status().await;
    Json(StatusResponse {
        counters: status.snapshot.into(),
        historico: status.recent,
    })
}

async fn reset(State(tally): State<AppState>) -> Json<Value> {
    let snapshot = tally.reset().await;
    Json(json!({
        "success": true,
        "message": "Contadores zerados",
        "acertos": snapshot.correct,
        "erros": snapshot.incorrect,
        "total": snapshot.total,
    }))
}

async fn detailed_stats(State(tally): State<AppState>) -> Json<Value> {
    let stats = tally.detailed_stats().await;
    Json(json!({
        "success": true,
        "stats": stats,
        "total_registros": stats.total_events,
    }))
}

#[derive(Debug, Deserialize)]
struct CommitRequest {
    #[serde(rename = "materia", default)]
    subject: String,
    #[serde(rename = "caderno", default)]
    notebook: String,
}

async fn commit(
    State(tally): State<AppState>,
    Json(request): Json<CommitRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = tally.commit(request.subject, request.notebook).await?;
    Ok(Json(SessionResponse {
        success: true,
        message: "Sessão salva",
        session,
    }))
}

//
// ─── SESSION HANDLERS ─────────────────────────────────────────────────────────
//

async fn dashboard(State(tally): State<AppState>) -> Response {
    Json(tally.dashboard().await).into_response()
}

#[derive(Debug, Deserialize)]
struct SessionFilter {
    materia: Option<String>,
}

async fn list_sessions(
    State(tally): State<AppState>,
    Query(filter): Query<SessionFilter>,
) -> Response {
    Json(tally.sessions(filter.materia.as_deref()).await).into_response()
}

async fn create_session(
    State(tally): State<AppState>,
    Json(new): Json<NewSession>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = tally.create_session(new).await?;
    Ok(Json(SessionResponse {
        success: true,
        message: "Sessão salva",
        session,
    }))
}

async fn delete_session(
    State(tally): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<Value>, ApiError> {
    let removed = tally.delete_session(index).await?;
    Ok(Json(json!({ "success": removed.is_some() })))
}

async fn add_session_form(
    State(tally): State<AppState>,
    form: Result<Form<NewSession>, FormRejection>,
) -> Result<Redirect, ApiError> {
    let Form(new) = form.map_err(|rejection| {
        tracing::debug!(error = %rejection, "session form rejected");
        ApiError::BadRequest("Dados inválidos")
    })?;
    tally.create_session(new).await?;
    Ok(Redirect::to("/"))
}

async fn delete_session_form(
    State(tally): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Redirect, ApiError> {
    tally.delete_session(index).await?;
    Ok(Redirect::to("/"))
}
