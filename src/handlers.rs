//! HTTP route handlers.
//!
//! The browser UI is a thin client: it renders the JSON returned here and
//! forwards every user intent to one of these endpoints.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::errors::NotesError;
use crate::models::{
    AiService, AiServiceRequest, DeleteResult, DraftRequest, NoteEditRequest, NoteEditResult,
    Notice, Reply, SavedNote, Settings, SummaryEditRequest, SummarySaveRequest, Template,
    TemplateRequest,
};
use crate::session::SessionSnapshot;
use crate::summarize;
use crate::sync;
use crate::workspace::WorkspaceSnapshot;
use crate::AppState;

type ApiResult<T> = Result<Json<Reply<T>>, NotesError>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/draft", put(set_draft).delete(clear_draft))
        // Templates
        .route("/api/templates", get(list_templates).post(add_template))
        .route(
            "/api/templates/{id}",
            put(update_template).delete(delete_template),
        )
        .route("/api/templates/{id}/select", post(select_template))
        // AI services
        .route("/api/services", get(list_services).post(add_service))
        .route("/api/services/{id}", axum::routing::delete(delete_service))
        .route("/api/services/{id}/default", post(set_default_service))
        // Settings
        .route("/api/settings", get(get_settings).put(save_settings))
        // Saved notes
        .route("/api/notes", get(list_notes))
        .route("/api/notes/{id}", put(edit_note).delete(delete_note))
        .route("/api/notes/{id}/copy", get(copy_note))
        // Summary session
        .route(
            "/api/summary",
            get(get_summary)
                .post(start_summary)
                .put(edit_summary)
                .delete(cancel_summary),
        )
        .route("/api/summary/save", post(save_summary))
        .route("/api/summary/ws", get(summary_ws))
        .with_state(state)
}

// ============================================================================
// State & Draft
// ============================================================================

pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<WorkspaceSnapshot> {
    Json(state.workspace.lock().await.snapshot())
}

pub async fn set_draft(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DraftRequest>,
) -> Json<Reply<String>> {
    let mut ws = state.workspace.lock().await;
    ws.draft.set(body.text);
    Json(Reply::quiet(ws.draft.text().to_string()))
}

pub async fn clear_draft(State(state): State<Arc<AppState>>) -> Json<Reply<String>> {
    state.workspace.lock().await.draft.clear();
    Json(Reply::new(
        String::new(),
        Notice::info("Input cleared", "Your input has been cleared successfully."),
    ))
}

// ============================================================================
// Templates
// ============================================================================

pub async fn list_templates(State(state): State<Arc<AppState>>) -> Json<Vec<Template>> {
    Json(state.workspace.lock().await.templates.list().to_vec())
}

pub async fn add_template(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TemplateRequest>,
) -> ApiResult<Template> {
    let mut ws = state.workspace.lock().await;
    let template = ws.templates.add(&body.name, &body.content)?.clone();
    Ok(Json(Reply::new(
        template,
        Notice::info("Template saved", "Your new template has been saved successfully."),
    )))
}

pub async fn update_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<TemplateRequest>,
) -> ApiResult<Template> {
    let mut ws = state.workspace.lock().await;
    let template = ws.templates.update(id, &body.name, &body.content)?.clone();
    Ok(Json(Reply::new(
        template,
        Notice::info("Template updated", "Your template has been updated successfully."),
    )))
}

pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Template> {
    let mut ws = state.workspace.lock().await;
    let removed = ws.delete_template(id)?;
    Ok(Json(Reply::new(
        removed,
        Notice::info("Template deleted", "Your template has been deleted successfully."),
    )))
}

pub async fn select_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Template> {
    let mut ws = state.workspace.lock().await;
    let template = ws.templates.select(id)?.clone();
    Ok(Json(Reply::quiet(template)))
}

// ============================================================================
// AI Services
// ============================================================================

pub async fn list_services(State(state): State<Arc<AppState>>) -> Json<Vec<AiService>> {
    Json(state.workspace.lock().await.services.list().to_vec())
}

pub async fn add_service(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AiServiceRequest>,
) -> ApiResult<AiService> {
    let mut ws = state.workspace.lock().await;
    let service = ws.add_service(&body.name, &body.api_key)?;
    Ok(Json(Reply::new(
        service,
        Notice::info(
            "AI Service added",
            "Your new AI service has been added successfully.",
        ),
    )))
}

pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<AiService> {
    let mut ws = state.workspace.lock().await;
    let removed = ws.services.delete(id)?;
    Ok(Json(Reply::new(
        removed,
        Notice::info(
            "AI Service deleted",
            "The AI service has been deleted successfully.",
        ),
    )))
}

pub async fn set_default_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<AiService> {
    let mut ws = state.workspace.lock().await;
    let service = ws.services.set_default(id)?.clone();
    let description = format!("{} is now set as the default AI service.", service.name);
    Ok(Json(Reply::new(
        service,
        Notice::info("Default AI Service updated", description),
    )))
}

// ============================================================================
// Settings
// ============================================================================

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.workspace.lock().await.settings.clone())
}

pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Settings>,
) -> ApiResult<Settings> {
    let mut ws = state.workspace.lock().await;
    ws.settings.update(body.prompt, body.temperature)?;
    Ok(Json(Reply::new(
        ws.settings.clone(),
        Notice::info("Settings saved", "Your LLM settings have been updated."),
    )))
}

// ============================================================================
// Saved Notes
// ============================================================================

pub async fn list_notes(State(state): State<Arc<AppState>>) -> Json<Vec<SavedNote>> {
    Json(state.workspace.lock().await.notes.list().to_vec())
}

pub async fn edit_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<NoteEditRequest>,
) -> ApiResult<NoteEditResult> {
    let outcome = sync::edit_note(&state, id, &body.title, &body.content).await?;
    let notice = outcome.notice();
    Ok(Json(Reply::new(
        NoteEditResult {
            synced: outcome.sync_error.is_none(),
            note: outcome.note,
        },
        notice,
    )))
}

pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Json<Reply<DeleteResult>> {
    let removed = state.workspace.lock().await.notes.delete(id);
    if !removed {
        debug!(id, "delete of unknown note ignored");
    }
    Json(Reply::new(
        DeleteResult { id, removed },
        Notice::info("Note deleted", "Your note has been deleted successfully."),
    ))
}

pub async fn copy_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<String, NotesError> {
    let ws = state.workspace.lock().await;
    ws.notes
        .get(id)
        .map(SavedNote::clipboard_text)
        .ok_or_else(|| NotesError::not_found("Note", id))
}

// ============================================================================
// Summary Session
// ============================================================================

pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.workspace.lock().await.session.snapshot())
}

pub async fn start_summary(State(state): State<Arc<AppState>>) -> ApiResult<SessionSnapshot> {
    let snapshot = summarize::start_summary(&state).await?;
    Ok(Json(Reply::quiet(snapshot)))
}

pub async fn edit_summary(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SummaryEditRequest>,
) -> ApiResult<SessionSnapshot> {
    let snapshot = summarize::edit_summary(&state, &body).await?;
    Ok(Json(Reply::quiet(snapshot)))
}

pub async fn cancel_summary(State(state): State<Arc<AppState>>) -> Json<Reply<SessionSnapshot>> {
    let (_, snapshot) = summarize::cancel_summary(&state).await;
    Json(Reply::quiet(snapshot))
}

pub async fn save_summary(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SummarySaveRequest>,
) -> ApiResult<SavedNote> {
    let note = summarize::save_summary(&state, body.title.as_deref()).await?;
    Ok(Json(Reply::new(
        note,
        Notice::info("Summary saved", "Your summary has been saved successfully."),
    )))
}

// ============================================================================
// WebSocket Event Feed
// ============================================================================

/// GET /api/summary/ws - live session events for the summary dialog.
pub async fn summary_ws(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_summary_ws(socket, state))
}

async fn handle_summary_ws(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Subscribe before reading the snapshot so nothing falls in between.
    let mut events = state.subscribe();
    let snapshot = state.workspace.lock().await.session.snapshot();
    let init_msg = serde_json::json!({ "type": "init", "session": snapshot });
    if ws_tx
        .send(Message::Text(init_msg.to_string().into()))
        .await
        .is_err()
    {
        return;
    }
    info!("summary feed connected");

    loop {
        tokio::select! {
            event = events.recv() => {
                let json = match event {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(error = %e, "failed to encode session event");
                            continue;
                        }
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "summary feed lagging");
                        serde_json::json!({ "type": "lagged", "skipped": skipped }).to_string()
                    }
                    Err(RecvError::Closed) => break,
                };
                if ws_tx.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    debug!("summary feed closed");
}
