//! Tests for the summary pipeline: session transitions driven by a provider
//! stream, cancellation, failure and the saved-notes handoff.
//!
//! Providers here are in-process fakes, so nothing touches the network.

use super::*;
use crate::config::Config;
use crate::errors::{NotesError, SyncError};
use crate::provider::{FragmentStream, SummaryProvider};
use crate::session::SessionState;
use crate::sync::{self, DisabledSync, NoteSync};
use futures_util::future::BoxFuture;
use futures_util::stream;
use futures_util::{FutureExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

// ============================================================================
// Fakes
// ============================================================================

/// Hands out one prepared stream (or error) and records every request.
struct ScriptedProvider {
    script: StdMutex<Option<Result<FragmentStream, ProviderError>>>,
    requests: StdMutex<Vec<SummaryRequest>>,
}

impl ScriptedProvider {
    fn fragments(parts: &[&str]) -> Self {
        let items: Vec<Result<String, ProviderError>> =
            parts.iter().map(|p| Ok(p.to_string())).collect();
        Self::stream(stream::iter(items).boxed())
    }

    fn stream(stream: FragmentStream) -> Self {
        Self {
            script: StdMutex::new(Some(Ok(stream))),
            requests: StdMutex::new(Vec::new()),
        }
    }

    fn failing(error: ProviderError) -> Self {
        Self {
            script: StdMutex::new(Some(Err(error))),
            requests: StdMutex::new(Vec::new()),
        }
    }
}

impl SummaryProvider for ScriptedProvider {
    fn summarize(
        &self,
        request: SummaryRequest,
    ) -> BoxFuture<'static, Result<FragmentStream, ProviderError>> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .script
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ProviderError::Transport("stream already used".to_string())));
        async move { next }.boxed()
    }
}

/// A stream fed by the test through a channel, for mid-stream interleaving.
fn channel_stream() -> (mpsc::UnboundedSender<Result<String, ProviderError>>, FragmentStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stream = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
    .boxed();
    (tx, stream)
}

struct FailingSync;

impl NoteSync for FailingSync {
    fn put_note(&self, _note: SavedNote) -> BoxFuture<'static, Result<(), SyncError>> {
        async { Err(SyncError::Transport("connection refused".to_string())) }.boxed()
    }
}

struct RecordingSync {
    seen: Arc<StdMutex<Vec<SavedNote>>>,
}

impl NoteSync for RecordingSync {
    fn put_note(&self, note: SavedNote) -> BoxFuture<'static, Result<(), SyncError>> {
        self.seen.lock().unwrap().push(note);
        async { Ok(()) }.boxed()
    }
}

/// Holds the first push back so a later edit could overtake it. Records
/// notes in the order the pushes complete.
struct SlowFirstSync {
    calls: Arc<AtomicUsize>,
    completed: Arc<StdMutex<Vec<SavedNote>>>,
}

impl NoteSync for SlowFirstSync {
    fn put_note(&self, note: SavedNote) -> BoxFuture<'static, Result<(), SyncError>> {
        let first = self.calls.fetch_add(1, Ordering::SeqCst) == 0;
        let completed = self.completed.clone();
        async move {
            if first {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            completed.lock().unwrap().push(note);
            Ok(())
        }
        .boxed()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn state_with(provider: ScriptedProvider) -> (Arc<AppState>, Arc<ScriptedProvider>) {
    let provider = Arc::new(provider);
    let state = Arc::new(AppState::with_parts(
        Config::default(),
        provider.clone(),
        Arc::new(DisabledSync),
    ));
    (state, provider)
}

async fn set_draft(state: &Arc<AppState>, text: &str) {
    state.workspace.lock().await.draft.set(text);
}

async fn next_event(rx: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("event channel closed")
}

/// Skip events until one matches.
async fn wait_for<F>(rx: &mut broadcast::Receiver<SessionEvent>, pred: F) -> SessionEvent
where
    F: Fn(&SessionEvent) -> bool,
{
    loop {
        let event = next_event(rx).await;
        if pred(&event) {
            return event;
        }
    }
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_stream_accumulates_in_order() {
    let (state, provider) = state_with(ScriptedProvider::fragments(&["Hello", " ", "world"]));
    set_draft(&state, "We discussed the launch.").await;
    let mut events = state.subscribe();

    let (ticket, request) = begin_summary(&state).await.unwrap();
    assert_eq!(
        state.workspace.lock().await.session.state(),
        SessionState::Requesting
    );
    drive_summary(state.clone(), ticket, request).await;

    let ws = state.workspace.lock().await;
    assert_eq!(ws.session.state(), SessionState::Ready);
    assert_eq!(ws.session.buffer(), "Hello world");
    drop(ws);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    let g = ticket.0;
    assert_eq!(
        seen,
        vec![
            SessionEvent::Started { generation: g },
            SessionEvent::Streaming { generation: g },
            SessionEvent::Fragment {
                generation: g,
                text: "Hello".to_string(),
                buffer: "Hello".to_string(),
            },
            SessionEvent::Fragment {
                generation: g,
                text: " ".to_string(),
                buffer: "Hello ".to_string(),
            },
            SessionEvent::Fragment {
                generation: g,
                text: "world".to_string(),
                buffer: "Hello world".to_string(),
            },
            SessionEvent::Ready { generation: g, buffer: "Hello world".to_string() },
        ]
    );

    let requests = provider.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].note, "We discussed the launch.");
    assert!(requests[0].template.starts_with("Meeting Minutes Summary"));
}

#[tokio::test]
async fn test_start_spawns_and_reaches_ready() {
    let (state, _) = state_with(ScriptedProvider::fragments(&["Done."]));
    set_draft(&state, "notes").await;
    let mut events = state.subscribe();

    let snapshot = start_summary(&state).await.unwrap();
    assert_eq!(snapshot.state, SessionState::Requesting);

    let ready = wait_for(&mut events, |e| matches!(e, SessionEvent::Ready { .. })).await;
    assert!(matches!(ready, SessionEvent::Ready { ref buffer, .. } if buffer == "Done."));
}

#[tokio::test]
async fn test_save_after_stream() {
    let (state, _) = state_with(ScriptedProvider::fragments(&["Summary body"]));
    set_draft(&state, "raw").await;

    let (ticket, request) = begin_summary(&state).await.unwrap();
    drive_summary(state.clone(), ticket, request).await;

    let note = save_summary(&state, None).await.unwrap();
    assert_eq!(note.title, "Note 1");
    assert_eq!(note.content, "Summary body");

    let ws = state.workspace.lock().await;
    assert_eq!(ws.notes.len(), 1);
    assert_eq!(ws.session.state(), SessionState::Idle);
    assert_eq!(ws.session.buffer(), "");
    assert!(ws.draft.is_empty());
}

#[tokio::test]
async fn test_edit_then_save_with_title() {
    let (state, _) = state_with(ScriptedProvider::fragments(&["Generated"]));
    set_draft(&state, "raw").await;
    let (ticket, request) = begin_summary(&state).await.unwrap();
    drive_summary(state.clone(), ticket, request).await;

    let edit = SummaryEditRequest {
        text: Some("Hand-tuned".to_string()),
        title: Some("Board meeting".to_string()),
    };
    let snapshot = edit_summary(&state, &edit).await.unwrap();
    assert_eq!(snapshot.buffer, "Hand-tuned");
    assert_eq!(snapshot.state, SessionState::Ready);

    let note = save_summary(&state, None).await.unwrap();
    assert_eq!(note.title, "Board meeting");
    assert_eq!(note.content, "Hand-tuned");
}

#[tokio::test]
async fn test_save_title_overrides_session_title() {
    let (state, _) = state_with(ScriptedProvider::fragments(&["Generated"]));
    set_draft(&state, "raw").await;
    let (ticket, request) = begin_summary(&state).await.unwrap();
    drive_summary(state.clone(), ticket, request).await;

    let edit = SummaryEditRequest {
        text: None,
        title: Some("Draft title".to_string()),
    };
    edit_summary(&state, &edit).await.unwrap();

    let note = save_summary(&state, Some("Retro")).await.unwrap();
    assert_eq!(note.title, "Retro");
    assert_eq!(note.content, "Generated");
}

// ============================================================================
// Validation & failure
// ============================================================================

#[tokio::test]
async fn test_empty_draft_fails_validation() {
    let (state, provider) = state_with(ScriptedProvider::fragments(&["x"]));
    let err = start_summary(&state).await.unwrap_err();
    assert!(matches!(err, NotesError::Validation(_)));
    assert_eq!(
        state.workspace.lock().await.session.state(),
        SessionState::Idle
    );
    assert!(provider.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_request_failure_returns_to_idle() {
    let (state, _) = state_with(ScriptedProvider::failing(ProviderError::Transport(
        "connection refused".to_string(),
    )));
    set_draft(&state, "notes").await;
    let mut events = state.subscribe();

    let (ticket, request) = begin_summary(&state).await.unwrap();
    drive_summary(state.clone(), ticket, request).await;

    let failed = wait_for(&mut events, |e| matches!(e, SessionEvent::Failed { .. })).await;
    assert!(matches!(failed, SessionEvent::Failed { ref error, .. } if error.contains("connection refused")));

    let ws = state.workspace.lock().await;
    assert_eq!(ws.session.state(), SessionState::Idle);
    assert!(ws.session.last_error().is_some());
    assert!(ws.notes.is_empty());
}

#[tokio::test]
async fn test_mid_stream_failure_discards_partial() {
    let items = vec![
        Ok("partial".to_string()),
        Err(ProviderError::Malformed("bad line".to_string())),
        Ok("never".to_string()),
    ];
    let (state, _) = state_with(ScriptedProvider::stream(stream::iter(items).boxed()));
    set_draft(&state, "notes").await;

    let (ticket, request) = begin_summary(&state).await.unwrap();
    drive_summary(state.clone(), ticket, request).await;

    let ws = state.workspace.lock().await;
    assert_eq!(ws.session.state(), SessionState::Idle);
    assert_eq!(ws.session.buffer(), "");
    assert!(ws.notes.is_empty());
    drop(ws);

    assert!(save_summary(&state, None).await.is_err());
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancel_during_streaming() {
    let (tx, fragments) = channel_stream();
    let (state, _) = state_with(ScriptedProvider::stream(fragments));
    set_draft(&state, "notes").await;
    let mut events = state.subscribe();

    let (ticket, request) = begin_summary(&state).await.unwrap();
    let task = tokio::spawn(drive_summary(state.clone(), ticket, request));

    tx.send(Ok("Hello".to_string())).unwrap();
    wait_for(&mut events, |e| matches!(e, SessionEvent::Fragment { .. })).await;

    let (cancelled, snapshot) = cancel_summary(&state).await;
    assert!(cancelled);
    assert_eq!(snapshot.state, SessionState::Idle);
    assert_eq!(snapshot.buffer, "");

    // Fragments arriving after the cancel are never surfaced.
    tx.send(Ok(" world".to_string())).unwrap();
    drop(tx);
    task.await.unwrap();

    let ws = state.workspace.lock().await;
    assert_eq!(ws.session.state(), SessionState::Idle);
    assert_eq!(ws.session.buffer(), "");
    assert!(ws.notes.is_empty());
}

#[tokio::test]
async fn test_cancel_while_requesting() {
    let (tx, fragments) = channel_stream();
    let (state, _) = state_with(ScriptedProvider::stream(fragments));
    set_draft(&state, "notes").await;

    let (ticket, request) = begin_summary(&state).await.unwrap();
    let (cancelled, _) = cancel_summary(&state).await;
    assert!(cancelled);

    tx.send(Ok("late".to_string())).unwrap();
    drop(tx);
    drive_summary(state.clone(), ticket, request).await;

    let ws = state.workspace.lock().await;
    assert_eq!(ws.session.state(), SessionState::Idle);
    assert_eq!(ws.session.buffer(), "");
}

#[tokio::test]
async fn test_cancel_idle_is_noop() {
    let (state, _) = state_with(ScriptedProvider::fragments(&[]));
    let (cancelled, snapshot) = cancel_summary(&state).await;
    assert!(!cancelled);
    assert_eq!(snapshot.state, SessionState::Idle);
}

#[tokio::test]
async fn test_restart_supersedes_running_session() {
    let (tx, fragments) = channel_stream();
    let (state, _) = state_with(ScriptedProvider::stream(fragments));
    set_draft(&state, "first").await;
    let mut events = state.subscribe();

    let (first, request) = begin_summary(&state).await.unwrap();
    let task = tokio::spawn(drive_summary(state.clone(), first, request));
    tx.send(Ok("old".to_string())).unwrap();
    wait_for(&mut events, |e| matches!(e, SessionEvent::Fragment { .. })).await;

    let (second, _) = begin_summary(&state).await.unwrap();
    assert_ne!(first, second);
    let cancelled = wait_for(&mut events, |e| matches!(e, SessionEvent::Cancelled { .. })).await;
    assert_eq!(cancelled, SessionEvent::Cancelled { generation: first.0 });

    tx.send(Ok("stale".to_string())).unwrap();
    drop(tx);
    task.await.unwrap();

    let ws = state.workspace.lock().await;
    assert_eq!(ws.session.state(), SessionState::Requesting);
    assert_eq!(ws.session.buffer(), "");
    assert_eq!(ws.session.generation(), second.0);
}

#[tokio::test]
async fn test_edit_rejected_while_streaming() {
    let (tx, fragments) = channel_stream();
    let (state, _) = state_with(ScriptedProvider::stream(fragments));
    set_draft(&state, "notes").await;
    let mut events = state.subscribe();

    let (ticket, request) = begin_summary(&state).await.unwrap();
    let task = tokio::spawn(drive_summary(state.clone(), ticket, request));
    tx.send(Ok("model text".to_string())).unwrap();
    wait_for(&mut events, |e| matches!(e, SessionEvent::Fragment { .. })).await;

    let edit = SummaryEditRequest {
        text: Some("user text".to_string()),
        title: None,
    };
    let err = edit_summary(&state, &edit).await.unwrap_err();
    assert!(matches!(err, NotesError::InvalidTransition { .. }));

    drop(tx);
    task.await.unwrap();
    assert_eq!(state.workspace.lock().await.session.buffer(), "model text");
}

#[tokio::test]
async fn test_save_rejected_while_streaming_keeps_title() {
    let (tx, fragments) = channel_stream();
    let (state, _) = state_with(ScriptedProvider::stream(fragments));
    set_draft(&state, "notes").await;
    let mut events = state.subscribe();

    let (ticket, request) = begin_summary(&state).await.unwrap();
    let task = tokio::spawn(drive_summary(state.clone(), ticket, request));
    tx.send(Ok("partial".to_string())).unwrap();
    wait_for(&mut events, |e| matches!(e, SessionEvent::Fragment { .. })).await;

    let edit = SummaryEditRequest {
        text: None,
        title: Some("Weekly sync".to_string()),
    };
    edit_summary(&state, &edit).await.unwrap();

    let err = save_summary(&state, Some("Other")).await.unwrap_err();
    assert!(matches!(
        err,
        NotesError::InvalidTransition {
            action: "save",
            state: "streaming"
        }
    ));
    {
        let ws = state.workspace.lock().await;
        assert_eq!(ws.session.title(), "Weekly sync");
        assert_eq!(ws.session.state(), SessionState::Streaming);
        assert!(ws.notes.is_empty());
        assert_eq!(ws.draft.text(), "notes");
    }

    drop(tx);
    task.await.unwrap();
    let note = save_summary(&state, None).await.unwrap();
    assert_eq!(note.title, "Weekly sync");
    assert_eq!(note.content, "partial");
}

// ============================================================================
// Note edit sync
// ============================================================================

#[tokio::test]
async fn test_sync_failure_keeps_local_edit() {
    let state = Arc::new(AppState::with_parts(
        Config::default(),
        Arc::new(ScriptedProvider::fragments(&[])),
        Arc::new(FailingSync),
    ));
    let id = state.workspace.lock().await.save_note("old body", Some("Old")).id;

    let outcome = sync::edit_note(&state, id, "New", "new body").await.unwrap();
    assert!(outcome.sync_error.is_some());
    assert_eq!(outcome.notice().title, "Error");

    let ws = state.workspace.lock().await;
    let note = ws.notes.get(id).unwrap();
    assert_eq!(note.title, "New");
    assert_eq!(note.content, "new body");
}

#[tokio::test]
async fn test_sync_receives_full_note() {
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let state = Arc::new(AppState::with_parts(
        Config::default(),
        Arc::new(ScriptedProvider::fragments(&[])),
        Arc::new(RecordingSync { seen: seen.clone() }),
    ));
    let original = state.workspace.lock().await.save_note("body", None);

    let outcome = sync::edit_note(&state, original.id, "Retro", "edited").await.unwrap();
    assert!(outcome.sync_error.is_none());
    assert_eq!(outcome.notice().title, "Note updated");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, original.id);
    assert_eq!(seen[0].title, "Retro");
    assert_eq!(seen[0].content, "edited");
    assert_eq!(seen[0].created_at, original.created_at);
}

#[tokio::test]
async fn test_edit_unknown_note_is_not_synced() {
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let state = Arc::new(AppState::with_parts(
        Config::default(),
        Arc::new(ScriptedProvider::fragments(&[])),
        Arc::new(RecordingSync { seen: seen.clone() }),
    ));
    let err = sync::edit_note(&state, 404, "t", "c").await.unwrap_err();
    assert!(matches!(err, NotesError::NotFound { .. }));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rapid_edits_reach_remote_in_order() {
    let calls = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(StdMutex::new(Vec::new()));
    let state = Arc::new(AppState::with_parts(
        Config::default(),
        Arc::new(ScriptedProvider::fragments(&[])),
        Arc::new(SlowFirstSync {
            calls: calls.clone(),
            completed: completed.clone(),
        }),
    ));
    let id = state.workspace.lock().await.save_note("v0", None).id;

    let first = {
        let state = state.clone();
        tokio::spawn(async move { sync::edit_note(&state, id, "Notes", "v1").await })
    };
    while calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    let second = {
        let state = state.clone();
        tokio::spawn(async move { sync::edit_note(&state, id, "Notes", "v2").await })
    };

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let bodies: Vec<String> = completed
        .lock()
        .unwrap()
        .iter()
        .map(|n| n.content.clone())
        .collect();
    assert_eq!(bodies, vec!["v1", "v2"]);
    assert_eq!(
        state.workspace.lock().await.notes.get(id).unwrap().content,
        "v2"
    );
}
