//! HTTP adaptation layer.
//!
//! A thin axum router exposes the service:
//!
//! - `GET /status` - the live push channel (`text/event-stream`), one
//!   labeled frame per status event
//! - `GET /runs` - current run summaries as JSON
//! - `PUT /synthetic/{run_id}` / `DELETE /synthetic/{run_id}` - insert or
//!   remove a synthetic run for testing
//!
//! The router never touches registry internals: snapshots come from the
//! shared status handle the poll loop refreshes, live data arrives through
//! stream sessions, and admin operations are forwarded to the poll loop
//! over its command channel.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, put};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::events::{AdmissionController, EventBus, EventKind, StatusSnapshot, StreamSession};
use crate::provider::SyntheticSpec;
use crate::registry::{RegistryCommand, SharedStatus};
use crate::run::RunSnapshot;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    bus: EventBus,
    status: SharedStatus,
    admission: Arc<AdmissionController>,
    commands: mpsc::Sender<RegistryCommand>,
    queue_capacity: usize,
}

impl AppState {
    pub fn new(
        bus: EventBus,
        status: SharedStatus,
        admission: Arc<AdmissionController>,
        commands: mpsc::Sender<RegistryCommand>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            bus,
            status,
            admission,
            commands,
            queue_capacity,
        }
    }

    fn current_status(&self) -> StatusSnapshot {
        self.status
            .read()
            .map(|status| status.clone())
            .unwrap_or_default()
    }
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status_stream))
        .route("/runs", get(list_runs))
        .route(
            "/synthetic/{run_id}",
            put(insert_synthetic).delete(remove_synthetic),
        )
        .with_state(state)
}

/// Binds and serves until shutdown is signalled.
pub async fn serve(
    bind: &str,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: bind.to_string(),
            source,
        })?;
    info!(addr = bind, "status server listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}

async fn status_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let snapshot = state.current_status();
    let (session, handle) = StreamSession::open(
        &state.bus,
        &[EventKind::Counter, EventKind::Run, EventKind::RunSet],
        state.queue_capacity,
        &snapshot,
    );
    state.admission.admit(handle);

    let frames = session
        .into_frames()
        .map(|frame| Ok(Event::default().event(frame.label).data(frame.data)));
    Sse::new(frames)
}

async fn list_runs(State(state): State<AppState>) -> Json<Vec<RunSnapshot>> {
    Json(state.current_status().runs)
}

async fn insert_synthetic(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Json(spec): Json<SyntheticSpec>,
) -> StatusCode {
    let command = RegistryCommand::InsertSynthetic { run_id, spec };
    match state.commands.send(command).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn remove_synthetic(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> StatusCode {
    match state
        .commands
        .send(RegistryCommand::RemoveSynthetic { run_id })
        .await
    {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
