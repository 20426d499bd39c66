//! HTTP handlers and the stream transport adapter.
//!
//! `/solve` either runs a buffered solve or, with `stream=sse`, drives the
//! orchestrator's events into the response body one frame at a time. Peer
//! disconnect surfaces as the body stream being dropped; the drop guard then
//! interrupts the orchestrator exactly once.

use std::convert::Infallible;

use async_stream::stream;
use axum::body::Body;
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;

use crate::application::orchestrator::{InterruptHandle, SolveError, SolveOrchestrator};
use crate::application::MipSolverService;
use crate::domain::models::MipProblem;
use crate::solver::EngineFactory;
use crate::streaming::frame;

#[derive(Debug, Deserialize)]
pub struct SolveQuery {
    /// Maximum solver time in seconds, forwarded best-effort to the engine.
    pub timeout: Option<f64>,
    /// `sse` enables typed event streaming; anything else means one buffered
    /// solution response.
    pub stream: Option<String>,
}

pub async fn solver_info() -> impl IntoResponse {
    Json(EngineFactory::descriptor())
}

pub async fn solve(Query(query): Query<SolveQuery>, Json(problem): Json<MipProblem>) -> Response {
    let service = MipSolverService::new();

    if query.stream.as_deref() == Some("sse") {
        match service.begin(problem, query.timeout) {
            Ok(orchestrator) => sse_response(orchestrator),
            Err(error) => error_response(error),
        }
    } else {
        match service.solve(problem, query.timeout).await {
            Ok(solution) => Json(solution).into_response(),
            Err(error) => error_response(error),
        }
    }
}

fn error_response(error: SolveError) -> Response {
    let status = match &error {
        SolveError::Schema(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SolveError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "detail": error.to_string() }))).into_response()
}

fn sse_response(orchestrator: SolveOrchestrator) -> Response {
    let handle = orchestrator.interrupt_handle();
    let events = orchestrator.run();

    let body = stream! {
        let mut guard = InterruptOnDrop::new(handle);
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            let terminal = event.is_terminal();
            match frame::encode_sse(&event) {
                Ok(encoded) => yield Ok::<_, Infallible>(encoded.into_bytes()),
                Err(error) => tracing::warn!(%error, "dropping unencodable event"),
            }
            if terminal {
                guard.disarm();
            }
        }
    };

    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(body))
    {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(%error, "failed to build streaming response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Fires the orchestrator's interrupt when the response stream is dropped
/// before the terminal event, i.e. when the peer disconnected mid-solve.
struct InterruptOnDrop {
    handle: Option<InterruptHandle>,
}

impl InterruptOnDrop {
    fn new(handle: InterruptHandle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// The stream completed normally; nothing to cancel.
    fn disarm(&mut self) {
        self.handle.take();
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::info!("client disconnected, interrupting solver");
            handle.interrupt();
        }
    }
}
