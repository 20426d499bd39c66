//! Client-side stream consumer.
//!
//! Reconstructs the event sequence from the HTTP response in any of the
//! three transport shapes (buffered JSON, typed SSE, legacy plain text),
//! surfaces log/metric events as they arrive, and applies the terminal
//! solution back onto the caller's problem. Transport failures are never
//! raised: they resolve to `SolveStatus::NotSolved`.

use futures::StreamExt;

use crate::domain::events::SolverEvent;
use crate::domain::models::{MipProblem, MipSolution};
use crate::domain::value_objects::SolveStatus;
use crate::solver::SolverInfo;
use crate::streaming::frame::{PlainTextDecoder, SseDecoder};

/// How the response body is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// One buffered JSON solution (no streaming).
    Buffered,
    /// Typed SSE events; the canonical streaming mode.
    #[default]
    Sse,
    /// Legacy `LOG:`/`RESULT:` line framing.
    PlainText,
}

pub struct SolverClient {
    base_url: String,
    http: reqwest::Client,
    mode: StreamMode,
}

impl SolverClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            mode: StreamMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: StreamMode) -> Self {
        self.mode = mode;
        self
    }

    /// Checks whether the solver API is reachable.
    pub async fn available(&self) -> bool {
        self.solver_info().await.is_some()
    }

    pub async fn solver_info(&self) -> Option<SolverInfo> {
        let response = self
            .http
            .get(format!("{}/solver-info", self.base_url))
            .send()
            .await
            .ok()?;
        response.error_for_status().ok()?.json().await.ok()
    }

    /// Solves the problem remotely, logging progress events as they arrive.
    pub async fn solve(&self, problem: &mut MipProblem) -> SolveStatus {
        self.solve_with(problem, &mut |event| match event {
            SolverEvent::Log { message, .. } => tracing::info!("{message}"),
            SolverEvent::Metric {
                iteration,
                objective_value,
                gap,
                ..
            } => tracing::info!(
                iteration = *iteration,
                objective_value = *objective_value,
                gap = *gap,
                "solver progress"
            ),
            _ => {}
        })
        .await
    }

    /// Solves the problem remotely, passing every decoded event to
    /// `on_event` as it arrives.
    ///
    /// On success with status `optimal`, variable values are written back
    /// onto `problem`; for any other status the problem is left untouched.
    pub async fn solve_with(
        &self,
        problem: &mut MipProblem,
        on_event: &mut dyn FnMut(&SolverEvent),
    ) -> SolveStatus {
        let solution = match self.mode {
            StreamMode::Buffered => self.fetch_buffered(problem).await,
            StreamMode::Sse => self.fetch_sse(problem, on_event).await,
            StreamMode::PlainText => self.fetch_plain(problem, on_event).await,
        };
        match solution {
            Some(solution) => apply_solution(problem, &solution),
            // No solution ever captured: a recoverable outcome, not an error.
            None => SolveStatus::NotSolved,
        }
    }

    /// Blocking variant, usable with or without an ambient async runtime.
    ///
    /// Outside a runtime it creates a transient one; inside a runtime it
    /// re-enters on a scoped thread so the caller's event loop is never
    /// blocked on itself.
    pub fn solve_blocking(&self, problem: &mut MipProblem) -> SolveStatus {
        if tokio::runtime::Handle::try_current().is_ok() {
            std::thread::scope(|scope| {
                let worker = scope.spawn(|| run_to_completion(self.solve(problem)));
                match worker.join() {
                    Ok(status) => status,
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            })
        } else {
            run_to_completion(self.solve(problem))
        }
    }

    async fn fetch_buffered(&self, problem: &MipProblem) -> Option<MipSolution> {
        let response = match self
            .http
            .post(format!("{}/solve", self.base_url))
            .json(problem)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "could not reach the solver API");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "solver API rejected the problem");
            return None;
        }
        response
            .json()
            .await
            .map_err(|error| tracing::warn!(%error, "malformed solution payload"))
            .ok()
    }

    async fn fetch_sse(
        &self,
        problem: &MipProblem,
        on_event: &mut dyn FnMut(&SolverEvent),
    ) -> Option<MipSolution> {
        let response = match self
            .http
            .post(format!("{}/solve", self.base_url))
            .query(&[("stream", "sse")])
            .json(problem)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "could not reach the solver API");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "solver API rejected the problem");
            return None;
        }

        let mut consumer = SseConsumer::default();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => consumer.feed(&String::from_utf8_lossy(&bytes), on_event),
                Err(error) => {
                    // Mid-stream failure leaves a valid partial sequence.
                    tracing::warn!(%error, "event stream aborted");
                    break;
                }
            }
        }
        consumer.into_solution()
    }

    async fn fetch_plain(
        &self,
        problem: &MipProblem,
        on_event: &mut dyn FnMut(&SolverEvent),
    ) -> Option<MipSolution> {
        let response = match self
            .http
            .post(format!("{}/solve", self.base_url))
            .json(problem)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "could not reach the solver API");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "solver API rejected the problem");
            return None;
        }

        let mut consumer = PlainConsumer::default();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => consumer.feed(&String::from_utf8_lossy(&bytes), on_event),
                Err(error) => {
                    tracing::warn!(%error, "event stream aborted");
                    break;
                }
            }
        }
        consumer.finish(on_event)
    }
}

fn run_to_completion(future: impl std::future::Future<Output = SolveStatus>) -> SolveStatus {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(future),
        Err(error) => {
            tracing::warn!(%error, "could not start a client runtime");
            SolveStatus::NotSolved
        }
    }
}

/// Maps the solution status through the fixed table and writes variable
/// values back only when it maps to `Optimal`.
fn apply_solution(problem: &mut MipProblem, solution: &MipSolution) -> SolveStatus {
    let status = SolveStatus::from_engine_status(&solution.status);
    if status == SolveStatus::Optimal {
        for variable in &mut problem.variables {
            if let Some(value) = solution.variables.get(&variable.name) {
                variable.value = Some(*value);
            }
        }
    }
    status
}

/// Incremental SSE consumption: surfaces events in order, remembers the last
/// result seen (duplicates are tolerated, last write wins).
#[derive(Default)]
struct SseConsumer {
    decoder: SseDecoder,
    solution: Option<MipSolution>,
}

impl SseConsumer {
    fn feed(&mut self, chunk: &str, on_event: &mut dyn FnMut(&SolverEvent)) {
        for event in self.decoder.push(chunk) {
            if let SolverEvent::Result { solution, .. } = &event {
                self.solution = Some(solution.clone());
            }
            on_event(&event);
        }
    }

    fn into_solution(self) -> Option<MipSolution> {
        self.solution
    }
}

/// Incremental plain-text consumption. The last `RESULT:` line seen is
/// authoritative; log lines after a result are ignored.
#[derive(Default)]
struct PlainConsumer {
    decoder: PlainTextDecoder,
    solution: Option<MipSolution>,
}

impl PlainConsumer {
    fn feed(&mut self, chunk: &str, on_event: &mut dyn FnMut(&SolverEvent)) {
        for event in self.decoder.push(chunk) {
            self.accept(event, on_event);
        }
    }

    fn finish(mut self, on_event: &mut dyn FnMut(&SolverEvent)) -> Option<MipSolution> {
        if let Some(event) = self.decoder.finish() {
            self.accept(event, on_event);
        }
        self.solution
    }

    fn accept(&mut self, event: SolverEvent, on_event: &mut dyn FnMut(&SolverEvent)) {
        match &event {
            SolverEvent::Result { solution, .. } => {
                self.solution = Some(solution.clone());
            }
            _ if self.solution.is_some() => {}
            _ => on_event(&event),
        }
    }
}
