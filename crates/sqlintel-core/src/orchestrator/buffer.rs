//! Per-buffer state machine

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::result::{AnalysisResult, BufferId};
use super::EngineInner;
use crate::dialect::SqlDialect;
use crate::suggest::{Candidate, RecentlyAccepted, Suggestion, SuggestionList};

/// Where a buffer is in its analysis lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferPhase {
    Idle,
    /// A debounce timer is waiting to fire
    Pending,
    Running,
}

/// Table and view candidates built from one snapshot version
#[derive(Clone)]
pub(crate) struct IdentifierCache {
    pub(crate) snapshot_version: u64,
    pub(crate) dialect: SqlDialect,
    pub(crate) tables: Arc<Vec<Candidate>>,
}

pub(crate) struct BufferState {
    pub(crate) phase: BufferPhase,
    /// Bumped by every edit and direct request; a cycle may publish only
    /// while its generation is still the latest
    pub(crate) generation: u64,
    pub(crate) text: String,
    pub(crate) cursor: usize,
    pub(crate) timer: Option<JoinHandle<()>>,
    pub(crate) running: Option<CancellationToken>,
    pub(crate) latest: Option<Arc<AnalysisResult>>,
    pub(crate) recent: RecentlyAccepted,
    pub(crate) identifiers: Option<IdentifierCache>,
    pub(crate) closed: bool,
}

impl BufferState {
    fn new(recent_capacity: usize) -> Self {
        Self {
            phase: BufferPhase::Idle,
            generation: 0,
            text: String::new(),
            cursor: 0,
            timer: None,
            running: None,
            latest: None,
            recent: RecentlyAccepted::new(recent_capacity),
            identifiers: None,
            closed: false,
        }
    }

    /// Snapshot version behind the result currently on display
    pub(crate) fn last_snapshot_version(&self) -> u64 {
        self.latest
            .as_ref()
            .map(|r| r.snapshot_version)
            .unwrap_or(0)
    }

    /// Start a new request: supersede whatever is pending or running and
    /// return the new generation
    pub(crate) fn supersede(&mut self, text: String, cursor: usize) -> u64 {
        self.generation += 1;
        if let Some(token) = self.running.take() {
            token.cancel();
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.text = text;
        self.cursor = cursor;
        self.generation
    }

    fn stop(&mut self) {
        self.closed = true;
        if let Some(token) = self.running.take() {
            token.cancel();
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.phase = BufferPhase::Idle;
    }
}

pub(crate) struct Buffer {
    pub(crate) id: BufferId,
    pub(crate) state: Mutex<BufferState>,
}

impl Buffer {
    pub(crate) fn new(id: BufferId, recent_capacity: usize) -> Self {
        Self {
            id,
            state: Mutex::new(BufferState::new(recent_capacity)),
        }
    }

    pub(crate) fn stop(&self) {
        self.state.lock().stop();
    }
}

/// Handle to one open editor buffer
#[derive(Clone)]
pub struct BufferHandle {
    pub(crate) engine: Arc<EngineInner>,
    pub(crate) buffer: Arc<Buffer>,
}

impl BufferHandle {
    pub fn id(&self) -> BufferId {
        self.buffer.id
    }

    pub fn phase(&self) -> BufferPhase {
        self.buffer.state.lock().phase
    }

    /// Buffer text as of the last edit or request
    pub fn text(&self) -> String {
        self.buffer.state.lock().text.clone()
    }

    /// Latest published result
    pub fn latest(&self) -> Option<Arc<AnalysisResult>> {
        self.buffer.state.lock().latest.clone()
    }

    /// Record an edit. Analysis runs once the buffer has been quiet for the
    /// debounce interval; earlier pending or running work is superseded.
    pub fn edit(&self, text: impl Into<String>, cursor: usize) {
        let mut state = self.buffer.state.lock();
        if state.closed {
            return;
        }
        let generation = state.supersede(text.into(), cursor);
        let engine = Arc::clone(&self.engine);
        let buffer = Arc::clone(&self.buffer);
        let delay = self.engine.config.debounce();
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.fire(&buffer, generation).await;
        }));
        state.phase = BufferPhase::Pending;
        tracing::trace!(buffer = %self.buffer.id, generation, "edit debounced");
    }

    /// Analyze now, bypassing the debounce. Always returns a result; if a
    /// newer request overtakes this one the result comes back with
    /// `superseded` set and is not published.
    pub async fn analyze(&self, text: impl Into<String>, cursor: usize) -> Arc<AnalysisResult> {
        let (generation, token) = {
            let mut state = self.buffer.state.lock();
            let generation = state.supersede(text.into(), cursor);
            let token = CancellationToken::new();
            state.running = Some(token.clone());
            state.phase = BufferPhase::Running;
            (generation, token)
        };
        self.engine.run(&self.buffer, generation, &token).await
    }

    /// Completions only
    pub async fn suggest(&self, text: impl Into<String>, cursor: usize) -> SuggestionList {
        self.analyze(text, cursor).await.suggestions.clone()
    }

    /// Re-run analysis on the buffer's current text and cursor
    pub async fn reanalyze(&self) -> Arc<AnalysisResult> {
        let (text, cursor) = {
            let state = self.buffer.state.lock();
            (state.text.clone(), state.cursor)
        };
        self.analyze(text, cursor).await
    }

    /// Remember that the user picked `suggestion`, boosting it in later
    /// rankings for this buffer
    pub fn accept(&self, suggestion: &Suggestion) {
        self.buffer
            .state
            .lock()
            .recent
            .accept(suggestion.kind, &suggestion.label);
    }

    /// Stop all work for the buffer and forget it
    pub fn close(&self) {
        self.buffer.stop();
        self.engine.buffers.lock().remove(&self.buffer.id);
        tracing::debug!(buffer = %self.buffer.id, "buffer closed");
    }
}
