//! Analysis orchestrator
//!
//! Each open buffer moves through `Idle -> Pending -> Running -> Idle`.
//! Edits restart a debounce timer; when it fires the buffer's latest text
//! is parsed, linted and completed in one cycle. Every edit or direct
//! request bumps the buffer's generation and cancels older work, and a
//! cycle publishes only if its generation is still the latest when it
//! finishes, so subscribers never see a result older than one they have
//! already received.

mod buffer;
mod cycle;
mod result;

pub use buffer::{BufferHandle, BufferPhase};
pub use result::{AnalysisResult, BufferId, Published, SourceVersion};

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::dialect::{ConnectionCapabilities, SqlDialect};
use crate::error::{Diagnostic, IntelError, RuleFailure};
use crate::lint::{LintMode, Rule};
use crate::metadata::{MetadataCache, MetadataSnapshot};
use crate::suggest::{table_candidates, RecentlyAccepted, SuggestionList, SuggestionSource};
use buffer::{Buffer, IdentifierCache};
use cycle::{run_cycle, Components, CycleInput, CycleOutput, Extensions};

/// Buffer id used for one-shot `Engine::analyze` calls
pub const ONE_SHOT: BufferId = BufferId(0);

const CHANNEL_CAPACITY: usize = 64;

/// The SQL intelligence engine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    metadata: Arc<dyn MetadataCache>,
    components: RwLock<Arc<Components>>,
    extensions: RwLock<Extensions>,
    capabilities: RwLock<ConnectionCapabilities>,
    pub(crate) buffers: Mutex<HashMap<BufferId, Arc<Buffer>>>,
    next_buffer: AtomicU64,
    published: broadcast::Sender<Published>,
    failures: broadcast::Sender<RuleFailure>,
    metadata_events: Mutex<broadcast::Receiver<u64>>,
}

impl Engine {
    pub fn new(metadata: Arc<dyn MetadataCache>, config: EngineConfig) -> Self {
        let capabilities = ConnectionCapabilities::default();
        let components =
            Components::build(capabilities.dialect, &config, &Extensions::default());
        let metadata_events = metadata.subscribe();
        let (published, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (failures, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(EngineInner {
                config,
                metadata,
                components: RwLock::new(Arc::new(components)),
                extensions: RwLock::new(Extensions::default()),
                capabilities: RwLock::new(capabilities),
                buffers: Mutex::new(HashMap::new()),
                next_buffer: AtomicU64::new(1),
                published,
                failures,
                metadata_events: Mutex::new(metadata_events),
            }),
        }
    }

    /// Load the catalogs for the connection's dialect. Calling it again with
    /// the same dialect changes nothing; a new dialect swaps the parser,
    /// catalog and rules for subsequent cycles.
    pub fn prime(&self, capabilities: ConnectionCapabilities) {
        let mut current = self.inner.capabilities.write();
        let dialect = capabilities.dialect;
        if current.dialect == dialect {
            *current = capabilities;
            return;
        }
        *current = capabilities;
        drop(current);
        self.inner.rebuild(dialect);
        for buffer in self.inner.buffers.lock().values() {
            buffer.state.lock().identifiers = None;
        }
        tracing::debug!(%dialect, "engine primed");
    }

    /// Add a lint rule next to the built-in ones. It runs in every later
    /// cycle and survives `prime`.
    pub fn register_rule(&self, rule: Arc<dyn Rule>) {
        tracing::debug!(rule = rule.id(), "lint rule registered");
        self.inner.extensions.write().rules.push(rule);
        self.inner.rebuild(self.dialect());
    }

    /// Add a completion source next to the catalog and schema ones. Its
    /// candidates are filtered and ranked like the built-in ones.
    pub fn register_source(&self, source: Arc<dyn SuggestionSource>) {
        tracing::debug!(source = source.name(), "suggestion source registered");
        self.inner.extensions.write().sources.push(source);
        self.inner.rebuild(self.dialect());
    }

    pub fn dialect(&self) -> SqlDialect {
        self.inner.capabilities.read().dialect
    }

    pub fn capabilities(&self) -> ConnectionCapabilities {
        self.inner.capabilities.read().clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn open_buffer(&self) -> BufferHandle {
        let id = BufferId(self.inner.next_buffer.fetch_add(1, Ordering::SeqCst));
        let buffer = Arc::new(Buffer::new(id, self.inner.config.recent_capacity));
        self.inner.buffers.lock().insert(id, Arc::clone(&buffer));
        tracing::debug!(buffer = %id, "buffer opened");
        BufferHandle {
            engine: Arc::clone(&self.inner),
            buffer,
        }
    }

    pub fn buffer(&self, id: BufferId) -> Result<BufferHandle, IntelError> {
        self.inner.handle(id)
    }

    /// One-shot analysis outside any buffer. Nothing is published.
    pub async fn analyze(&self, text: &str, cursor: usize) -> AnalysisResult {
        let components = self.inner.components();
        let (snapshot, stale) = self.inner.snapshot(0);
        let tables = table_candidates(&snapshot, components.dialect);
        let recent = RecentlyAccepted::new(0);
        let output = run_cycle(
            &components,
            CycleInput {
                text,
                cursor,
                snapshot: &snapshot,
                stale,
                recent: &recent,
                schema_tables: &tables,
            },
            &CancellationToken::new(),
        )
        .await;
        let source = SourceVersion {
            buffer: ONE_SHOT,
            generation: 0,
        };
        self.inner.report_failures(&output.failures);
        assemble(source, output, &snapshot, stale)
    }

    /// One-shot completions
    pub async fn suggest(&self, text: &str, cursor: usize) -> SuggestionList {
        self.analyze(text, cursor).await.suggestions
    }

    /// Lint every statement of `statement`. `PreExecute` adds the rules
    /// that only matter right before running it.
    pub fn lint(&self, statement: &str, mode: LintMode) -> Vec<Diagnostic> {
        let components = self.inner.components();
        let (snapshot, stale) = self.inner.snapshot(0);
        let outcome = components.lint_all(statement, &snapshot, None, stale, mode);
        self.inner.report_failures(&outcome.failures);
        outcome.diagnostics
    }

    /// Results of completed, current cycles
    pub fn subscribe(&self) -> broadcast::Receiver<Published> {
        self.inner.published.subscribe()
    }

    /// Lint rules that failed during analysis
    pub fn rule_failures(&self) -> broadcast::Receiver<RuleFailure> {
        self.inner.failures.subscribe()
    }

    /// Read-only capability for extensions
    pub fn view(&self) -> AnalysisView {
        AnalysisView {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Close every buffer
    pub fn shutdown(&self) {
        let buffers: Vec<_> = self.inner.buffers.lock().drain().map(|(_, b)| b).collect();
        for buffer in buffers {
            buffer.stop();
        }
        tracing::debug!("engine shut down");
    }
}

impl EngineInner {
    fn components(&self) -> Arc<Components> {
        Arc::clone(&self.components.read())
    }

    fn rebuild(&self, dialect: SqlDialect) {
        let components = Components::build(dialect, &self.config, &self.extensions.read());
        *self.components.write() = Arc::new(components);
    }

    fn handle(self: &Arc<Self>, id: BufferId) -> Result<BufferHandle, IntelError> {
        let buffer = self
            .buffers
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| IntelError::UnknownBuffer(id.to_string()))?;
        Ok(BufferHandle {
            engine: Arc::clone(self),
            buffer,
        })
    }

    /// Current snapshot, and whether it is stale: older than the one behind
    /// the displayed result (`last_used`), or past its time to live
    fn snapshot(&self, last_used: u64) -> (Arc<MetadataSnapshot>, bool) {
        let snapshot = self.metadata.current();
        let expired = self.metadata.is_expired(&snapshot)
            || self
                .config
                .metadata_ttl()
                .map(|ttl| snapshot.version > 0 && snapshot.age() > ttl)
                .unwrap_or(false);
        let stale = snapshot.version < last_used || expired;
        (snapshot, stale)
    }

    /// Apply pending metadata version notifications: buffers whose last
    /// result used an older snapshot lose their cached identifiers. Nothing
    /// is re-analyzed.
    fn drain_metadata_events(&self) {
        let newest = {
            let mut events = self.metadata_events.lock();
            let mut newest: Option<u64> = None;
            loop {
                match events.try_recv() {
                    Ok(version) => newest = newest.max(Some(version)),
                    Err(TryRecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "metadata notifications lagged");
                        newest = newest.max(Some(self.metadata.current().version));
                    }
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
            newest
        };
        let Some(version) = newest else {
            return;
        };
        let buffers: Vec<_> = self.buffers.lock().values().cloned().collect();
        for buffer in buffers {
            let mut state = buffer.state.lock();
            if state.last_snapshot_version() < version && state.identifiers.take().is_some() {
                tracing::debug!(buffer = %buffer.id, version, "identifier cache invalidated");
            }
        }
    }

    /// Debounce timer fired for `generation`
    async fn fire(&self, buffer: &Arc<Buffer>, generation: u64) {
        let token = {
            let mut state = buffer.state.lock();
            if state.closed || state.generation != generation {
                return;
            }
            // Detach our own handle so later edits cancel us cooperatively
            state.timer = None;
            let token = CancellationToken::new();
            state.running = Some(token.clone());
            state.phase = BufferPhase::Running;
            token
        };
        self.run(buffer, generation, &token).await;
    }

    /// Run one cycle over the buffer's current text and publish it if it is
    /// still the latest request when done
    async fn run(
        &self,
        buffer: &Buffer,
        generation: u64,
        token: &CancellationToken,
    ) -> Arc<AnalysisResult> {
        self.drain_metadata_events();
        let components = self.components();
        let (text, cursor, recent, last_used, cached) = {
            let state = buffer.state.lock();
            (
                state.text.clone(),
                state.cursor,
                state.recent.clone(),
                state.last_snapshot_version(),
                state.identifiers.clone(),
            )
        };
        let (snapshot, stale) = self.snapshot(last_used);
        let identifiers = match cached {
            Some(cache)
                if cache.snapshot_version == snapshot.version
                    && cache.dialect == components.dialect =>
            {
                cache
            }
            _ => IdentifierCache {
                snapshot_version: snapshot.version,
                dialect: components.dialect,
                tables: Arc::new(table_candidates(&snapshot, components.dialect)),
            },
        };

        tracing::debug!(buffer = %buffer.id, generation, "analysis started");
        let output = run_cycle(
            &components,
            CycleInput {
                text: &text,
                cursor,
                snapshot: &snapshot,
                stale,
                recent: &recent,
                schema_tables: &identifiers.tables,
            },
            token,
        )
        .await;
        self.report_failures(&output.failures);

        let source = SourceVersion {
            buffer: buffer.id,
            generation,
        };
        self.finish(buffer, assemble(source, output, &snapshot, stale), identifiers)
    }

    fn finish(
        &self,
        buffer: &Buffer,
        mut result: AnalysisResult,
        identifiers: IdentifierCache,
    ) -> Arc<AnalysisResult> {
        let mut state = buffer.state.lock();
        let current = !state.closed
            && !result.superseded
            && state.generation == result.source_version.generation;
        if !current {
            result.superseded = true;
            tracing::debug!(source = %result.source_version, "superseded result dropped");
            return Arc::new(result);
        }
        state.running = None;
        state.phase = BufferPhase::Idle;
        state.identifiers = Some(identifiers);
        let result = Arc::new(result);
        state.latest = Some(Arc::clone(&result));
        // Sent under the buffer lock so deliveries keep generation order
        let _ = self.published.send(Published {
            source_version: result.source_version,
            result: Arc::clone(&result),
        });
        tracing::debug!(source = %result.source_version, "analysis published");
        result
    }

    fn report_failures(&self, failures: &[RuleFailure]) {
        for failure in failures {
            let _ = self.failures.send(failure.clone());
        }
    }
}

fn assemble(
    source_version: SourceVersion,
    output: CycleOutput,
    snapshot: &MetadataSnapshot,
    stale: bool,
) -> AnalysisResult {
    AnalysisResult {
        source_version,
        statement_tree: output.tree,
        clause_context: output.context,
        suggestions: output.suggestions,
        diagnostics: output.diagnostics,
        rule_failures: output.failures,
        snapshot_version: snapshot.version,
        stale_metadata: stale,
        superseded: output.cancelled,
    }
}

/// Read-only access for extensions: the latest result per buffer, the
/// publication stream, and on-demand re-analysis. Extensions cannot edit
/// buffers or touch metadata through it.
#[derive(Clone)]
pub struct AnalysisView {
    inner: Arc<EngineInner>,
}

impl AnalysisView {
    pub fn latest(&self, buffer: BufferId) -> Option<Arc<AnalysisResult>> {
        self.inner
            .buffers
            .lock()
            .get(&buffer)
            .and_then(|b| b.state.lock().latest.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Published> {
        self.inner.published.subscribe()
    }

    /// Re-analyze the buffer's current text right away
    pub async fn request_reparse(&self, buffer: BufferId) -> Result<Arc<AnalysisResult>, IntelError> {
        let handle = self.inner.handle(buffer)?;
        Ok(handle.reanalyze().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SharedMetadataCache;

    fn engine() -> Engine {
        Engine::new(Arc::new(SharedMetadataCache::new()), EngineConfig::default())
    }

    #[test]
    fn test_prime_is_idempotent() {
        let engine = engine();
        let before = engine.inner.components();
        engine.prime(ConnectionCapabilities::new(SqlDialect::PostgreSQL));
        assert!(Arc::ptr_eq(&before, &engine.inner.components()));
        engine.prime(ConnectionCapabilities::new(SqlDialect::MySQL));
        assert_eq!(engine.dialect(), SqlDialect::MySQL);
        assert!(!Arc::ptr_eq(&before, &engine.inner.components()));
    }

    #[test]
    fn test_unknown_buffer() {
        let engine = engine();
        let handle = engine.open_buffer();
        handle.close();
        assert!(matches!(
            engine.buffer(handle.id()),
            Err(IntelError::UnknownBuffer(_))
        ));
    }

    #[tokio::test]
    async fn test_one_shot_analysis_is_not_published() {
        let engine = engine();
        let mut rx = engine.subscribe();
        let result = engine.analyze("SELECT 1", 8).await;
        assert_eq!(result.source_version.buffer, ONE_SHOT);
        assert!(rx.try_recv().is_err());
    }
}
