/*!
 * Session orchestrator and per-batch retry controller.
 *
 * Drives the splitter, formatter, provider, parser and validator over a
 * full subtitle track. The default scheduling is sequential because each
 * batch's prompt depends on the context produced by the previous accepted
 * batch; the pooled mode is an explicit opt-in that runs batches against a
 * context snapshot instead.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use crate::alignment::validate_alignment;
use crate::app_config::{ConcurrencyMode, EngineConfig, FailurePolicy};
use crate::batching::{Batch, split_into_batches};
use crate::context::{ContextManager, SceneContext};
use crate::errors::{AttemptError, ProviderError, SessionError};
use crate::prompts::PromptFormatter;
use crate::providers::Provider;
use crate::response::parse_response;
use crate::subtitle::SubtitleTrack;

use super::models::{Attempt, AttemptOutcome, BatchReport, BatchStatus, LineResult, SessionResult};

/// Cancellation handle for an in-progress session.
///
/// Aborting is safe at any time: the session stops at the next batch
/// boundary (or after the in-flight provider call returns) and never
/// updates the rolling context for work it abandons.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Request cancellation
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How one batch's resolution ended
enum BatchResolution {
    Accepted {
        translations: Vec<(usize, String)>,
        summary: String,
        scene: String,
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
        last_error: AttemptError,
    },
    Cancelled,
}

/// The session engine: one instance drives one or more `translate` calls.
///
/// The engine is stateless between calls; anything to carry over (an
/// initial [`SceneContext`] from a prior session, for example) is passed
/// in explicitly.
pub struct TranslationSession {
    provider: Arc<dyn Provider>,
    formatter: PromptFormatter,
    config: EngineConfig,
    abort: AbortHandle,
}

impl TranslationSession {
    /// Create a session engine over the given provider
    pub fn new(provider: Arc<dyn Provider>, formatter: PromptFormatter, config: EngineConfig) -> Self {
        Self {
            provider,
            formatter,
            config,
            abort: AbortHandle::default(),
        }
    }

    /// Handle for cancelling this session from another task
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Translate a whole track.
    ///
    /// Returns the complete [`SessionResult`] with failed batch ordinals
    /// annotated. Only under [`FailurePolicy::AbortSession`] does an error
    /// escape, and it carries the partial result accumulated so far.
    pub async fn translate(
        &self,
        track: &SubtitleTrack,
        initial_context: SceneContext,
        progress: impl Fn(usize, usize) + Clone + Send + Sync + 'static,
    ) -> Result<SessionResult, SessionError> {
        let batches = split_into_batches(&track.lines, self.config.max_batch_size);
        info!(
            "Translating {} lines in {} batches",
            track.len(),
            batches.len()
        );

        match self.config.concurrency {
            ConcurrencyMode::Sequential => {
                self.translate_sequential(track, batches, initial_context, progress).await
            }
            ConcurrencyMode::PooledSnapshot { pool_size } => {
                self.translate_pooled(track, batches, initial_context, pool_size, progress).await
            }
        }
    }

    async fn translate_sequential(
        &self,
        track: &SubtitleTrack,
        batches: Vec<Batch>,
        initial_context: SceneContext,
        progress: impl Fn(usize, usize) + Clone + Send + Sync + 'static,
    ) -> Result<SessionResult, SessionError> {
        let total = batches.len();
        let mut context = initial_context;
        let mut reports: Vec<BatchReport> = Vec::with_capacity(total);
        let mut translations: HashMap<usize, String> = HashMap::new();
        let mut aborted = false;

        let mut pending = batches.into_iter();
        while let Some(batch) = pending.next() {
            if self.abort.is_aborted() {
                reports.push(not_attempted_report(&batch));
                reports.extend(pending.map(|b| not_attempted_report(&b)));
                aborted = true;
                break;
            }

            let resolution = self.resolve_batch(&batch, &context).await;
            match resolution {
                BatchResolution::Accepted { translations: batch_translations, summary, scene, attempts } => {
                    // Context moves forward only on acceptance
                    context = ContextManager::update(&context, &summary, &scene);
                    translations.extend(batch_translations);
                    reports.push(BatchReport {
                        ordinal: batch.ordinal,
                        line_indices: batch.indices(),
                        status: BatchStatus::Accepted { attempts },
                    });
                }
                BatchResolution::Exhausted { attempts, last_error } => {
                    warn!(
                        "Batch {} exhausted after {} attempts: {}",
                        batch.ordinal, attempts, last_error
                    );
                    reports.push(BatchReport {
                        ordinal: batch.ordinal,
                        line_indices: batch.indices(),
                        status: BatchStatus::Exhausted {
                            attempts,
                            last_error: last_error.clone(),
                        },
                    });

                    if self.config.on_batch_failure == FailurePolicy::AbortSession {
                        let ordinal = batch.ordinal;
                        reports.extend(pending.map(|b| not_attempted_report(&b)));
                        let partial = assemble_result(track, reports, translations, context, true);
                        return Err(SessionError::Aborted {
                            ordinal,
                            cause: last_error,
                            partial: Box::new(partial),
                        });
                    }
                }
                BatchResolution::Cancelled => {
                    reports.push(not_attempted_report(&batch));
                    reports.extend(pending.map(|b| not_attempted_report(&b)));
                    aborted = true;
                    break;
                }
            }

            progress(reports.len(), total);
        }

        Ok(assemble_result(track, reports, translations, context, aborted))
    }

    /// Pooled mode: all batches see the same context snapshot. Tag updates
    /// from accepted batches are folded back in ordinal order afterwards,
    /// so the final context is still deterministic.
    async fn translate_pooled(
        &self,
        track: &SubtitleTrack,
        batches: Vec<Batch>,
        initial_context: SceneContext,
        pool_size: usize,
        progress: impl Fn(usize, usize) + Clone + Send + Sync + 'static,
    ) -> Result<SessionResult, SessionError> {
        let total = batches.len();
        let snapshot = initial_context.clone();
        let done = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        // Run-scoped halt for the abort policy. Kept separate from the
        // user-facing handle so one failed run does not poison the next
        // translate call on the same session.
        let halted = Arc::new(AtomicBool::new(false));

        let mut outcomes: Vec<(Batch, BatchResolution)> = stream::iter(batches)
            .map(|batch| {
                let snapshot = snapshot.clone();
                let done = done.clone();
                let progress = progress.clone();
                let halted = halted.clone();
                async move {
                    let resolution = if self.abort.is_aborted() || halted.load(Ordering::SeqCst) {
                        BatchResolution::Cancelled
                    } else {
                        let resolution = self.resolve_batch(&batch, &snapshot).await;
                        // Under the abort policy an exhausted batch cancels
                        // everything not yet dispatched; in-flight batches run
                        // to completion
                        if self.config.on_batch_failure == FailurePolicy::AbortSession
                            && matches!(resolution, BatchResolution::Exhausted { .. })
                        {
                            halted.store(true, Ordering::SeqCst);
                        }
                        resolution
                    };
                    let current = done.fetch_add(1, Ordering::SeqCst) + 1;
                    progress(current, total);
                    (batch, resolution)
                }
            })
            .buffer_unordered(pool_size.max(1))
            .collect()
            .await;

        // One slot per ordinal, assembled in order at the end
        outcomes.sort_by_key(|(batch, _)| batch.ordinal);

        let mut context = initial_context;
        let mut reports: Vec<BatchReport> = Vec::with_capacity(total);
        let mut translations: HashMap<usize, String> = HashMap::new();
        let mut aborted = false;
        let mut abort_trigger: Option<(usize, AttemptError)> = None;

        for (batch, resolution) in outcomes {
            match resolution {
                BatchResolution::Accepted { translations: batch_translations, summary, scene, attempts } => {
                    context = ContextManager::update(&context, &summary, &scene);
                    translations.extend(batch_translations);
                    reports.push(BatchReport {
                        ordinal: batch.ordinal,
                        line_indices: batch.indices(),
                        status: BatchStatus::Accepted { attempts },
                    });
                }
                BatchResolution::Exhausted { attempts, last_error } => {
                    warn!(
                        "Batch {} exhausted after {} attempts: {}",
                        batch.ordinal, attempts, last_error
                    );
                    if self.config.on_batch_failure == FailurePolicy::AbortSession
                        && abort_trigger.is_none()
                    {
                        abort_trigger = Some((batch.ordinal, last_error.clone()));
                    }
                    reports.push(BatchReport {
                        ordinal: batch.ordinal,
                        line_indices: batch.indices(),
                        status: BatchStatus::Exhausted { attempts, last_error },
                    });
                }
                BatchResolution::Cancelled => {
                    aborted = true;
                    reports.push(not_attempted_report(&batch));
                }
            }
        }

        if let Some((ordinal, cause)) = abort_trigger {
            let partial = assemble_result(track, reports, translations, context, true);
            return Err(SessionError::Aborted {
                ordinal,
                cause,
                partial: Box::new(partial),
            });
        }

        Ok(assemble_result(track, reports, translations, context, aborted))
    }

    /// The retry controller: drive one batch to a terminal outcome.
    ///
    /// Per-batch state machine: Pending -> Sent -> Accepted | Rejected,
    /// looping back to Pending with the escalation flag set until the
    /// attempt budget runs out. The same batch is always re-sent whole;
    /// splitting it further is the caller's decision.
    async fn resolve_batch(&self, batch: &Batch, context: &SceneContext) -> BatchResolution {
        let max_attempts = self.config.max_attempts_per_batch;
        let mut last_error: Option<AttemptError> = None;

        for attempt_number in 1..=max_attempts {
            if self.abort.is_aborted() {
                return BatchResolution::Cancelled;
            }

            let escalated = attempt_number > 1;
            let prompt = self.formatter.format_batch(batch, context, escalated);
            let mut attempt = Attempt::new(attempt_number, prompt);
            debug!(
                "Batch {} attempt {}/{} ({} lines{})",
                batch.ordinal,
                attempt_number,
                max_attempts,
                batch.len(),
                if escalated { ", escalated" } else { "" }
            );

            match self.run_attempt(batch, &mut attempt).await {
                Ok((translations, summary, scene)) => {
                    attempt.outcome = AttemptOutcome::Accepted;
                    info!(
                        "Batch {} accepted on attempt {} ({} lines)",
                        batch.ordinal,
                        attempt_number,
                        translations.len()
                    );
                    return BatchResolution::Accepted {
                        translations,
                        summary,
                        scene,
                        attempts: attempt_number,
                    };
                }
                Err(error) => {
                    warn!(
                        "Batch {} attempt {} rejected: {}",
                        batch.ordinal, attempt_number, error
                    );
                    attempt.outcome = AttemptOutcome::Rejected(error.clone());
                    last_error = Some(error);
                }
            }

            // An abort that arrived while the provider call was in flight
            // abandons the batch without consuming the remaining budget
            if self.abort.is_aborted() {
                return BatchResolution::Cancelled;
            }
        }

        BatchResolution::Exhausted {
            attempts: max_attempts,
            last_error: last_error
                .unwrap_or_else(|| ProviderError::RequestFailed("no attempts made".to_string()).into()),
        }
    }

    /// One request/response cycle: call the provider under the attempt
    /// timeout, parse the raw text, validate alignment.
    async fn run_attempt(
        &self,
        batch: &Batch,
        attempt: &mut Attempt,
    ) -> Result<(Vec<(usize, String)>, String, String), AttemptError> {
        let timeout = Duration::from_secs(self.config.attempt_timeout_secs);

        let raw = match tokio::time::timeout(timeout, self.provider.generate(&attempt.prompt)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(provider_error)) => return Err(provider_error.into()),
            Err(_) => return Err(ProviderError::Timeout(self.config.attempt_timeout_secs).into()),
        };
        attempt.raw_response = Some(raw.clone());

        let parsed = parse_response(&raw)?;
        validate_alignment(batch, &parsed.entries)?;

        let translations = parsed
            .entries
            .into_iter()
            .map(|entry| (entry.index, entry.text))
            .collect();
        Ok((translations, parsed.summary, parsed.scene))
    }
}

fn not_attempted_report(batch: &Batch) -> BatchReport {
    BatchReport {
        ordinal: batch.ordinal,
        line_indices: batch.indices(),
        status: BatchStatus::NotAttempted,
    }
}

/// Pair every input line, in source order, with its translation if the
/// owning batch was accepted.
fn assemble_result(
    track: &SubtitleTrack,
    reports: Vec<BatchReport>,
    mut translations: HashMap<usize, String>,
    context: SceneContext,
    aborted: bool,
) -> SessionResult {
    let lines = track
        .lines
        .iter()
        .map(|line| LineResult {
            line: line.clone(),
            translation: translations.remove(&line.index),
        })
        .collect();

    SessionResult {
        lines,
        batches: reports,
        context,
        aborted,
    }
}
