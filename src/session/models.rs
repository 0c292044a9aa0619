/*!
 * Attempt and result models for translation sessions.
 *
 * An `Attempt` is one request/response cycle for a batch; it lives only
 * for the duration of that batch's resolution. The `SessionResult` is the
 * durable output: every input line in order, each batch's terminal status,
 * and the final rolling context.
 */

use std::collections::BTreeSet;

use crate::context::SceneContext;
use crate::errors::{AttemptError, SessionError};
use crate::subtitle::SubtitleLine;

/// State of a single attempt
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// Created but not yet sent
    Pending,
    /// The response passed parsing and alignment
    Accepted,
    /// The attempt failed; the reason consumed one unit of budget
    Rejected(AttemptError),
}

/// One request/response cycle for a batch
#[derive(Debug, Clone)]
pub struct Attempt {
    /// 1-based attempt counter within the batch
    pub attempt_number: u32,

    /// The exact prompt text sent
    pub prompt: String,

    /// The raw response, if the provider answered at all
    pub raw_response: Option<String>,

    /// Terminal state of this attempt
    pub outcome: AttemptOutcome,
}

impl Attempt {
    /// Create a pending attempt for the given prompt
    pub fn new(attempt_number: u32, prompt: String) -> Self {
        Self {
            attempt_number,
            prompt,
            raw_response: None,
            outcome: AttemptOutcome::Pending,
        }
    }
}

/// Terminal status of one batch within a session
#[derive(Debug, Clone)]
pub enum BatchStatus {
    /// The batch was translated and validated
    Accepted {
        /// How many attempts it took
        attempts: u32,
    },
    /// All attempts were consumed without acceptance
    Exhausted {
        /// How many attempts were made
        attempts: u32,
        /// The error from the final attempt
        last_error: AttemptError,
    },
    /// The session stopped before this batch was dispatched
    NotAttempted,
}

/// Per-batch record in the session result
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Ordinal of the batch within the session
    pub ordinal: usize,

    /// Line indices the batch covered
    pub line_indices: Vec<usize>,

    /// Terminal status
    pub status: BatchStatus,
}

impl BatchReport {
    /// Whether the batch ended accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self.status, BatchStatus::Accepted { .. })
    }

    /// The exhaustion as a typed error, if this batch failed.
    ///
    /// Under the skip policy exhausted batches never escape `translate` as
    /// errors; callers that want one per failed batch build it from here.
    pub fn to_error(&self) -> Option<SessionError> {
        match &self.status {
            BatchStatus::Exhausted { attempts, last_error } => {
                Some(SessionError::BatchExhausted {
                    ordinal: self.ordinal,
                    attempts: *attempts,
                    last_error: last_error.clone(),
                })
            }
            _ => None,
        }
    }
}

/// One input line paired with its translation, if any
#[derive(Debug, Clone)]
pub struct LineResult {
    /// The original line
    pub line: SubtitleLine,

    /// The accepted translation, or None when the owning batch failed
    pub translation: Option<String>,
}

/// Complete output of one `translate` call
#[derive(Debug, Clone, Default)]
pub struct SessionResult {
    /// Every input line in source order
    pub lines: Vec<LineResult>,

    /// Terminal status of every batch, in ordinal order
    pub batches: Vec<BatchReport>,

    /// The rolling context after the last accepted batch
    pub context: SceneContext,

    /// Whether the session was cancelled before completing
    pub aborted: bool,
}

impl SessionResult {
    /// Ordinals of batches that exhausted their attempt budget
    pub fn failed_ordinals(&self) -> BTreeSet<usize> {
        self.batches
            .iter()
            .filter(|report| matches!(report.status, BatchStatus::Exhausted { .. }))
            .map(|report| report.ordinal)
            .collect()
    }

    /// Number of lines that received a translation
    pub fn translated_count(&self) -> usize {
        self.lines.iter().filter(|line| line.translation.is_some()).count()
    }

    /// Whether every batch was accepted
    pub fn is_complete(&self) -> bool {
        !self.aborted && self.batches.iter().all(BatchReport::is_accepted)
    }
}
