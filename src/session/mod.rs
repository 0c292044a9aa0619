/*!
 * Batch translation session engine.
 *
 * This module composes the splitter, formatter, parser, validator and
 * context manager into an end-to-end run over a full subtitle track:
 * - `models`: attempt and result types shared by the orchestrator
 * - `orchestrator`: the session driver and per-batch retry controller
 */

pub mod models;
pub mod orchestrator;

pub use models::{Attempt, AttemptOutcome, BatchReport, BatchStatus, LineResult, SessionResult};
pub use orchestrator::{AbortHandle, TranslationSession};
