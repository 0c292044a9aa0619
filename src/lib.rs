/*!
 * # linewise - line-aligned batch subtitle translation
 *
 * A Rust library for driving an LLM provider through subtitle translation
 * in batches, with strict line alignment between originals and
 * translations.
 *
 * ## Features
 *
 * - Split subtitle tracks into bounded, ordered batches
 * - Deterministic numbered-marker prompts the model fills in
 * - Forgiving response parsing with strict alignment validation
 * - Bounded per-batch retries with escalated instructions
 * - Rolling synopsis and scene context threaded between batches
 * - Sequential or pooled-snapshot scheduling
 * - Skip or abort-session policies for exhausted batches
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `subtitle`: Line model and SRT-shaped I/O
 * - `batching`: Batch splitting
 * - `prompts`: Prompt formatting and glossaries
 * - `response`: Raw response parsing
 * - `alignment`: Line-parity validation
 * - `context`: Rolling narrative context
 * - `session`: The orchestrator and retry controller
 * - `providers`: LLM provider clients:
 *   - `providers::openai`: OpenAI-compatible API client
 *   - `providers::mock`: Mock providers for tests
 * - `app_config`: Configuration management
 * - `errors`: Custom error types for the engine
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod alignment;
pub mod app_config;
pub mod batching;
pub mod context;
pub mod errors;
pub mod prompts;
pub mod providers;
pub mod response;
pub mod session;
pub mod subtitle;

// Re-export main types for easier usage
pub use app_config::{Config, ConcurrencyMode, EngineConfig, FailurePolicy};
pub use batching::{Batch, BatchSplitter};
pub use context::{ContextManager, SceneContext};
pub use errors::{AlignmentError, AttemptError, ParseError, ProviderError, SessionError};
pub use prompts::{Glossary, PromptFormatter};
pub use session::{AbortHandle, BatchReport, BatchStatus, SessionResult, TranslationSession};
pub use subtitle::{SubtitleLine, SubtitleTrack};
