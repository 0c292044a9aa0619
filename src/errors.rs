/*!
 * Error types for the linewise engine.
 *
 * This module contains custom error types for the translation protocol,
 * using the thiserror crate for ergonomic error definitions.
 *
 * The taxonomy mirrors the protocol layers: provider errors come from the
 * transport boundary, parse errors from reading the raw response, alignment
 * errors from the line-parity contract, and session errors from the
 * per-batch attempt budget.
 */

use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that can occur when talking to an LLM provider
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response body fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete within the attempt timeout
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors intrinsic to parsing a raw model response
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// No numbered line markers were recognized anywhere in the response
    #[error("no translation markers found in response")]
    MalformedResponse,
}

/// Line-alignment contract violations for a single batch attempt.
///
/// Each variant carries the set of offending line indices so the retry
/// prompt and the logs can name them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    /// Batch lines with no corresponding translation
    #[error("missing translations for lines {}", format_indices(.0))]
    MissingIndices(BTreeSet<usize>),

    /// Translations referencing indices that are not in the batch
    #[error("translations for unknown lines {}", format_indices(.0))]
    ExtraIndices(BTreeSet<usize>),

    /// More than one translation for the same line
    #[error("duplicate translations for lines {}", format_indices(.0))]
    DuplicateIndices(BTreeSet<usize>),

    /// Empty or whitespace-only translations for non-empty originals
    #[error("empty translations for lines {}", format_indices(.0))]
    EmptyTranslations(BTreeSet<usize>),
}

impl AlignmentError {
    /// The offending line indices, whichever variant this is
    pub fn indices(&self) -> &BTreeSet<usize> {
        match self {
            Self::MissingIndices(set)
            | Self::ExtraIndices(set)
            | Self::DuplicateIndices(set)
            | Self::EmptyTranslations(set) => set,
        }
    }
}

fn format_indices(set: &BTreeSet<usize>) -> String {
    let items: Vec<String> = set.iter().map(|i| i.to_string()).collect();
    items.join(", ")
}

/// Why a single attempt was rejected.
///
/// All variants are recoverable by re-asking, so the retry controller
/// treats them identically: each consumes one attempt from the budget.
#[derive(Error, Debug, Clone)]
pub enum AttemptError {
    /// The provider call failed or timed out
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The response could not be parsed at all
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The response parsed but failed the alignment contract
    #[error("alignment error: {0}")]
    Alignment(#[from] AlignmentError),
}

/// Terminal errors surfaced by the session orchestrator
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// A batch consumed its whole attempt budget without acceptance
    #[error("batch {ordinal} exhausted after {attempts} attempts: {last_error}")]
    BatchExhausted {
        /// Ordinal of the failed batch
        ordinal: usize,
        /// Number of attempts made
        attempts: u32,
        /// The error from the final attempt
        last_error: AttemptError,
    },

    /// The session stopped early because a batch failed under the
    /// abort-on-failure policy
    #[error("session aborted at batch {ordinal}: {cause}")]
    Aborted {
        /// Ordinal of the batch that triggered the abort
        ordinal: usize,
        /// The exhaustion that triggered the abort
        cause: AttemptError,
        /// Whatever the session had accumulated before stopping
        partial: Box<crate::session::SessionResult>,
    },
}
