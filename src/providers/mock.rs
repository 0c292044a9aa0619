/*!
 * Mock provider implementations for testing.
 *
 * The mock understands the engine's own prompt format: it reads the
 * numbered markers out of the prompt and fabricates responses around
 * them, so tests can exercise the whole protocol loop without a model.
 *
 * - `MockProvider::echo()` - well-formed translation for every line
 * - `MockProvider::missing_last()` - drops the last line's translation
 * - `MockProvider::merging()` - merges the first two lines under one marker
 * - `MockProvider::failing()` - always fails with a transport error
 * - `MockProvider::empty()` - returns prose with no markers at all
 * - `MockProvider::slow(ms)` - delays, for timeout testing
 * - `MockProvider::scripted(responses)` - plays back canned outcomes
 */

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

use crate::errors::ProviderError;
use crate::providers::Provider;

static PROMPT_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^#(\d+)\nOriginal>\n([\s\S]*?)\nTranslation>$")
        .expect("prompt line regex is valid")
});

/// Behavior mode for the mock provider
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Translate every requested line with a marked-up echo
    Echo,
    /// Translate all lines except the last one
    MissingLast,
    /// Merge the first two lines into one translation entry
    Merging,
    /// Always fail with a transport error
    Failing,
    /// Return text with no recognizable markers
    Empty,
    /// Sleep before answering, to trip the attempt timeout
    Slow {
        /// Delay before responding
        delay_ms: u64,
    },
    /// Play back canned outcomes, one per call, repeating the last
    Scripted,
}

/// One canned outcome for the scripted mock
pub type ScriptedOutcome = Result<String, ProviderError>;

/// Mock provider for driving the session engine in tests
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    /// Number of generate calls made, shared across clones
    call_count: Arc<AtomicUsize>,
    /// Outcomes for scripted mode
    script: Arc<Mutex<VecDeque<ScriptedOutcome>>>,
    /// Whether echo responses carry summary/scene tags
    with_tags: bool,
}

impl MockProvider {
    /// Create a mock with the given behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
            script: Arc::new(Mutex::new(VecDeque::new())),
            with_tags: false,
        }
    }

    /// Well-formed translations for every requested line
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Omits the translation for the last requested line
    pub fn missing_last() -> Self {
        Self::new(MockBehavior::MissingLast)
    }

    /// Merges the first two requested lines under the first marker
    pub fn merging() -> Self {
        Self::new(MockBehavior::Merging)
    }

    /// Always fails with a transport error
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Returns prose without any markers
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Sleeps for `delay_ms` before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Plays back the given outcomes in order, repeating the last forever
    pub fn scripted(outcomes: Vec<ScriptedOutcome>) -> Self {
        let mock = Self::new(MockBehavior::Scripted);
        *mock.script.lock() = outcomes.into();
        mock
    }

    /// Make echo responses include summary and scene tags
    pub fn with_context_tags(mut self) -> Self {
        self.with_tags = true;
        self
    }

    /// Number of generate calls made so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Extract the requested (index, original text) pairs from a prompt
    pub fn requested_lines(prompt: &str) -> Vec<(usize, String)> {
        PROMPT_LINE_REGEX
            .captures_iter(prompt)
            .filter_map(|caps| {
                let index: usize = caps.get(1)?.as_str().parse().ok()?;
                Some((index, caps.get(2)?.as_str().to_string()))
            })
            .collect()
    }

    /// Build a well-formed response for the given lines
    pub fn render_response(lines: &[(usize, String)], with_tags: bool) -> String {
        let mut response = String::new();
        for (index, text) in lines {
            response.push_str(&format!("#{}\nTranslation>\n[translated] {}\n\n", index, text));
        }
        if with_tags {
            response.push_str("<summary>Mock synopsis of the batch.</summary>\n");
            response.push_str("<scene>Mock scene description.</scene>\n");
        }
        response
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let lines = Self::requested_lines(prompt);

        match &self.behavior {
            MockBehavior::Echo => Ok(Self::render_response(&lines, self.with_tags)),

            MockBehavior::MissingLast => {
                let kept = &lines[..lines.len().saturating_sub(1)];
                Ok(Self::render_response(kept, self.with_tags))
            }

            MockBehavior::Merging => {
                if lines.len() < 2 {
                    return Ok(Self::render_response(&lines, self.with_tags));
                }
                let merged_text = format!("{} {}", lines[0].1, lines[1].1);
                let mut merged = vec![(lines[0].0, merged_text)];
                merged.extend_from_slice(&lines[2..]);
                Ok(Self::render_response(&merged, self.with_tags))
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated provider failure".to_string(),
            }),

            MockBehavior::Empty => Ok("I'm sorry, I cannot help with that.".to_string()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                Ok(Self::render_response(&lines, self.with_tags))
            }

            MockBehavior::Scripted => {
                let mut script = self.script.lock();
                if script.len() > 1 {
                    script.pop_front().unwrap_or(Err(ProviderError::RequestFailed(
                        "script exhausted".to_string(),
                    )))
                } else {
                    script
                        .front()
                        .cloned()
                        .unwrap_or(Err(ProviderError::RequestFailed("script exhausted".to_string())))
                }
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError(
                "Simulated connection failure".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
