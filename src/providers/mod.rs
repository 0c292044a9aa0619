/*!
 * Provider implementations for external text-generation services.
 *
 * The engine treats a provider as an opaque capability: prompt text in,
 * raw response text out. Transport, authentication and model selection
 * live entirely behind this trait; the per-attempt timeout is enforced by
 * the session orchestrator, not by implementations.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all text-generation providers.
///
/// Implementations must be cheap to share across tasks; the pooled
/// session mode calls `generate` concurrently from several workers.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Generate a completion for the given prompt
    ///
    /// # Arguments
    /// * `prompt` - The full request payload rendered by the formatter
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The raw response text or a transport error
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the provider is reachable
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

pub mod mock;
pub mod openai;
