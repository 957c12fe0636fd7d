//! Provider boundary.

use crate::GenerationRequest;
use async_trait::async_trait;
use reverb_core::Credential;
use reverb_error::GenerationError;

/// Turns a prompt (plus optional media) into text.
///
/// Implementations make exactly one provider call per invocation. Retrying,
/// throttling and bookkeeping belong to [`GuardedGenerator`](crate::GuardedGenerator).
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Generates text for `request` with `model`, authenticating as `credential`.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] whose kind distinguishes quota
    /// exhaustion from refusals and malformed input.
    async fn generate(
        &self,
        credential: &Credential,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError>;
}
