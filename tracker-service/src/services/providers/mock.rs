//! Mock provider for testing.

use super::{ProviderError, TextProvider};
use async_trait::async_trait;

/// Mock text provider returning a scripted reply, or failing on demand.
pub struct MockTextProvider {
    reply: Option<String>,
}

impl MockTextProvider {
    /// Provider that answers every prompt with the given text.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }

    /// Provider whose every call fails.
    pub fn failing() -> Self {
        Self { reply: None }
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(ProviderError::NotConfigured(
                "Mock text provider has no scripted reply".to_string(),
            )),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match self.reply {
            Some(_) => Ok(()),
            None => Err(ProviderError::NotConfigured(
                "Mock text provider has no scripted reply".to_string(),
            )),
        }
    }
}
