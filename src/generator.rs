//! Text generation collaborator: instructions in, raw text out.

use async_trait::async_trait;

use crate::error::GenerationError;

#[async_trait]
pub trait TextGenerator: Send + Sync {
  /// Single blocking completion; returns the full response text unparsed.
  async fn generate(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<String, GenerationError>;
}
