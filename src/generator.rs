//! Context-grounded answer generation.

use crate::error::Result;
use crate::llm::{GenerationService, Prompts};
use std::sync::Arc;

/// Renders the answer prompt and invokes the generation service. The
/// service is a black box; only the prompt/answer contract matters here.
#[derive(Clone)]
pub struct AnswerGenerator {
    service: Arc<dyn GenerationService>,
}

impl AnswerGenerator {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }

    /// Generate an answer grounded in the retrieved context. The system
    /// instruction requires the literal fallback phrase when the context
    /// does not contain the answer.
    pub async fn generate(&self, context: &str, question: &str) -> Result<String> {
        let user = Prompts::answer_user(context, question);
        let answer = self
            .service
            .complete(Some(Prompts::answer_system()), &user)
            .await?;
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use async_trait::async_trait;

    /// Echoes the rendered prompt back so tests can assert on it.
    struct EchoService;

    #[async_trait]
    impl GenerationService for EchoService {
        async fn complete(&self, system: Option<&str>, user: &str) -> Result<String> {
            Ok(format!("{}|{}", system.unwrap_or(""), user))
        }

        async fn complete_capped(
            &self,
            system: Option<&str>,
            user: &str,
            _max_tokens: u32,
        ) -> Result<String> {
            self.complete(system, user).await
        }
    }

    struct FailingService;

    #[async_trait]
    impl GenerationService for FailingService {
        async fn complete(&self, _system: Option<&str>, _user: &str) -> Result<String> {
            Err(RagError::Generation("model unavailable".to_string()))
        }

        async fn complete_capped(
            &self,
            _system: Option<&str>,
            _user: &str,
            _max_tokens: u32,
        ) -> Result<String> {
            Err(RagError::Generation("model unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_generate_renders_context_and_question() {
        let generator = AnswerGenerator::new(Arc::new(EchoService));
        let answer = generator
            .generate("protocol text", "when is it stopped?")
            .await
            .unwrap();

        assert!(answer.contains("Context: protocol text"));
        assert!(answer.contains("Question: when is it stopped?"));
        assert!(answer.contains("clinical assistant"));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let generator = AnswerGenerator::new(Arc::new(FailingService));
        let err = generator.generate("ctx", "q").await.unwrap_err();
        assert!(matches!(err, RagError::Generation(_)));
    }
}
