use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Build the grounded prompt sent to the generator.
///
/// Without context lines the question is sent as is.
#[must_use]
pub fn build_prompt(question: &str, context: &[String]) -> String {
    if context.is_empty() {
        return question.to_owned();
    }
    format!(
        "Context:\n{}\n\nQuestion: {question}\n\nAnswer based on the context provided above. \
         If the context doesn't contain enough information, say so.",
        context.join("\n")
    )
}

/// Text generation capability.
pub trait LlmProvider: Send + Sync {
    /// Send messages to the LLM and return the assistant response.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat(&self, messages: &[Message]) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Answer `question` grounded on `context`, one line per retrieved chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying chat request fails.
    fn generate(
        &self,
        question: &str,
        context: &[String],
    ) -> impl Future<Output = Result<String, LlmError>> + Send {
        let messages = [Message::user(build_prompt(question, context))];
        async move { self.chat(&messages).await }
    }

    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

/// Text embedding capability with a fixed output width.
pub trait Embedder: Send + Sync {
    /// Width of every vector this embedder produces.
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    /// Embed a batch of texts in a single call, preserving input order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or returns a different number of vectors.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or returns no vector.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send {
        let texts = vec![text.to_owned()];
        async move {
            self.embed_batch(&texts)
                .await?
                .into_iter()
                .next()
                .ok_or(LlmError::EmptyResponse {
                    provider: "embedder",
                })
        }
    }
}

/// Check that a backend returned one vector per input text.
pub(crate) fn check_batch_len(expected: usize, vectors: &[Vec<f32>]) -> Result<(), LlmError> {
    if vectors.len() == expected {
        Ok(())
    } else {
        Err(LlmError::BatchMismatch {
            expected,
            actual: vectors.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn prompt_with_context() {
        let prompt = build_prompt(
            "What is RAG?",
            &["first chunk".to_owned(), "second chunk".to_owned()],
        );
        assert_eq!(
            prompt,
            "Context:\nfirst chunk\nsecond chunk\n\nQuestion: What is RAG?\n\n\
             Answer based on the context provided above. \
             If the context doesn't contain enough information, say so."
        );
    }

    #[test]
    fn prompt_without_context_is_question() {
        assert_eq!(build_prompt("hello?", &[]), "hello?");
    }

    #[test]
    fn batch_len_mismatch_detected() {
        let err = check_batch_len(2, &[vec![0.0]]).unwrap_err();
        assert!(matches!(
            err,
            LlmError::BatchMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert!(check_batch_len(1, &[vec![0.0]]).is_ok());
    }

    #[test]
    fn message_user_constructor() {
        let msg = Message::user("hi");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hi");
    }
}
