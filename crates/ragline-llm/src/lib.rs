//! Embedder and generator abstractions and their backend implementations.

pub mod any;
#[cfg(feature = "candle")]
pub mod candle_embed;
pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;

pub use error::LlmError;
pub use provider::{Embedder, LlmProvider};
