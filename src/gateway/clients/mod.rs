//! Outbound HTTP concerns: the shared connection pool and the LLM client.

pub mod azure_inference;
pub mod http_pool;
pub mod llm_client;

pub use azure_inference::AzureInferenceClient;
pub use llm_client::{ChatTurn, LlmClient, MessageChunk, MessageChunkStream, Role};
