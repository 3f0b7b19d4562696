// Chronicle LLM adapters
//
// A single provider-neutral contract, `call(messages, tools, system_prompt)
// -> LlmCompletion`, with two concrete adapters behind it:
//
// - `ChatCompletionsClient`: OpenAI-style chat completions, interleaving
//   user/assistant/tool turns (also covers Gemini and other providers that
//   expose the same protocol).
// - `AnthropicMessagesClient`: the Anthropic Messages API, where tool-use
//   blocks are separated from text content.
//
// Both normalize their provider's response into the shared `LlmCompletion`.
// Streaming is deliberately absent here: callers get a completed response,
// and anything watching the stream of events does its own presentation.

pub mod anthropic;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod factory;

pub use anthropic::AnthropicMessagesClient;
pub use chat::ChatCompletionsClient;
pub use client::{LlmClient, LlmCompletion};
pub use config::LlmConfig;
pub use error::LlmError;
pub use factory::{create_client, ProviderKind};
