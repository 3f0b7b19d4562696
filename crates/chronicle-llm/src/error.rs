// LLM error taxonomy
//
// `Api` covers transport, authentication and rate limiting; `Response`
// covers provider output the adapter cannot make sense of. Both are
// transient from the engine's point of view and retried under its budget;
// anything else surfaces as `Other` and fails the step on first sight.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("LLM API error: {0}")]
    Api(String),

    #[error("LLM response error: {0}")]
    Response(String),

    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }

    pub fn response(message: impl Into<String>) -> Self {
        Self::Response(message.into())
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Api(_) | Self::Response(_))
    }
}
