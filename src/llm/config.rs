//! Environment-driven generator configuration

/// Configuration for the chat completions backend
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/beta";
const DEFAULT_MODEL: &str = "deepseek-chat";

impl LlmConfig {
    /// Load configuration from the environment.
    ///
    /// `MIDSTREAM_API_KEY` is required to talk to a real backend;
    /// `MIDSTREAM_BASE_URL` and `MIDSTREAM_MODEL` default to DeepSeek's
    /// OpenAI-compatible endpoint.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("MIDSTREAM_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: std::env::var("MIDSTREAM_BASE_URL")
                .ok()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: std::env::var("MIDSTREAM_MODEL")
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}
