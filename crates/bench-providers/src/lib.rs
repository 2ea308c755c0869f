//! Provider adapters: blocking HTTP translation between the run
//! controller's turn loop and each model API's wire format. One adapter
//! instance owns one conversation.

use anyhow::{anyhow, Result};
use bench_core::ProviderAdapter;
use std::time::Duration;

mod anthropic;
mod gemini;
mod openai;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-5.2";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_GOOGLE_MODEL: &str = "gemini-2.5-pro";

pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

pub fn default_model(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some(DEFAULT_OPENAI_MODEL),
        "anthropic" => Some(DEFAULT_ANTHROPIC_MODEL),
        "google" => Some(DEFAULT_GOOGLE_MODEL),
        _ => None,
    }
}

/// Build an adapter for the named provider, reading its API key from the
/// environment.
pub fn adapter_from_env(provider: &str, model: &str) -> Result<Box<dyn ProviderAdapter>> {
    match provider {
        "openai" => Ok(Box::new(OpenAiAdapter::from_env(model)?)),
        "anthropic" => Ok(Box::new(AnthropicAdapter::from_env(model)?)),
        "google" => Ok(Box::new(GeminiAdapter::from_env(model)?)),
        other => Err(anyhow!("Unknown provider: {other}")),
    }
}

pub(crate) fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| anyhow!("{name} is not set"))
}

pub(crate) fn http_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::blocking::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_defaults_are_registered() {
        assert_eq!(default_model("openai"), Some(DEFAULT_OPENAI_MODEL));
        assert_eq!(default_model("anthropic"), Some(DEFAULT_ANTHROPIC_MODEL));
        assert_eq!(default_model("google"), Some(DEFAULT_GOOGLE_MODEL));
        assert_eq!(default_model("cohere"), None);
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let err = adapter_from_env("nonsense", "model")
            .err()
            .expect("should fail");
        assert!(err.to_string().contains("Unknown provider"));
    }
}
