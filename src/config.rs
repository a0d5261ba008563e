//! Runtime configuration, resolved once at startup.

use crate::constants;
use crate::error::ConfigError;

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

// Hand-written so the key never ends up in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Config {
    /// Validate the credential and endpoint. Missing values fall back to the
    /// env-derived defaults in [`constants`], except the key, which is required.
    pub fn resolve(
        api_key: Option<String>,
        model: Option<String>,
        api_base: Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey(constants::API_KEY_VAR))?;

        let model = model.unwrap_or_else(|| constants::GEMINI_MODEL.clone());
        let model = model.trim().to_string();
        if model.is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        let api_base = api_base.unwrap_or_else(|| constants::GEMINI_API_BASE.clone());
        let api_base = api_base.trim_end_matches('/').to_string();
        match reqwest::Url::parse(&api_base) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ConfigError::InvalidApiBase(api_base)),
        }

        Ok(Self {
            api_key,
            model,
            api_base,
        })
    }
}
