// Defaults that can be overridden from the environment (or a .env file).

use std::env;
use std::time::Duration;

// Read on first access; dotenvy must have run by then.
lazy_static::lazy_static! {
    pub static ref GEMINI_API_BASE: String = env::var("GEMINI_API_BASE")
        .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
    // gemini-pro does not accept a JSON response mime type, so default to a model that does.
    pub static ref GEMINI_MODEL: String = env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());
    pub static ref TEMPLATES_DIR: String = env::var("GRIDCHAT_TEMPLATES_DIR").unwrap_or_else(|_| "templates".to_string());
    pub static ref STATIC_DIR: String = env::var("GRIDCHAT_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
}

/// Name of the environment variable holding the Gemini credential.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Same port Streamlit serves on, so existing bookmarks keep working.
pub const DEFAULT_PORT: u16 = 8501;

/// Web sessions unused for this long are dropped when the next one starts.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub const CHART_TITLE: &str = "Smart Grid Metrics";
pub const CHART_XAXIS_TITLE: &str = "Categories";
pub const CHART_YAXIS_TITLE: &str = "Values";
