//! Error types for every stage of a chat turn.
//!
//! Each stage returns its own typed error; [`TurnError`] is what the
//! orchestrator hands back to the surfaces, which turn it into a message for
//! the user without ending the session.

use thiserror::Error;

/// Startup configuration problems. Fatal: no request is attempted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set; add it to the environment or a .env file")]
    MissingApiKey(&'static str),

    #[error("invalid Gemini API base URL `{0}`")]
    InvalidApiBase(String),

    #[error("model name must not be empty")]
    EmptyModel,
}

/// The external model call could not complete.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to the Gemini API failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Gemini API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode the Gemini API response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Gemini API returned no answer{}", blocked_suffix(.block_reason))]
    NoCandidates { block_reason: Option<String> },
}

/// Why a decoded reply does not match the expected shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("reply is not a JSON object")]
    NotAnObject,

    #[error("reply has no `explanation` field")]
    MissingExplanation,

    #[error("`explanation` must be a string")]
    ExplanationNotString,

    #[error("`data` must be a list of numbers")]
    InvalidData,

    #[error("`labels` must be a list of strings")]
    InvalidLabels,

    #[error("`data` has {data} values but `labels` has {labels}")]
    LengthMismatch { data: usize, labels: usize },
}

fn blocked_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(" (blocked: {reason})"),
        None => String::new(),
    }
}

/// The model answered, but not with what we asked for.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("model reply is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model reply does not match the expected schema: {0}")]
    Schema(#[from] SchemaError),
}

/// A failed turn. The conversation log is untouched when one of these is returned.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Reply(#[from] ReplyError),
}

impl TurnError {
    /// Stable short name, used in API responses and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TurnError::Transport(_) => "transport",
            TurnError::Reply(ReplyError::Parse(_)) => "parse",
            TurnError::Reply(ReplyError::Schema(_)) => "schema",
        }
    }

    /// Message shown to the person chatting.
    pub fn user_message(&self) -> String {
        match self {
            TurnError::Transport(e) => format!("Error getting response from Gemini: {e}"),
            TurnError::Reply(e) => format!("Gemini sent an answer we could not read: {e}"),
        }
    }
}
