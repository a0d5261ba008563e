//! Smart grid chatbot: questions go to Gemini, structured answers come back
//! as text, an optional bar chart, and a per-session history.

pub mod chart;
pub mod chat;
pub mod config;
pub mod constants;
pub mod error;
pub mod llm_interaction;
pub mod orchestrator;
pub mod prompt;
pub mod reply;
pub mod session;
pub mod web_server;

pub use chart::{build_chart, ChartSpec};
pub use config::Config;
pub use error::{ConfigError, ReplyError, SchemaError, TransportError, TurnError};
pub use llm_interaction::{GeminiClient, ModelClient};
pub use orchestrator::{Orchestrator, TurnOutcome};
pub use reply::ModelReply;
pub use session::{ChatTurn, ConversationLog, SessionStore};
