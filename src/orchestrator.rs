//! Runs one chat turn: prompt, model call, validation, history update.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::chart::ChartSpec;
use crate::error::TurnError;
use crate::llm_interaction::ModelClient;
use crate::prompt::build_prompt;
use crate::reply;
use crate::session::{ChatTurn, ConversationLog};

/// What a successful turn produced for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub explanation: String,
    pub chart: Option<ChartSpec>,
}

#[derive(Clone)]
pub struct Orchestrator {
    client: Arc<dyn ModelClient>,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    /// Answer `user_text` and record the turn in `log`.
    ///
    /// On any error the log is left exactly as it was. The chart is only
    /// built when the reply carries both `data` and `labels`.
    #[instrument(skip_all, fields(turn = log.len() + 1))]
    pub async fn handle_turn(
        &self,
        user_text: &str,
        log: &mut ConversationLog,
    ) -> Result<TurnOutcome, TurnError> {
        let prompt = build_prompt(user_text);
        debug!(prompt_len = prompt.len(), "Prompt built");

        let raw = match self.client.send(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Turn failed: transport");
                return Err(e.into());
            }
        };
        debug!(raw_len = raw.len(), "Model reply received");

        let parsed = match reply::parse(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Turn failed: unusable reply");
                return Err(e.into());
            }
        };

        let chart = parsed.chart();
        log.append(ChatTurn {
            user: user_text.to_string(),
            bot: parsed.explanation.clone(),
        });
        info!(
            history_len = log.len(),
            chart = chart.is_some(),
            "Turn recorded"
        );

        Ok(TurnOutcome {
            explanation: parsed.explanation,
            chart,
        })
    }
}
