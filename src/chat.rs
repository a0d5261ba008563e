// Terminal front end: the same turn pipeline as the web page, over stdin/stdout.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::orchestrator::{Orchestrator, TurnOutcome};
use crate::session::ConversationLog;

const BAR_WIDTH: usize = 40;

/// Explanation plus a text chart when the turn produced one.
pub fn format_outcome(outcome: &TurnOutcome) -> String {
    let mut out = format!("Response: {}\n", outcome.explanation);
    if let Some(chart) = &outcome.chart {
        out.push_str("\nVisualization:\n");
        out.push_str(&chart.render_text(BAR_WIDTH));
    }
    out
}

/// Read questions line by line until EOF or `exit`/`quit`, printing each
/// answer followed by the whole history. Failed turns print an error and the
/// session carries on. Returns the final log.
pub async fn run_chat<R, W>(
    orchestrator: &Orchestrator,
    input: R,
    mut output: W,
) -> Result<ConversationLog>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Starting interactive chat session...");
    let mut log = ConversationLog::new();
    let mut lines = input.lines();

    output
        .write_all(b"Smart Grid Chatbot\nAsk a question about the smart grid (\"exit\" to leave).\n")
        .await?;

    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        // Trimmed only to recognise blank lines and commands; the line is recorded as typed.
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if matches!(trimmed, "exit" | "quit") {
            break;
        }

        output
            .write_all(format!("You asked: {line}\n").as_bytes())
            .await?;

        match orchestrator.handle_turn(&line, &mut log).await {
            Ok(outcome) => {
                output.write_all(format_outcome(&outcome).as_bytes()).await?;
            }
            Err(e) => {
                output
                    .write_all(format!("Error: {}\n", e.user_message()).as_bytes())
                    .await?;
            }
        }

        if !log.is_empty() {
            output.write_all(b"\nChat History:\n").await?;
            output.write_all(log.transcript().as_bytes()).await?;
        }
    }

    output.flush().await?;
    info!(turns = log.len(), "Chat session finished.");
    Ok(log)
}
