//! Ask command handler.
//!
//! Answers questions through the full retrieval, fallback and synthesis
//! pipeline, once or interactively.

use crate::services;
use clap::Args;
use mathtutor_core::{config::AppConfig, AppResult};
use mathtutor_knowledge::{Orchestrator, QueryRequest, QueryResponse};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Ask a math question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    #[arg(required_unless_present = "interactive")]
    pub question: Vec<String>,

    /// Read questions from stdin until "exit"
    #[arg(short, long)]
    pub interactive: bool,

    /// Print {"answer", "context"} as JSON
    #[arg(long)]
    pub json: bool,

    /// Also print the context the answer was based on
    #[arg(long)]
    pub show_context: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let orchestrator = services::orchestrator(config).await?;

        if self.interactive {
            return self.interactive_loop(&orchestrator).await;
        }

        let question = self.question.join(" ");
        let response = orchestrator.handle(QueryRequest::new(question)).await;
        self.print_response(&response)
    }

    async fn interactive_loop(&self, orchestrator: &Orchestrator) -> AppResult<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("Question (or 'exit'): ");
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().eq_ignore_ascii_case("exit") {
                break;
            }

            let response = orchestrator.handle(QueryRequest::new(line)).await;
            self.print_response(&response)?;
            println!();
        }

        Ok(())
    }

    fn print_response(&self, response: &QueryResponse) -> AppResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(response)?);
            return Ok(());
        }

        if self.show_context {
            if let Some(context) = &response.context {
                println!("--- Context ---\n{}\n---------------", context);
            }
        }
        println!("{}", response.answer);
        Ok(())
    }
}
