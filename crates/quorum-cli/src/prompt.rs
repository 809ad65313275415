use std::io::Write;

use async_trait::async_trait;
use quorum_sdk::Prompt;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Asks on the terminal and reads the answer from stdin.
pub struct StdinPrompt;

#[async_trait]
impl Prompt for StdinPrompt {
    async fn confirm(&self, title: &str, content: &str) -> bool {
        print!("{title}\n  {content}\n[y/N] ");
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(_) => is_yes(&line),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
