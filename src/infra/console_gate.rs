use crate::app::ports::{ConfirmationGate, PromptContext, PromptKind};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};

/// Terminal yes/no gate. Kept deliberately dumb: the batch runner owns the
/// re-ask loop, this adapter only renders one prompt and reads one answer.
pub struct ConsoleGate;

impl ConsoleGate {
    fn render(prompt: &PromptContext) -> String {
        match prompt.kind {
            PromptKind::Proceed => format!(
                "Proceed with batch {}/{}? [y/N] ",
                prompt.batch_index, prompt.total_batches
            ),
            PromptKind::AbandonRun => {
                "Are you sure? Already-fetched data will still be checkpointed. Abort the run? [y/N] "
                    .to_string()
            }
        }
    }

    fn ask(prompt: &PromptContext) -> bool {
        print!("{}", Self::render(prompt));
        let _ = io::stdout().flush();

        let mut answer = String::new();
        // EOF or a read error counts as a decline
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

#[async_trait]
impl ConfirmationGate for ConsoleGate {
    async fn confirm(&self, prompt: &PromptContext) -> bool {
        let prompt = *prompt;
        tokio::task::spawn_blocking(move || Self::ask(&prompt))
            .await
            .unwrap_or(false)
    }
}
