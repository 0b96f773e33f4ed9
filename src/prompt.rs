//! Operator confirmation
//!
//! Interactive runs ask before any transaction is sent. Only an explicit
//! yes confirms; anything else, including a closed stdin, cancels.

use crate::{Error, Result};
use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};
use tokio::sync::Mutex;

#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Ask `question`; `true` only on explicit confirmation
    async fn confirm(&self, question: &str) -> Result<bool>;
}

/// Line-based prompt over a reader and a writer.
///
/// The reader lives as long as the prompt, so lines buffered past the
/// current answer are kept for the next question.
pub struct TerminalPrompt<R = BufReader<Stdin>, W = Stdout> {
    reader: Mutex<R>,
    writer: Mutex<W>,
}

impl TerminalPrompt {
    /// Prompt on stdout, answers from stdin
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> TerminalPrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl<R, W> ConfirmationGate for TerminalPrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&self, question: &str) -> Result<bool> {
        {
            let mut writer = self.writer.lock().await;
            writer
                .write_all(format!("\n{} [y/N] ", question).as_bytes())
                .await
                .map_err(|e| Error::Prompt(e.to_string()))?;
            writer
                .flush()
                .await
                .map_err(|e| Error::Prompt(e.to_string()))?;
        }

        let mut answer = String::new();
        self.reader
            .lock()
            .await
            .read_line(&mut answer)
            .await
            .map_err(|e| Error::Prompt(e.to_string()))?;

        Ok(is_affirmative(&answer))
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
