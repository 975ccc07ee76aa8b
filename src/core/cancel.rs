//! Cooperative cancellation shared between the parser, the dispatcher and its workers.

use crate::core::errors::{OCRError, OcrResult};
use std::sync::Arc;
use tokio::sync::watch;

/// A clonable cancellation signal.
///
/// Every clone observes the same flag. Cancellation is one-way: once
/// [`cancel`](Self::cancel) is called the token stays cancelled.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves when the token is cancelled. Returns immediately if it already is.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so `wait_for` only returns once the flag flips.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Returns `OCRError::Cancelled` carrying `context` if the token is cancelled.
    pub fn check(&self, context: &str) -> OcrResult<()> {
        if self.is_cancelled() {
            return Err(OCRError::cancelled(context));
        }
        Ok(())
    }
}
