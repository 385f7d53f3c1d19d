//! Progress events emitted while materializing a deck.

use tokio::sync::mpsc;

/// Pipeline stage a progress update refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    /// Deck entries being resolved against the card database.
    DeckDetails,
    /// Card images being written into the output document.
    Document,
}

/// Progress notification with an optional completion percentage and
/// optional error text.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Stage the update refers to.
    pub stage: ProgressStage,
    /// Completion percentage in `[0, 100]`, when known.
    pub percent: Option<f64>,
    /// Error text, when the step failed.
    pub error: Option<String>,
}

/// Cloneable handle pipeline steps use to notify observers.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    sender: Option<mpsc::Sender<ProgressUpdate>>,
}

impl ProgressSender {
    /// Sender delivering updates into the given channel.
    pub fn new(sender: mpsc::Sender<ProgressUpdate>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Sender that drops every update.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Report a completion percentage for a stage.
    pub async fn percent(&self, stage: ProgressStage, percent: f64) {
        self.send(ProgressUpdate {
            stage,
            percent: Some(percent),
            error: None,
        })
        .await;
    }

    /// Report an error for a stage.
    pub async fn error(&self, stage: ProgressStage, message: impl Into<String>) {
        self.send(ProgressUpdate {
            stage,
            percent: None,
            error: Some(message.into()),
        })
        .await;
    }

    async fn send(&self, update: ProgressUpdate) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(update).await;
        }
    }
}
