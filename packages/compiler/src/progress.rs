// ABOUTME: Progress notifications emitted at pipeline stage boundaries
// ABOUTME: Append-only channel consumed by a caller-owned progress bar

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Models,
    Actions,
    Schedules,
    Complete,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Models => "models",
            ProgressStage::Actions => "actions",
            ProgressStage::Schedules => "schedules",
            ProgressStage::Complete => "complete",
        }
    }

    /// Percent complete once this stage has finished
    pub fn percent(&self) -> u8 {
        match self {
            ProgressStage::Models => 25,
            ProgressStage::Actions => 50,
            ProgressStage::Schedules => 75,
            ProgressStage::Complete => 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub stage: ProgressStage,
    pub message: String,
    pub percent: u8,
}

/// Sends progress updates when a receiver is attached; silent otherwise
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressUpdate>>,
}

impl ProgressReporter {
    pub fn new(sender: UnboundedSender<ProgressUpdate>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    /// Reporter plus the receiving end of its channel
    pub fn channel() -> (Self, UnboundedReceiver<ProgressUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }

    pub fn stage_complete(&self, stage: ProgressStage, message: impl Into<String>) {
        let update = ProgressUpdate {
            stage,
            message: message.into(),
            percent: stage.percent(),
        };
        debug!("Progress {}%: {}", update.percent, update.message);

        if let Some(sender) = &self.sender {
            // A dropped receiver only means nobody is watching
            let _ = sender.send(update);
        }
    }
}
