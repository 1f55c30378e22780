use foundry_compiler::{ProgressReporter, ProgressUpdate};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Progress bar driven by the compiler's stage notifications
pub struct StageProgress {
    bar: ProgressBar,
    task: JoinHandle<()>,
}

impl StageProgress {
    /// Hidden bar when `enabled` is false, e.g. for JSON output
    pub fn start(enabled: bool) -> (ProgressReporter, Self) {
        let (reporter, receiver) = ProgressReporter::channel();

        let bar = if enabled {
            ProgressBar::new(100)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message("Validating...");

        let task = tokio::spawn(drive(bar.clone(), receiver));
        (reporter, Self { bar, task })
    }

    /// Wait for the last update once the compiler (and its sender) is gone
    pub async fn finish(self, success: bool) {
        let _ = self.task.await;
        if success {
            self.bar.finish_and_clear();
        } else {
            self.bar.abandon();
        }
    }
}

async fn drive(bar: ProgressBar, mut receiver: UnboundedReceiver<ProgressUpdate>) {
    while let Some(update) = receiver.recv().await {
        bar.set_position(u64::from(update.percent));
        bar.set_message(update.message);
    }
}
