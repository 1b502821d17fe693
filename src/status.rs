use tokio::sync::watch;

pub const INITIAL_STATUS: &str = "Running";

/// Single observable status line for whatever UI sits on top of the pipeline.
/// Cloning shares the same channel.
#[derive(Clone)]
pub struct StatusReporter {
    tx: watch::Sender<String>,
}

impl StatusReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(INITIAL_STATUS.to_string());
        Self { tx }
    }

    /// Replace the status. Observers are only woken when the text changes.
    pub fn set(&self, status: impl Into<String>) {
        let status = status.into();
        self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    pub fn current(&self) -> String {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}
