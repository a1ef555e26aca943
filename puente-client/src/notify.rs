//! User-facing notifications
//!
//! The link and the dispatcher report outcomes as short title/message pairs.
//! Where they end up (toast, log, status bar) is up to the [`Notifier`].

use parking_lot::Mutex;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Notification sink
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, title: &str, message: &str);
}

/// Writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, title: &str, message: &str) {
        match severity {
            Severity::Info | Severity::Success => tracing::info!(%title, "{}", message),
            Severity::Warning => tracing::warn!(%title, "{}", message),
            Severity::Error => tracing::error!(%title, "{}", message),
        }
    }
}

/// A recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

/// Keeps every notification in memory, for polling UIs and tests
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    /// Remove and return everything recorded so far
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Whether any notification has this title
    pub fn has_title(&self, title: &str) -> bool {
        self.entries.lock().iter().any(|n| n.title == title)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, title: &str, message: &str) {
        self.entries.lock().push(Notification {
            severity,
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}
