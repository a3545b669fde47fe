//! One-way status channel.
//!
//! Background calls may only report here; they never touch board state.
//! The UI task owns the [`StatusBar`] end and drains it between actions.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotice {
    pub severity: Severity,
    pub text: String,
}

impl StatusNotice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Write end, cloned into every background task.
#[derive(Debug, Clone)]
pub struct StatusSender {
    tx: mpsc::UnboundedSender<StatusNotice>,
}

impl StatusSender {
    pub fn post(&self, notice: StatusNotice) {
        match notice.severity {
            Severity::Info => tracing::info!(status = %notice.text),
            Severity::Error => tracing::warn!(status = %notice.text),
        }
        // The UI may already be gone during shutdown.
        let _ = self.tx.send(notice);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.post(StatusNotice::info(text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.post(StatusNotice::error(text));
    }
}

/// Read end. Keeps the most recent line for the footer.
#[derive(Debug)]
pub struct StatusBar {
    rx: mpsc::UnboundedReceiver<StatusNotice>,
    latest: Option<StatusNotice>,
}

impl StatusBar {
    /// Returns everything posted since the last drain, oldest first.
    pub fn drain(&mut self) -> Vec<StatusNotice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.rx.try_recv() {
            out.push(notice);
        }
        if let Some(last) = out.last() {
            self.latest = Some(last.clone());
        }
        out
    }

    pub fn latest(&self) -> Option<&StatusNotice> {
        self.latest.as_ref()
    }

    pub fn clear(&mut self) {
        self.latest = None;
    }
}

pub fn channel() -> (StatusSender, StatusBar) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StatusSender { tx }, StatusBar { rx, latest: None })
}
