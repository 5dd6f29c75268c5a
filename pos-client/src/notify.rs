//! Notification channel
//!
//! Transient notices (toasts) and the session-lost signal, broadcast to
//! whatever renders the screens. Every notice is logged as well.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient message for the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub message: String,
}

/// Event published to the UI layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Notice(Notice),
    /// Token lost; the operator must log in again
    AuthRequired,
}

/// Broadcast sender of [`ClientEvent`]s
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<ClientEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) -> Notice {
        let notice = Notice {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
        };
        match level {
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(message = %notice.message, "Notice")
            }
            NoticeLevel::Warning => tracing::warn!(message = %notice.message, "Notice"),
            NoticeLevel::Error => tracing::error!(message = %notice.message, "Notice"),
        }
        // nobody listening is fine
        let _ = self.tx.send(ClientEvent::Notice(notice.clone()));
        notice
    }

    pub fn info(&self, message: impl Into<String>) -> Notice {
        self.notify(NoticeLevel::Info, message)
    }

    pub fn success(&self, message: impl Into<String>) -> Notice {
        self.notify(NoticeLevel::Success, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> Notice {
        self.notify(NoticeLevel::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Notice {
        self.notify(NoticeLevel::Error, message)
    }

    pub fn auth_required(&self) {
        tracing::warn!("Authentication required");
        let _ = self.tx.send(ClientEvent::AuthRequired);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(128)
    }
}
