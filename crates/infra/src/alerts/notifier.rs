//! Outbound low-stock notifications.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("failed to encode notification: {0}")]
    Serialize(String),
}

/// A published notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub message: String,
}

/// Delivers a subject + message to an external channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), NotifyError>;
}

#[async_trait]
impl<N> Notifier for Arc<N>
where
    N: Notifier + ?Sized,
{
    async fn publish(&self, subject: &str, message: &str) -> Result<(), NotifyError> {
        (**self).publish(subject, message).await
    }
}

/// Writes notifications to the log. Used when no transport is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), NotifyError> {
        info!(subject, message, "notification");
        Ok(())
    }
}

/// Records notifications in memory; can be switched to fail for tests.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: Mutex<bool>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `publish` calls fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut f) = self.failing.lock() {
            *f = failing;
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), NotifyError> {
        let failing = *self
            .failing
            .lock()
            .map_err(|_| NotifyError::Transport("lock poisoned".to_string()))?;
        if failing {
            return Err(NotifyError::Transport("notifier unavailable".to_string()));
        }

        self.sent
            .lock()
            .map_err(|_| NotifyError::Transport("lock poisoned".to_string()))?
            .push(Notification {
                subject: subject.to_string(),
                message: message.to_string(),
            });
        Ok(())
    }
}

/// Publishes notifications as JSON `{subject, message}` on a Redis pub/sub channel.
///
/// Pub/sub is not durable: a notification is lost if nobody is subscribed.
#[cfg(feature = "redis")]
#[derive(Debug, Clone)]
pub struct RedisNotifier {
    client: redis::Client,
    channel: String,
}

#[cfg(feature = "redis")]
impl RedisNotifier {
    pub fn new(redis_url: impl AsRef<str>, channel: impl Into<String>) -> Result<Self, NotifyError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            channel: channel.into(),
        })
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl Notifier for RedisNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), NotifyError> {
        use redis::AsyncCommands;

        let payload = serde_json::to_string(&Notification {
            subject: subject.to_string(),
            message: message.to_string(),
        })
        .map_err(|e| NotifyError::Serialize(e.to_string()))?;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        info!(channel = %self.channel, receivers, "notification published");
        Ok(())
    }
}
