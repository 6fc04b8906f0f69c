use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::MemberId;

pub mod telegram;

/// A button attached to a message. `command` is what the transport sends
/// back when the button is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub label: String,
    pub command: String,
}

impl Action {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
        }
    }
}

/// Message body plus rows of actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outbound {
    pub text: String,
    pub actions: Vec<Vec<Action>>,
}

impl Outbound {
    pub fn new(text: impl Into<String>, actions: Vec<Vec<Action>>) -> Self {
        Self {
            text: text.into(),
            actions,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Persistent,
    /// Replaces the previous ephemeral message to the recipient and expires.
    Ephemeral,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("recipient {0} is unreachable: {1}")]
    Unreachable(MemberId, String),

    #[error("transport rejected message: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("delivery timed out after {0:?}")]
    TimedOut(Duration),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, recipient: MemberId, message: &Outbound) -> Result<(), DeliveryError>;

    async fn deliver_ephemeral(
        &self,
        recipient: MemberId,
        message: &Outbound,
    ) -> Result<(), DeliveryError>;
}

/// Outcome of one recipient's delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub recipient: MemberId,
    pub outcome: Result<(), DeliveryError>,
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Aggregated result of a fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOut {
    pub reports: Vec<DeliveryReport>,
}

impl FanOut {
    pub fn delivered(&self) -> usize {
        self.reports.iter().filter(|r| r.is_delivered()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (MemberId, &DeliveryError)> {
        self.reports
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r.recipient, e)))
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }
}

/// Sends `message` to every recipient concurrently. Each attempt is bounded
/// by `timeout`, so one stuck recipient cannot hold up the others.
pub async fn fan_out<T>(
    transport: &T,
    recipients: &[MemberId],
    message: &Outbound,
    mode: DeliveryMode,
    timeout: Duration,
) -> FanOut
where
    T: Transport + ?Sized,
{
    let attempts: Vec<_> = recipients
        .iter()
        .map(|&recipient| async move {
            let send = async {
                match mode {
                    DeliveryMode::Persistent => transport.deliver(recipient, message).await,
                    DeliveryMode::Ephemeral => transport.deliver_ephemeral(recipient, message).await,
                }
            };
            let outcome = match tokio::time::timeout(timeout, send).await {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::TimedOut(timeout)),
            };
            DeliveryReport { recipient, outcome }
        })
        .collect();

    FanOut {
        reports: futures::future::join_all(attempts).await,
    }
}
