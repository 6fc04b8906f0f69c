use brewcrew_shared::models::MemberId;
use brewcrew_shared::transport::{fan_out, DeliveryMode, Outbound, Transport};
use log::{error, info};
use serde::Serialize;
use std::time::Duration;

/// What happened to one notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Notice {
    /// Nobody to send to.
    NoRecipients,
    /// The triggering member is below the threshold.
    BelowThreshold,
    /// Only part of the group is ready.
    NotReady { ready: usize, total: usize },
    QuietHours,
    CoolingDown,
    Sent { delivered: usize, failed: usize },
}

impl Notice {
    pub fn was_sent(&self) -> bool {
        matches!(self, Notice::Sent { .. })
    }
}

/// Fans `message` out and logs every failed recipient. Never fails itself.
pub async fn broadcast(
    transport: &dyn Transport,
    kind: &str,
    recipients: &[MemberId],
    message: &Outbound,
    mode: DeliveryMode,
    timeout: Duration,
) -> Notice {
    if recipients.is_empty() {
        return Notice::NoRecipients;
    }

    let result = fan_out(transport, recipients, message, mode, timeout).await;
    for (recipient, err) in result.failures() {
        error!("Failed to deliver {} to {}: {}", kind, recipient, err);
    }
    info!(
        "Delivered {} to {}/{} members",
        kind,
        result.delivered(),
        recipients.len()
    );

    Notice::Sent {
        delivered: result.delivered(),
        failed: result.failed(),
    }
}
