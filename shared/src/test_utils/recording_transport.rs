use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use crate::models::MemberId;
use crate::transport::{DeliveryError, DeliveryMode, Outbound, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub recipient: MemberId,
    pub mode: DeliveryMode,
    pub message: Outbound,
}

/// Transport that records every successful delivery in memory.
#[derive(Default)]
pub struct RecordingTransport {
    delivered: Mutex<Vec<Delivered>>,
    unreachable: Mutex<HashSet<MemberId>>,
    hanging: Mutex<HashSet<MemberId>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries to `recipient` fail with `DeliveryError::Unreachable`.
    pub fn make_unreachable(&self, recipient: MemberId) {
        self.unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(recipient);
    }

    /// Deliveries to `recipient` never complete.
    pub fn make_hang(&self, recipient: MemberId) {
        self.hanging
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(recipient);
    }

    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Recipients of persistent messages, sorted.
    pub fn recipients(&self) -> Vec<MemberId> {
        self.recipients_for(DeliveryMode::Persistent)
    }

    /// Recipients of ephemeral messages, sorted.
    pub fn ephemeral_recipients(&self) -> Vec<MemberId> {
        self.recipients_for(DeliveryMode::Ephemeral)
    }

    /// Deliveries whose text contains `needle`.
    pub fn containing(&self, needle: &str) -> Vec<Delivered> {
        self.delivered()
            .into_iter()
            .filter(|d| d.message.text.contains(needle))
            .collect()
    }

    fn recipients_for(&self, mode: DeliveryMode) -> Vec<MemberId> {
        let mut ids: Vec<MemberId> = self
            .delivered()
            .into_iter()
            .filter(|d| d.mode == mode)
            .map(|d| d.recipient)
            .collect();
        ids.sort_unstable();
        ids
    }

    async fn record(
        &self,
        recipient: MemberId,
        message: &Outbound,
        mode: DeliveryMode,
    ) -> Result<(), DeliveryError> {
        let hangs = self
            .hanging
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&recipient);
        if hangs {
            std::future::pending::<()>().await;
        }
        let unreachable = self
            .unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&recipient);
        if unreachable {
            return Err(DeliveryError::Unreachable(
                recipient,
                "recipient blocked the bot".to_string(),
            ));
        }
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Delivered {
                recipient,
                mode,
                message: message.clone(),
            });
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn deliver(&self, recipient: MemberId, message: &Outbound) -> Result<(), DeliveryError> {
        self.record(recipient, message, DeliveryMode::Persistent).await
    }

    async fn deliver_ephemeral(
        &self,
        recipient: MemberId,
        message: &Outbound,
    ) -> Result<(), DeliveryError> {
        self.record(recipient, message, DeliveryMode::Ephemeral).await
    }
}
