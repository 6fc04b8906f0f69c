use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{DeliveryError, Outbound, Transport};
use crate::models::MemberId;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: MemberId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboard<'a>>,
}

#[derive(Debug, Serialize)]
struct InlineKeyboard<'a> {
    inline_keyboard: Vec<Vec<InlineButton<'a>>>,
}

#[derive(Debug, Serialize)]
struct InlineButton<'a> {
    text: &'a str,
    callback_data: &'a str,
}

#[derive(Debug, Serialize)]
struct DeleteMessageRequest {
    chat_id: MemberId,
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Bot API chat transport. Tracks the last ephemeral message per recipient
/// so the next one can replace it.
#[derive(Clone)]
pub struct TelegramTransport {
    client: Client,
    endpoint: String,
    message_ttl: Duration,
    last_ephemeral: Arc<Mutex<HashMap<MemberId, i64>>>,
}

impl TelegramTransport {
    /// `message_ttl` of zero disables auto-expiry of ephemeral messages.
    pub fn new(api_url: &str, bot_token: &str, message_ttl: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/bot{}", api_url.trim_end_matches('/'), bot_token),
            message_ttl,
            last_ephemeral: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<Option<T>, DeliveryError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        call_api(&self.client, &self.endpoint, method, body).await
    }

    async fn send_message(
        &self,
        chat_id: MemberId,
        message: &Outbound,
    ) -> Result<i64, DeliveryError> {
        let reply_markup = if message.actions.is_empty() {
            None
        } else {
            Some(InlineKeyboard {
                inline_keyboard: message
                    .actions
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|a| InlineButton {
                                text: &a.label,
                                callback_data: &a.command,
                            })
                            .collect()
                    })
                    .collect(),
            })
        };

        let request = SendMessageRequest {
            chat_id,
            text: &message.text,
            reply_markup,
        };

        let sent: Option<SentMessage> = self
            .call("sendMessage", &request)
            .await
            .map_err(|e| match e {
                DeliveryError::Rejected(reason) if is_unreachable(&reason) => {
                    DeliveryError::Unreachable(chat_id, reason)
                }
                other => other,
            })?;

        sent.map(|m| m.message_id).ok_or_else(|| {
            DeliveryError::Transport("sendMessage response carried no message".to_string())
        })
    }

    fn take_last_ephemeral(&self, chat_id: MemberId) -> Option<i64> {
        self.last_ephemeral
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&chat_id)
    }

    fn remember_ephemeral(&self, chat_id: MemberId, message_id: i64) {
        self.last_ephemeral
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(chat_id, message_id);
    }

    fn schedule_expiry(&self, chat_id: MemberId, message_id: i64) {
        if self.message_ttl.is_zero() {
            return;
        }
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let ttl = self.message_ttl;
        let last_ephemeral = self.last_ephemeral.clone();

        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            {
                let mut last = last_ephemeral.lock().unwrap_or_else(PoisonError::into_inner);
                if last.get(&chat_id) == Some(&message_id) {
                    last.remove(&chat_id);
                }
            }
            let request = DeleteMessageRequest {
                chat_id,
                message_id,
            };
            if let Err(e) =
                call_api::<_, bool>(&client, &endpoint, "deleteMessage", &request).await
            {
                debug!("Expired message {} for {} not deleted: {}", message_id, chat_id, e);
            }
        });
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn deliver(&self, recipient: MemberId, message: &Outbound) -> Result<(), DeliveryError> {
        let message_id = self.send_message(recipient, message).await?;
        debug!("Delivered message {} to {}", message_id, recipient);
        Ok(())
    }

    async fn deliver_ephemeral(
        &self,
        recipient: MemberId,
        message: &Outbound,
    ) -> Result<(), DeliveryError> {
        if let Some(previous) = self.take_last_ephemeral(recipient) {
            let request = DeleteMessageRequest {
                chat_id: recipient,
                message_id: previous,
            };
            // The previous message may already be gone; that is fine.
            if let Err(e) = self.call::<_, bool>("deleteMessage", &request).await {
                debug!("Previous message {} for {} not deleted: {}", previous, recipient, e);
            }
        }

        let message_id = self.send_message(recipient, message).await?;
        self.remember_ephemeral(recipient, message_id);
        self.schedule_expiry(recipient, message_id);
        Ok(())
    }
}

async fn call_api<B, T>(
    client: &Client,
    endpoint: &str,
    method: &str,
    body: &B,
) -> Result<Option<T>, DeliveryError>
where
    B: Serialize + ?Sized,
    T: for<'de> Deserialize<'de>,
{
    let response = client
        .post(format!("{}/{}", endpoint, method))
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| {
            error!("Failed to call {}: {}", method, e);
            DeliveryError::Transport(format!("Failed to call {}: {}", method, e))
        })?;

    let status = response.status();
    let parsed: ApiResponse<T> = response.json().await.map_err(|e| {
        error!("Failed to parse {} response (status {}): {}", method, status, e);
        DeliveryError::Transport(format!("Failed to parse {} response: {}", method, e))
    })?;

    if !parsed.ok {
        let reason = format!(
            "{} {}",
            parsed.error_code.unwrap_or(status.as_u16()),
            parsed.description.unwrap_or_default()
        );
        info!("{} was rejected: {}", method, reason);
        return Err(DeliveryError::Rejected(reason));
    }

    Ok(parsed.result)
}

/// Rejections that mean the recipient cannot be reached at all.
fn is_unreachable(reason: &str) -> bool {
    reason.starts_with("403") || reason.contains("chat not found")
}
