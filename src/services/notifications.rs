use crate::errors::ServiceError;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingReminder,
    CartReminder,
    ReorderSuggestion,
    SecurityAlert,
}

/// One outbound notification. The remote provider's wire format is not this
/// core's concern; the payload is a structured JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub tenant_id: Uuid,
    pub kind: NotificationKind,
    pub subject: String,
    pub body: serde_json::Value,
}

/// Narrow seam to the outside world. Jobs depend on this trait, never on a
/// concrete delivery mechanism.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), ServiceError>;
}

/// Delivery by signed webhook. The payload is serialized once and signed
/// with HMAC-SHA256 when a secret is configured.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: String, secret: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url,
            secret,
        }
    }

    fn signature(&self, payload: &[u8]) -> Option<String> {
        let secret = self.secret.as_ref()?;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(payload);
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), ServiceError> {
        let payload = serde_json::to_vec(notification)
            .map_err(|e| ServiceError::InternalError(format!("serialize notification: {}", e)))?;

        let mut request = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .body(payload.clone());
        if let Some(signature) = self.signature(&payload) {
            request = request.header("x-storefront-signature", signature);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("webhook send: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Log-only delivery, used when no webhook URL is configured and in tests.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), ServiceError> {
        info!(
            tenant_id = %notification.tenant_id,
            kind = %notification.kind,
            subject = %notification.subject,
            "notification (log delivery)"
        );
        Ok(())
    }
}

/// Sends with a single inline retry. Collaborator failures must never abort
/// a batch; callers count the returned error as one failed unit and move on.
pub async fn notify_with_retry(
    notifier: &dyn Notifier,
    notification: &Notification,
) -> Result<(), ServiceError> {
    match notifier.notify(notification).await {
        Ok(()) => Ok(()),
        Err(first) => {
            warn!(
                kind = %notification.kind,
                error = %first,
                "notification failed, retrying once"
            );
            notifier.notify(notification).await
        }
    }
}
