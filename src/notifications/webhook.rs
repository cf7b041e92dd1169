use std::time::Duration;

use super::event::NotificationEvent;

pub(super) struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub(super) fn new(url: String, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, url }
    }

    pub(super) async fn send(&self, event: &NotificationEvent) {
        let result = self
            .client
            .post(&self.url)
            .json(&event.payload())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                log::warn!(
                    "webhook_delivery_failed event={} status={}",
                    event.kind(),
                    response.status().as_u16()
                );
            }
            Err(error) => {
                log::warn!(
                    "webhook_delivery_failed event={} error={}",
                    event.kind(),
                    error
                );
            }
        }
    }
}
