mod event;
mod webhook;

use std::sync::Arc;

use crate::config::NotificationsConfig;
use crate::detectors::Severity;

pub use event::NotificationEvent;

use webhook::WebhookSink;

/// Fans events out to the configured sinks. Webhook delivery runs on a
/// spawned task so a slow or dead sink never stalls the orchestration loop.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    console: bool,
    webhook: Option<Arc<WebhookSink>>,
    #[cfg(test)]
    recorded: std::sync::Mutex<Vec<String>>,
}

impl Notifier {
    pub fn from_config(config: &NotificationsConfig) -> Self {
        let webhook = config
            .webhook_url
            .as_ref()
            .map(|url| Arc::new(WebhookSink::new(url.clone(), config.webhook_timeout_secs)));
        if webhook.is_some() {
            log::info!("webhook_notifications_enabled");
        }

        Self {
            inner: Arc::new(NotifierInner {
                console: config.console,
                webhook,
                #[cfg(test)]
                recorded: std::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn dispatch(&self, event: NotificationEvent) {
        #[cfg(test)]
        {
            if let Ok(mut recorded) = self.inner.recorded.lock() {
                recorded.push(event.kind().to_string());
            }
        }

        if self.inner.console {
            let message = format!("[notification] {}", event.message());
            match event.severity() {
                Severity::Critical => log::error!("{}", message),
                Severity::Warning => log::warn!("{}", message),
                Severity::Info => log::info!("{}", message),
            }
        }

        if let Some(webhook) = &self.inner.webhook {
            let webhook = Arc::clone(webhook);
            tokio::spawn(async move {
                webhook.send(&event).await;
            });
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                console: false,
                webhook: None,
                recorded: std::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn recorded_events(&self) -> Vec<String> {
        self.inner
            .recorded
            .lock()
            .map(|recorded| recorded.clone())
            .unwrap_or_default()
    }
}
