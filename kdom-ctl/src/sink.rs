use anyhow::Context;
use async_trait::async_trait;
use kdom_client::{api::ViewEvent, ViewSink};

/// Posts every view event to the analytics endpoint of the backend
pub struct HttpViewSink {
    client: reqwest::Client,
    host: String,
    token: Option<String>,
}

impl HttpViewSink {
    pub fn new(host: String, token: Option<String>) -> HttpViewSink {
        HttpViewSink {
            client: reqwest::Client::new(),
            host,
            token,
        }
    }
}

#[async_trait]
impl ViewSink for HttpViewSink {
    async fn send(&self, event: ViewEvent) -> anyhow::Result<()> {
        let mut req = self
            .client
            .post(format!("{}/api/track-view", self.host))
            .json(&event);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req.send()
            .await
            .with_context(|| format!("sending view of {}", event.key()))?
            .error_for_status()
            .with_context(|| format!("server rejected view of {}", event.key()))?;
        Ok(())
    }
}
