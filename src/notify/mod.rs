use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde_json::json;

use crate::collaborators::{Endpoint, NotificationSender, Payload};
use crate::error::{SentryError, SentryResult};
use crate::settings::EndpointSettings;

/// Sends notifications over plain HTTP. Bodiless signals are GETs; position
/// reports and image uploads are POSTs.
pub struct HttpNotifier {
    client: Client,
    endpoints: EndpointSettings,
}

impl HttpNotifier {
    pub fn new(endpoints: EndpointSettings) -> SentryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(endpoints.timeout_secs.max(1)))
            .build()?;
        Ok(Self { client, endpoints })
    }

    fn url_for(&self, endpoint: Endpoint) -> Option<&str> {
        match endpoint {
            Endpoint::Move => self.endpoints.move_url.as_deref(),
            Endpoint::Intruder => self.endpoints.intruder_url.as_deref(),
            Endpoint::Captured => self.endpoints.captured_url.as_deref(),
            Endpoint::ImageUpload => self.endpoints.image_url.as_deref(),
        }
    }
}

#[async_trait]
impl NotificationSender for HttpNotifier {
    async fn send(&self, endpoint: Endpoint, payload: Payload) -> SentryResult<()> {
        let url = self.url_for(endpoint).ok_or_else(|| {
            SentryError::Transport(format!("no URL configured for {}", endpoint.as_str()))
        })?;

        let request = match payload {
            Payload::None => self.client.get(url),
            // the receiving server expects string-encoded coordinates
            Payload::Position(estimate) => self.client.post(url).json(&json!({
                "x": estimate.x.to_string(),
                "z": estimate.z.to_string(),
            })),
            Payload::Image {
                bytes,
                content_type,
            } => self
                .client
                .post(url)
                .header(CONTENT_TYPE, content_type)
                .body(bytes),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SentryError::Transport(format!(
                "{} responded {}",
                endpoint.as_str(),
                status
            )));
        }

        log::debug!("{} notification delivered ({})", endpoint.as_str(), status);
        Ok(())
    }
}
