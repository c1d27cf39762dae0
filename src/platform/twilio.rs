use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::TwilioConfig;
use crate::platform::MessagingGateway;

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

/// Sends WhatsApp messages through Twilio's Messages REST resource.
pub struct TwilioGateway {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioGateway {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl MessagingGateway for TwilioGateway {
    async fn send_message(&self, to: &str, text: &str) -> Result<()> {
        let url = self.messages_url();
        debug!("Sending message to {} via {}", to, url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Body", text),
            ])
            .send()
            .await
            .context("Failed to send request to Twilio")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Twilio API error ({}): {}", status, error_body);
        }

        let message: MessageResource = response
            .json()
            .await
            .context("Failed to parse Twilio response")?;
        info!("Message {} sent to {}", message.sid, to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "whatsapp:+14155238886".to_string(),
            base_url,
            allowed_senders: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_send_posts_form_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(header_exists("authorization"))
            .and(body_string_contains("To=whatsapp%3A%2B15550001"))
            .and(body_string_contains("From=whatsapp%3A%2B14155238886"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sid": "SM1" })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = TwilioGateway::new(config(server.uri()));
        gateway
            .send_message("whatsapp:+15550001", "✅ Highlight saved!")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Authenticate"))
            .mount(&server)
            .await;

        let gateway = TwilioGateway::new(config(server.uri()));
        let err = gateway.send_message("whatsapp:+1", "hi").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
