//! Confirmation notifiers.
//!
//! `SendGridNotifier` posts to the SendGrid v3 mail API. When SendGrid is not
//! configured, `LogNotifier` records the confirmation in the log instead.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::SendGridConfig;
use crate::pipeline::{Notifier, NotifyError};

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";
pub const CONFIRMATION_SUBJECT: &str = "Your Application Received";

/// HTML body of the confirmation email.
pub fn confirmation_html(display_name: &str, application_id: &str) -> String {
    format!("Hi {display_name},<br>Your application ID is <strong>{application_id}</strong>.")
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<MailContent>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct MailContent {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: String,
}

fn mail_request<'a>(
    from_email: &'a str,
    to_email: &'a str,
    display_name: &'a str,
    application_id: &str,
) -> MailRequest<'a> {
    MailRequest {
        personalizations: vec![Personalization {
            to: vec![Address {
                email: to_email,
                name: Some(display_name),
            }],
        }],
        from: Address {
            email: from_email,
            name: None,
        },
        subject: CONFIRMATION_SUBJECT,
        content: vec![MailContent {
            content_type: "text/html",
            value: confirmation_html(display_name, application_id),
        }],
    }
}

#[derive(Clone)]
pub struct SendGridNotifier {
    client: Client,
    config: SendGridConfig,
}

impl SendGridNotifier {
    pub fn new(config: SendGridConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Notifier for SendGridNotifier {
    async fn send(
        &self,
        to_email: &str,
        display_name: &str,
        application_id: &str,
    ) -> Result<(), NotifyError> {
        let body = mail_request(&self.config.from_email, to_email, display_name, application_id);

        let response = self
            .client
            .post(SENDGRID_API_URL)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError(format!("SendGrid request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError(format!("SendGrid returned {status}: {detail}")));
        }

        debug!(application_id, "Confirmation email accepted by SendGrid");
        Ok(())
    }
}

/// Stand-in used when no mail provider is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        to_email: &str,
        display_name: &str,
        application_id: &str,
    ) -> Result<(), NotifyError> {
        info!(
            to = to_email,
            name = display_name,
            application_id,
            "Email disabled; would send \"{CONFIRMATION_SUBJECT}\""
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_body() {
        assert_eq!(
            confirmation_html("Jane Doe", "APP-0A1B2C3D"),
            "Hi Jane Doe,<br>Your application ID is <strong>APP-0A1B2C3D</strong>."
        );
    }

    #[test]
    fn test_mail_request_shape() {
        let request = mail_request("hr@acme.test", "jane@example.com", "Jane Doe", "APP-0A1B2C3D");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["personalizations"][0]["to"][0]["email"], "jane@example.com");
        assert_eq!(json["personalizations"][0]["to"][0]["name"], "Jane Doe");
        assert_eq!(json["from"]["email"], "hr@acme.test");
        assert!(json["from"].get("name").is_none());
        assert_eq!(json["subject"], CONFIRMATION_SUBJECT);
        assert_eq!(json["content"][0]["type"], "text/html");
        assert!(json["content"][0]["value"]
            .as_str()
            .unwrap()
            .contains("APP-0A1B2C3D"));
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        LogNotifier
            .send("jane@example.com", "Jane Doe", "APP-0A1B2C3D")
            .await
            .unwrap();
    }
}
