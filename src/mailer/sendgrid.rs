//! SendGrid v3 HTTP API delivery.
use std::time::Duration;

use serde::Serialize;

use super::{Email, MailError, Mailer};

const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com";

/// Builder for constructing `SendGridMailer` instances.
///
/// # Examples
///
/// ```
/// use pathfork::mailer::SendGridMailerBuilder;
///
/// let mailer = SendGridMailerBuilder::new("SG.test-key")
///     .base_url("http://localhost:3030")
///     .build()
///     .expect("Failed to create mailer");
/// assert_eq!(mailer.base_url(), "http://localhost:3030");
/// ```
#[derive(Debug)]
pub struct SendGridMailerBuilder {
    api_key: String,
    base_url: Option<String>,
}

impl SendGridMailerBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
        }
    }

    /// Overrides the API host, mostly for pointing at a local stub.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the mailer, validating the key and URL.
    pub fn build(self) -> Result<SendGridMailer, MailError> {
        if self.api_key.trim().is_empty() {
            return Err(MailError::Config("SendGrid API key is empty".to_string()));
        }
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        reqwest::Url::parse(&base_url)
            .map_err(|e| MailError::Config(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(MailError::Network)?;

        Ok(SendGridMailer {
            client,
            api_key: self.api_key,
            base_url,
        })
    }
}

/// Sends mail through SendGrid's `/v3/mail/send` endpoint.
pub struct SendGridMailer {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct MailAddress<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [MailAddress<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: MailAddress<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

impl<'a> From<&'a Email> for SendRequest<'a> {
    fn from(email: &'a Email) -> Self {
        Self {
            personalizations: [Personalization {
                to: [MailAddress {
                    email: &email.to.email,
                    name: &email.to.name,
                }],
            }],
            from: MailAddress {
                email: &email.from.email,
                name: &email.from.name,
            },
            subject: &email.subject,
            content: [Content {
                content_type: "text/plain",
                value: &email.body,
            }],
        }
    }
}

impl SendGridMailer {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Mailer for SendGridMailer {
    fn send(&self, email: &Email) -> Result<(), MailError> {
        let url = format!("{}/v3/mail/send", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&SendRequest::from(email))
            .send()
            .map_err(MailError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(
                "SendGrid error on {:?} email to {}: {} {}",
                email.subject,
                email.to.email,
                status,
                body
            );
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Sent email {:?} to {}", email.subject, email.to.email);
        Ok(())
    }
}
