use super::{EmailProvider, EmailRequest};
use anyhow::{anyhow, Result};
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reqwest::Client;
use serde_json::json;
use std::env;

pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpProvider {
    pub async fn new() -> Result<Self> {
        let host = env::var("SMTP_HOST").map_err(|_| anyhow!("SMTP_HOST not set"))?;
        let username = env::var("SMTP_USERNAME").map_err(|_| anyhow!("SMTP_USERNAME not set"))?;
        let password = env::var("SMTP_PASSWORD").map_err(|_| anyhow!("SMTP_PASSWORD not set"))?;
        let port: u16 = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .map_err(|_| anyhow!("SMTP_PORT must be a number"))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)?
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();

        log::info!("✅ SMTP provider initialized ({}:{})", host, port);

        Ok(Self { transport })
    }
}

#[async_trait::async_trait]
impl EmailProvider for SmtpProvider {
    async fn send_email(&self, request: EmailRequest) -> Result<String> {
        let from: Mailbox = match request.from_name {
            Some(ref name) => format!("{} <{}>", name, request.from).parse()?,
            None => request.from.parse()?,
        };
        let to: Mailbox = match request.to_name {
            Some(ref name) => format!("{} <{}>", name, request.to).parse()?,
            None => request.to.parse()?,
        };

        let text_body = request
            .text_body
            .unwrap_or_else(|| "Please view this email in HTML format.".to_string());

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(&request.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(request.html_body),
                    ),
            )?;

        let response = self.transport.send(message).await?;
        let message_id = response
            .message()
            .next()
            .unwrap_or("accepted")
            .to_string();
        Ok(message_id)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.transport.test_connection().await?)
    }

    fn provider_name(&self) -> &'static str {
        "SMTP"
    }
}

#[derive(Debug)]
pub struct SendGridProvider {
    client: Client,
    api_key: String,
}

impl SendGridProvider {
    pub async fn new() -> Result<Self> {
        let api_key =
            env::var("SENDGRID_API_KEY").map_err(|_| anyhow!("SENDGRID_API_KEY not set"))?;

        let client = Client::new();

        // Test the API key
        let test_response = client
            .get("https://api.sendgrid.com/v3/user/account")
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await?;

        if !test_response.status().is_success() {
            return Err(anyhow!("SendGrid API key validation failed"));
        }

        log::info!("✅ SendGrid provider initialized successfully");

        Ok(Self { client, api_key })
    }
}

#[async_trait::async_trait]
impl EmailProvider for SendGridProvider {
    async fn send_email(&self, request: EmailRequest) -> Result<String> {
        let payload = json!({
            "personalizations": [{
                "to": [{
                    "email": request.to,
                    "name": request.to_name.unwrap_or_default()
                }]
            }],
            "from": {
                "email": request.from,
                "name": request.from_name.unwrap_or_else(|| "FusionX".to_string())
            },
            "subject": request.subject,
            "content": [
                {
                    "type": "text/plain",
                    "value": request.text_body.unwrap_or_else(|| "Please view this email in HTML format.".to_string())
                },
                {
                    "type": "text/html",
                    "value": request.html_body
                }
            ]
        });

        let response = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            // SendGrid returns the message ID in the X-Message-Id header
            let message_id = response
                .headers()
                .get("X-Message-Id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();

            Ok(message_id)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(anyhow!("SendGrid API error: {}", error_text))
        }
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get("https://api.sendgrid.com/v3/user/account")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        Ok(response.status().is_success())
    }

    fn provider_name(&self) -> &'static str {
        "SendGrid"
    }
}
