use crate::models::Booking;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

pub mod providers;
pub mod templates;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRequest {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
    pub from: String,
    pub from_name: Option<String>,
}

#[async_trait::async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_email(&self, request: EmailRequest) -> Result<String>; // Returns message ID
    async fn health_check(&self) -> Result<bool>;
    fn provider_name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct EmailService {
    provider: Arc<dyn EmailProvider>,
    template_renderer: templates::TemplateRenderer,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("provider", &self.provider.provider_name())
            .field("template_renderer", &self.template_renderer)
            .finish()
    }
}

impl EmailService {
    pub async fn new() -> Result<Self> {
        let provider = Self::create_provider().await?;
        let template_renderer = templates::TemplateRenderer::new()?;

        Ok(Self {
            provider,
            template_renderer,
        })
    }

    pub async fn global() -> Result<Arc<Self>> {
        static EMAIL_GLOBAL: OnceLock<Arc<EmailService>> = OnceLock::new();
        if let Some(svc) = EMAIL_GLOBAL.get() {
            return Ok(svc.clone());
        }
        let created = Arc::new(EmailService::new().await?);
        let _ = EMAIL_GLOBAL.set(created.clone());
        Ok(created)
    }

    async fn create_provider() -> Result<Arc<dyn EmailProvider>> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        match env.as_str() {
            "production" => {
                log::info!("🚀 Initializing SendGrid email provider for production");
                Ok(Arc::new(providers::SendGridProvider::new().await?))
            }
            _ => {
                log::info!("🛠️ Initializing SMTP email provider for development");
                Ok(Arc::new(providers::SmtpProvider::new().await?))
            }
        }
    }

    fn from_address() -> String {
        std::env::var("EMAIL_FROM").unwrap_or_else(|_| "bookings@fusionx.events".to_string())
    }

    pub async fn send_booking_confirmation(
        &self,
        booking: &Booking,
        ticket_url: Option<&str>,
    ) -> Result<()> {
        let mut context = HashMap::new();
        context.insert("app_name", "FusionX".to_string());
        context.insert("contact_name", booking.contact_name.clone());
        context.insert("event_title", booking.event_title.clone());
        context.insert("booking_code", booking.code.clone());
        context.insert("selected_date", booking.selected_date.clone());
        context.insert("selected_time", booking.selected_time.clone());
        context.insert("price_tier", booking.price_tier.clone());
        context.insert("member_count", booking.members.0.len().to_string());
        context.insert("total_amount", format!("₹{}", booking.total_amount));
        if let Some(url) = ticket_url {
            context.insert("ticket_url", url.to_string());
        }

        let html_body = self.template_renderer.render("booking_confirmation", &context)?;
        let text_body = format!(
            "Hi {},\n\nYour booking for {} is confirmed.\nBooking code: {}\nDate: {} {}\nParty size: {}\n\nSee you there,\nFusionX Team",
            booking.contact_name,
            booking.event_title,
            booking.code,
            booking.selected_date,
            booking.selected_time,
            booking.members.0.len(),
        );

        let request = EmailRequest {
            to: booking.contact_email.clone(),
            to_name: Some(booking.contact_name.clone()),
            subject: format!("Booking Confirmed: {} ({})", booking.event_title, booking.code),
            html_body,
            text_body: Some(text_body),
            from: Self::from_address(),
            from_name: Some("FusionX".to_string()),
        };

        let message_id = self.provider.as_ref().send_email(request).await?;
        log::info!(
            "✅ Confirmation email sent to {} for booking {}: {}",
            booking.contact_email, booking.code, message_id
        );

        Ok(())
    }

    pub async fn send_payment_failed(&self, booking: &Booking, _reason: &str) -> Result<()> {
        let mut context = HashMap::new();
        context.insert("app_name", "FusionX".to_string());
        context.insert("contact_name", booking.contact_name.clone());
        context.insert("event_title", booking.event_title.clone());
        context.insert("booking_code", booking.code.clone());

        let html_body = self.template_renderer.render("payment_failed", &context)?;
        let text_body = format!(
            "Hi {},\n\nWe couldn't confirm the payment for booking {}. Your seats are still held and you can retry the payment.\n\nFusionX Team",
            booking.contact_name, booking.code,
        );

        let request = EmailRequest {
            to: booking.contact_email.clone(),
            to_name: Some(booking.contact_name.clone()),
            subject: format!("Payment Failed for Booking {}", booking.code),
            html_body,
            text_body: Some(text_body),
            from: Self::from_address(),
            from_name: Some("FusionX".to_string()),
        };

        let message_id = self.provider.as_ref().send_email(request).await?;
        log::info!(
            "📧 Payment-failed notice sent to {} for booking {}: {}",
            booking.contact_email, booking.code, message_id
        );

        Ok(())
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.provider.health_check().await
    }
}
