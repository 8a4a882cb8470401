use crate::models::{Booking, FusionXEvent, LogEntry, Payment, TransactionLog};
use crate::services::email::EmailService;
use crate::services::paygate::PaymentGateway;
use crate::services::ClientMeta;
use crate::services::storage::StorageService;
use crate::services::tickets::TicketRenderer;
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Booking not found")]
    BookingNotFound,
    #[error("No payment order found for this booking")]
    PaymentNotFound,
    #[error("Booking has already been paid for")]
    AlreadyPaid,
    #[error("Booking amount is not chargeable: {0}")]
    InvalidAmount(String),
    #[error("Payment signature verification failed")]
    SignatureMismatch,
    #[error("Payment gateway error: {0}")]
    Gateway(#[source] anyhow::Error),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub booking_code: String,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub booking_code: String,
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub booking_code: String,
    pub booking_status: String,
    pub payment_status: String,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Clone)]
pub struct PaymentService {
    gateway: PaymentGateway,
}

impl PaymentService {
    pub fn new(gateway: PaymentGateway) -> Self {
        Self { gateway }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(PaymentGateway::from_env()?))
    }

    pub fn key_id(&self) -> &str {
        self.gateway.key_id()
    }

    /// Converts a rupee-denominated booking total to the smallest currency
    /// unit the gateway charges in.
    fn to_smallest_unit(amount: &BigDecimal) -> Result<i64, PaymentError> {
        (amount * BigDecimal::from(100))
            .to_i64()
            .filter(|n| *n >= 0)
            .ok_or_else(|| PaymentError::InvalidAmount(amount.to_string()))
    }

    pub async fn create_order(
        &self,
        pool: &PgPool,
        booking_code: &str,
        meta: ClientMeta,
    ) -> Result<CreateOrderResponse, PaymentError> {
        let booking = Booking::find_by_code(pool, booking_code)
            .await?
            .ok_or(PaymentError::BookingNotFound)?;

        if booking.payment_status == "paid" {
            return Err(PaymentError::AlreadyPaid);
        }

        let amount = Self::to_smallest_unit(&booking.total_amount)?;
        let currency = "INR";

        let order = self
            .gateway
            .create_order(amount, currency, &booking.code)
            .await
            .map_err(PaymentError::Gateway)?;

        let payment = Payment::create(pool, booking.id, &order.id, amount, currency).await?;

        TransactionLog::record(
            pool,
            booking.id,
            "order_created",
            "pending",
            LogEntry {
                event_id: Some(booking.event_id),
                gateway_order_id: Some(order.id.clone()),
                amount: Some(amount),
                currency: Some(currency.to_string()),
                user_agent: meta.user_agent,
                ip_address: meta.ip_address,
                ..Default::default()
            },
        )
        .await?;

        log::info!(
            "💳 Payment order {} created for booking {} ({} {})",
            order.id, booking.code, amount, currency
        );

        Ok(CreateOrderResponse {
            booking_code: booking.code,
            gateway_order_id: payment.gateway_order_id,
            amount,
            currency: currency.to_string(),
            key_id: self.gateway.key_id().to_string(),
        })
    }

    /// Verifies the gateway callback signature and, on success, promotes the
    /// booking to a confirmed sale. A signature mismatch marks only the
    /// payment attempt as failed and leaves the booking unchanged, so the
    /// buyer can retry.
    pub async fn verify_payment(
        &self,
        pool: &PgPool,
        req: &VerifyPaymentRequest,
        meta: ClientMeta,
    ) -> Result<Booking, PaymentError> {
        let payment = Payment::find_by_order_id(pool, &req.gateway_order_id)
            .await?
            .ok_or(PaymentError::PaymentNotFound)?;

        let booking = Booking::find_by_id(pool, payment.booking_id)
            .await?
            .ok_or(PaymentError::BookingNotFound)?;

        if booking.payment_status == "paid" {
            return Err(PaymentError::AlreadyPaid);
        }

        let signature_ok = self.gateway.verify_signature(
            &req.gateway_order_id,
            &req.gateway_payment_id,
            &req.gateway_signature,
        );

        if !signature_ok {
            log::warn!(
                "🚫 Signature mismatch on order {} (booking {})",
                req.gateway_order_id, booking.code
            );

            payment.mark_failed(pool, "signature verification failed").await?;

            TransactionLog::record(
                pool,
                booking.id,
                "payment_failed",
                "failed",
                LogEntry {
                    event_id: Some(booking.event_id),
                    gateway_order_id: Some(req.gateway_order_id.clone()),
                    gateway_payment_id: Some(req.gateway_payment_id.clone()),
                    gateway_signature: Some(req.gateway_signature.clone()),
                    amount: Some(payment.amount),
                    currency: Some(payment.currency.clone()),
                    failure_reason: Some("signature verification failed".to_string()),
                    user_agent: meta.user_agent,
                    ip_address: meta.ip_address,
                    ..Default::default()
                },
            )
            .await?;

            self.dispatch_failure_notice(booking.clone());

            return Err(PaymentError::SignatureMismatch);
        }

        payment
            .mark_completed(pool, &req.gateway_payment_id, &req.gateway_signature)
            .await?;

        let booking = booking.mark_paid_and_confirmed(pool).await?;

        TransactionLog::record(
            pool,
            booking.id,
            "payment_success",
            "completed",
            LogEntry {
                event_id: Some(booking.event_id),
                gateway_order_id: Some(req.gateway_order_id.clone()),
                gateway_payment_id: Some(req.gateway_payment_id.clone()),
                gateway_signature: Some(req.gateway_signature.clone()),
                amount: Some(payment.amount),
                currency: Some(payment.currency.clone()),
                user_agent: meta.user_agent,
                ip_address: meta.ip_address,
                ..Default::default()
            },
        )
        .await?;

        log::info!(
            "✅ Payment verified for booking {} (order {})",
            booking.code, req.gateway_order_id
        );

        // Demand-based price adjustment happens after each confirmed sale.
        if let Some(event) = FusionXEvent::find_by_id(pool, booking.event_id).await? {
            if let Err(e) = event.apply_dynamic_pricing(pool).await {
                log::warn!("Failed to reprice event {}: {}", event.id, e);
            }
        }

        self.dispatch_confirmation(pool.clone(), booking.clone());

        Ok(booking)
    }

    pub async fn get_status(
        &self,
        pool: &PgPool,
        booking_code: &str,
    ) -> Result<PaymentStatusResponse, PaymentError> {
        let booking = Booking::find_by_code(pool, booking_code)
            .await?
            .ok_or(PaymentError::BookingNotFound)?;

        Self::status_for(pool, booking).await
    }

    pub async fn get_status_by_order(
        &self,
        pool: &PgPool,
        gateway_order_id: &str,
    ) -> Result<PaymentStatusResponse, PaymentError> {
        let payment = Payment::find_by_order_id(pool, gateway_order_id)
            .await?
            .ok_or(PaymentError::PaymentNotFound)?;

        let booking = Booking::find_by_id(pool, payment.booking_id)
            .await?
            .ok_or(PaymentError::BookingNotFound)?;

        Self::status_for(pool, booking).await
    }

    async fn status_for(
        pool: &PgPool,
        booking: Booking,
    ) -> Result<PaymentStatusResponse, PaymentError> {
        let payment = Payment::latest_for_booking(pool, booking.id).await?;

        Ok(PaymentStatusResponse {
            booking_code: booking.code,
            booking_status: booking.status,
            payment_status: booking.payment_status,
            gateway_order_id: payment.as_ref().map(|p| p.gateway_order_id.clone()),
            gateway_payment_id: payment.as_ref().and_then(|p| p.gateway_payment_id.clone()),
            amount: payment.as_ref().map(|p| p.amount),
            currency: payment.as_ref().map(|p| p.currency.clone()),
            completed_at: payment.as_ref().and_then(|p| p.completed_at),
        })
    }

    /// Ticket rendering, storage upload and the confirmation email run on a
    /// detached task. The verify response never waits on them and their
    /// failures never roll back a captured payment.
    fn dispatch_confirmation(&self, pool: PgPool, booking: Booking) {
        tokio::spawn(async move {
            let ticket_url = match Self::render_and_store_tickets(&booking).await {
                Ok(url) => url,
                Err(e) => {
                    log::error!(
                        "Failed to prepare tickets for booking {}: {}",
                        booking.code, e
                    );
                    None
                }
            };

            match EmailService::global().await {
                Ok(email) => {
                    match email
                        .send_booking_confirmation(&booking, ticket_url.as_deref())
                        .await
                    {
                        Ok(()) => {
                            if let Err(e) = booking.set_email_sent(&pool).await {
                                log::error!(
                                    "Confirmation sent but email_sent flag not persisted for {}: {}",
                                    booking.code, e
                                );
                            }
                        }
                        Err(e) => log::error!(
                            "Failed to send confirmation email for booking {}: {}",
                            booking.code, e
                        ),
                    }
                }
                Err(e) => log::error!("Email service unavailable: {}", e),
            }
        });
    }

    fn dispatch_failure_notice(&self, booking: Booking) {
        tokio::spawn(async move {
            match EmailService::global().await {
                Ok(email) => {
                    if let Err(e) = email
                        .send_payment_failed(&booking, "signature verification failed")
                        .await
                    {
                        log::error!(
                            "Failed to send payment-failed notice for booking {}: {}",
                            booking.code, e
                        );
                    }
                }
                Err(e) => log::error!("Email service unavailable: {}", e),
            }
        });
    }

    async fn render_and_store_tickets(booking: &Booking) -> anyhow::Result<Option<String>> {
        let html = TicketRenderer::new().render_booking_tickets(booking)?;

        match StorageService::new() {
            Ok(storage) => {
                let path = format!("bookings/{}/tickets.html", booking.code);
                let url = storage.upload_tickets(&path, html).await?;
                Ok(Some(url))
            }
            Err(e) => {
                // Deployments without a storage bucket still get the email.
                log::warn!("Ticket storage not configured, skipping upload: {}", e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn converts_rupees_to_smallest_unit() {
        let amount = BigDecimal::from_str("499.50").unwrap();
        assert_eq!(PaymentService::to_smallest_unit(&amount).unwrap(), 49950);
    }

    #[test]
    fn whole_rupee_amounts_convert_exactly() {
        let amount = BigDecimal::from(1200);
        assert_eq!(PaymentService::to_smallest_unit(&amount).unwrap(), 120000);
    }

    #[test]
    fn zero_amount_is_chargeable() {
        let amount = BigDecimal::from(0);
        assert_eq!(PaymentService::to_smallest_unit(&amount).unwrap(), 0);
    }

    #[test]
    fn negative_amount_is_rejected() {
        let amount = BigDecimal::from(-1);
        assert!(matches!(
            PaymentService::to_smallest_unit(&amount),
            Err(PaymentError::InvalidAmount(_))
        ));
    }
}
