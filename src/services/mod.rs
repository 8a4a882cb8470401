pub mod analytics;
pub mod auth;
pub mod checkin;
pub mod email;
pub mod paygate;
pub mod payments;
pub mod storage;
pub mod tickets;

pub use analytics::AnalyticsService;
pub use auth::AuthService;
pub use checkin::CheckInService;
pub use email::EmailService;
pub use paygate::PaymentGateway;
pub use payments::PaymentService;
pub use storage::StorageService;
pub use tickets::TicketRenderer;

/// Request metadata recorded alongside payment and check-in activity.
#[derive(Debug, Default, Clone)]
pub struct ClientMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}
