pub mod admin;
pub mod analytics;
pub mod attendance;
pub mod booking;
pub mod payment;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    booking::configure(cfg);
    payment::configure(cfg);
    analytics::configure(cfg);
    attendance::configure(cfg);
    admin::configure(cfg);
}
