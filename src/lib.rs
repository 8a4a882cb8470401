pub mod controllers;
pub mod middleware;
pub mod models;
pub mod services;

use actix_web::{HttpResponse, Responder};
use serde_json::json;

pub use controllers::configure_routes;

pub async fn api_info() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "FusionX Booking API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Booking, payment and attendance backend for the FusionX media-arts festival",
        "endpoints": {
            "health": "/health",
            "api_docs": "/api",
            "bookings": "/api/bookings/*",
            "payments": "/api/payments/*",
            "analytics": "/api/analytics/*",
            "admin": "/api/admin/*"
        }
    }))
}
