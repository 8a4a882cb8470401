use crate::services::auth::{AuthService, ROLE_ADMIN};
use actix_web::{
    dev::Payload, error::ErrorForbidden, error::ErrorUnauthorized, http, Error, FromRequest,
    HttpRequest,
};
use log::warn;
use std::future::Future;
use std::pin::Pin;

/// Extractor for routes behind staff authentication. Accepts a Bearer token
/// in the Authorization header, with a `staff_token` cookie as fallback for
/// the admin dashboard.
#[derive(Clone, Debug)]
pub struct AuthenticatedStaff {
    pub staff_id: String,
    pub email: String,
    pub role: String,
}

impl AuthenticatedStaff {
    pub fn require_admin(&self) -> Result<(), Error> {
        if self.role != ROLE_ADMIN {
            warn!(
                "🚫 {} with role {} attempted an admin-only action",
                self.staff_id, self.role
            );
            return Err(ErrorForbidden("Admin role required"));
        }
        Ok(())
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get(http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn cookie_token(req: &HttpRequest) -> Option<String> {
    let cookie = req.cookie("staff_token")?;
    let token = cookie.value().trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

impl FromRequest for AuthenticatedStaff {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>> + 'static>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let token = match bearer_token(&req).or_else(|| cookie_token(&req)) {
                Some(token) => token,
                None => {
                    warn!("❌ Unauthenticated request to {}", req.path());
                    return Err(ErrorUnauthorized("Authentication required"));
                }
            };

            match AuthService::verify_token(&token) {
                Ok(claims) => Ok(AuthenticatedStaff {
                    staff_id: claims.sub,
                    email: claims.email,
                    role: claims.role,
                }),
                Err(e) => {
                    warn!("Token verification failed for {}: {}", req.path(), e);
                    Err(ErrorUnauthorized("Invalid or expired token"))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::ROLE_VALIDATOR;

    #[test]
    fn validator_cannot_pass_admin_gate() {
        let staff = AuthenticatedStaff {
            staff_id: "door-3".to_string(),
            email: "door@fusionx.events".to_string(),
            role: ROLE_VALIDATOR.to_string(),
        };
        assert!(staff.require_admin().is_err());
    }

    #[test]
    fn admin_passes_admin_gate() {
        let staff = AuthenticatedStaff {
            staff_id: "ops-1".to_string(),
            email: "ops@fusionx.events".to_string(),
            role: ROLE_ADMIN.to_string(),
        };
        assert!(staff.require_admin().is_ok());
    }
}
