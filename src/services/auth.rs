// Staff token issuance and verification. There is no public signup: admin
// and door-validator accounts are provisioned out of band and identified by
// the role carried in the token.

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::env;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_VALIDATOR: &str = "validator";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // staff identifier
    pub email: String,
    pub role: String, // "admin" or "validator"
    pub exp: i64,     // Expiration
    pub iat: i64,     // Issued at
}

pub struct AuthService;

impl AuthService {
    pub fn generate_token(staff_id: &str, email: &str, role: &str) -> Result<String> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| anyhow!("JWT_SECRET not set"))?;

        let now = Utc::now().timestamp();
        let expiration = Utc::now()
            .checked_add_signed(Duration::hours(24))
            .ok_or_else(|| anyhow!("Invalid timestamp calculation"))?
            .timestamp();

        let claims = Claims {
            sub: staff_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            exp: expiration,
            iat: now,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(jwt_secret.as_bytes()),
        )?;

        debug!("🎫 Token issued for {} with role {}", staff_id, role);

        Ok(token)
    }

    pub fn verify_token(token: &str) -> Result<Claims> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| anyhow!("JWT_SECRET not set"))?;

        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 60;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(jwt_secret.as_bytes()),
            &validation,
        )?;

        if token_data.claims.role != ROLE_ADMIN && token_data.claims.role != ROLE_VALIDATOR {
            warn!("❌ Token with unknown role: {}", token_data.claims.role);
            return Err(anyhow!("Unknown staff role"));
        }

        debug!("✅ Token verified for {}", token_data.claims.sub);

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secret<T>(f: impl FnOnce() -> T) -> T {
        std::env::set_var("JWT_SECRET", "test-secret-for-auth-tests");
        f()
    }

    #[test]
    fn issued_token_round_trips() {
        with_secret(|| {
            let token =
                AuthService::generate_token("staff-1", "door@fusionx.events", ROLE_VALIDATOR)
                    .unwrap();
            let claims = AuthService::verify_token(&token).unwrap();
            assert_eq!(claims.sub, "staff-1");
            assert_eq!(claims.email, "door@fusionx.events");
            assert_eq!(claims.role, ROLE_VALIDATOR);
            assert!(claims.exp > claims.iat);
        });
    }

    #[test]
    fn tampered_token_is_rejected() {
        with_secret(|| {
            let token =
                AuthService::generate_token("staff-1", "ops@fusionx.events", ROLE_ADMIN).unwrap();
            let mut tampered = token.clone();
            tampered.pop();
            tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
            assert!(AuthService::verify_token(&tampered).is_err());
        });
    }

    #[test]
    fn unknown_role_is_rejected() {
        with_secret(|| {
            let token =
                AuthService::generate_token("staff-2", "x@fusionx.events", "superuser").unwrap();
            assert!(AuthService::verify_token(&token).is_err());
        });
    }
}
