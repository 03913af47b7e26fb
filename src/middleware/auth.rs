use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError};

pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPER_ADMIN: &str = "super_admin";

/// Identity resolved once at the boundary and threaded into every downstream
/// call; handlers never look roles up again.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN || self.role == ROLE_SUPER_ADMIN
    }
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthenticated)?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthenticated)?;

        if !auth_str.starts_with("Bearer ") {
            return Err(AppError::Unauthenticated);
        }
        let token = auth_str.trim_start_matches("Bearer ").trim();

        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthenticated)?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::Unauthenticated)?;

        Ok(AuthUser {
            user_id,
            role: decoded.claims.role.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_is_rejected_from_admin_gate() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: ROLE_CUSTOMER.into(),
        };
        assert!(matches!(ensure_admin(&user), Err(AppError::Forbidden)));
    }

    #[test]
    fn admin_roles_pass_admin_gate() {
        for role in [ROLE_ADMIN, ROLE_SUPER_ADMIN] {
            let user = AuthUser {
                user_id: Uuid::new_v4(),
                role: role.into(),
            };
            assert!(ensure_admin(&user).is_ok());
        }
    }
}
