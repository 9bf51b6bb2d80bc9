use axum::{
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{models::CurrentUser, AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    // user id issued by the identity provider
    pub sub: String,
    // expiry (unix timestamp seconds)
    pub exp: usize,
}

/// `Authorization: Bearer <token>`, scheme matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    let mut it = raw.split_whitespace();
    let scheme = it.next()?;
    let token = it.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.to_string())
}

pub fn verify_token(secret: &str, token: &str) -> Option<CurrentUser> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()?;

    let sub = data.claims.sub.trim();
    if sub.is_empty() {
        return None;
    }
    Some(CurrentUser { id: sub.to_string() })
}

pub async fn inject_current_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(req.headers()) {
        if let Some(user) = verify_token(&state.settings.jwt_secret, &token) {
            // handlers pick this up as Option<Extension<CurrentUser>>
            req.extensions_mut().insert(user);
        }
    }

    next.run(req).await
}
