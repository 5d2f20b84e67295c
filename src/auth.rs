// src/auth.rs
//! Токен администратора. Шлюз токен не проверяет: он только находит его
//! во входящем запросе и пробрасывает бэкенду, проверку делает бэкенд.

use actix_web::http::header::Header;
use actix_web::HttpRequest;
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};

use crate::error::{ApiError, ApiResult};

pub const TOKEN_COOKIE: &str = "access_token";

// ======== TOKEN EXTRACTION ========

/// `Authorization: Bearer <token>`, иначе cookie `access_token`
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    if let Ok(auth) = Authorization::<Bearer>::parse(req) {
        let token = auth.into_scheme().token().trim().to_string();
        if !token.is_empty() {
            return Some(token);
        }
    }

    req.cookie(TOKEN_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
}

pub fn require_token(req: &HttpRequest) -> ApiResult<String> {
    extract_token(req).ok_or_else(|| {
        log::debug!("Rejected {} {}: no bearer token", req.method(), req.path());
        ApiError::missing_token()
    })
}
