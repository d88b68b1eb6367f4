//! Session tokens and secret hashing.
//!
//! Session tokens have the form `<user_id>.<expires_unix>.<hmac hex>`, where
//! the HMAC-SHA256 is computed over `<user_id>.<expires_unix>` with the
//! configured session secret. Passwords and PINs are stored as
//! `<salt hex>$<sha256(salt || secret) hex>`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "quocbank_session";

/// Claims recovered from a verified session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

fn mac_for(secret: &str, payload: &str) -> HmacSha256 {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    mac
}

/// Issue a signed session token for `user_id` valid for `ttl`.
pub fn issue_token(secret: &str, user_id: Uuid, ttl: Duration) -> (String, DateTime<Utc>) {
    let expires_at = Utc::now() + ttl;
    let payload = format!("{}.{}", user_id, expires_at.timestamp());
    let signature = hex::encode(mac_for(secret, &payload).finalize().into_bytes());

    (format!("{payload}.{signature}"), expires_at)
}

/// Verify a session token's signature and expiry.
///
/// Returns `None` for anything malformed, forged or expired.
pub fn verify_token(secret: &str, token: &str, now: DateTime<Utc>) -> Option<SessionClaims> {
    let (payload, signature) = token.rsplit_once('.')?;
    let (user_id, expires) = payload.split_once('.')?;

    let signature = hex::decode(signature).ok()?;
    mac_for(secret, payload).verify_slice(&signature).ok()?;

    let user_id = Uuid::parse_str(user_id).ok()?;
    let expires_at = Utc.timestamp_opt(expires.parse().ok()?, 0).single()?;

    if expires_at <= now {
        return None;
    }

    Some(SessionClaims {
        user_id,
        expires_at,
    })
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, max_age: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        max_age.num_seconds()
    )
}

/// `Set-Cookie` value that clears the session.
pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

/// Find the session token in a `Cookie` header value.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

fn digest(salt: &[u8], secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password or PIN with a fresh random salt.
pub fn hash_secret(secret: &str) -> String {
    let salt: [u8; 16] = rand::random();
    format!("{}${}", hex::encode(salt), digest(&salt, secret))
}

/// Check a password or PIN against a stored hash.
pub fn verify_secret(secret: &str, stored: &str) -> bool {
    let Some((salt_hex, expected)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };

    let actual = digest(&salt, secret);
    // compare every byte so timing does not leak the matching prefix
    actual.len() == expected.len()
        && actual
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
