use {
    base64::{Engine, engine::general_purpose::STANDARD},
    hmac::{Hmac, Mac},
    secrecy::{ExposeSecret, Secret},
    sha2::Sha256,
    subtle::ConstantTimeEq,
    tracing::debug,
};

type HmacSha256 = Hmac<Sha256>;

/// Constant-time string comparison.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Check the `Authorization: HMAC <base64>` header of a Teams outgoing
/// webhook request.
///
/// The MAC is HMAC-SHA256 over the raw body keyed with the webhook's security
/// token (base64-decoded; the raw bytes are used if it is not valid base64).
/// With no token configured every request is accepted.
pub fn verify_webhook_signature(
    security_token: Option<&Secret<String>>,
    body: &[u8],
    authorization: Option<&str>,
) -> bool {
    let Some(token) = security_token else {
        return true;
    };
    let Some(provided) = authorization.and_then(|h| h.strip_prefix("HMAC ")) else {
        debug!("webhook request without HMAC authorization");
        return false;
    };
    let Ok(provided) = STANDARD.decode(provided.trim()) else {
        return false;
    };

    let secret = token.expose_secret();
    let key = STANDARD
        .decode(secret)
        .unwrap_or_else(|_| secret.as_bytes().to_vec());
    let Ok(mut mac) = HmacSha256::new_from_slice(&key) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();
    expected.as_slice().ct_eq(&provided).into()
}
