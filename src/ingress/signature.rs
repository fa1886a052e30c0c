// src/ingress/signature.rs

//! Webhook signature verification.
//!
//! GitHub sends `X-Hub-Signature-256: sha256=<hex>`; older senders only send
//! `X-Hub-Signature: sha1=<hex>`. Both are HMACs of the raw body keyed with
//! the shared secret.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Scheme prefix of `X-Hub-Signature-256` values.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Scheme prefix of legacy `X-Hub-Signature` values.
pub const SHA1_SIGNATURE_PREFIX: &str = "sha1=";

/// Check `header` (`sha256=<hex>` or `sha1=<hex>`) against the HMAC of `body`.
///
/// The comparison is constant-time. Malformed headers and unknown schemes
/// simply fail.
pub fn verify_signature(secret: &str, body: &[u8], header: &str) -> bool {
    let header = header.trim();
    if let Some(hex_digest) = header.strip_prefix(SIGNATURE_PREFIX) {
        verify_hex::<HmacSha256>(secret, body, hex_digest)
    } else if let Some(hex_digest) = header.strip_prefix(SHA1_SIGNATURE_PREFIX) {
        verify_hex::<HmacSha1>(secret, body, hex_digest)
    } else {
        false
    }
}

fn verify_hex<M: Mac + hmac::digest::KeyInit>(secret: &str, body: &[u8], hex_digest: &str) -> bool {
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = <M as Mac>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    Mac::update(&mut mac, body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the `X-Hub-Signature-256` value a sender would attach for `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Compute the legacy `X-Hub-Signature` value for `body`.
pub fn sign_sha1(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    format!(
        "{SHA1_SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_own_signature() {
        let body = br#"{"ref":"refs/heads/main"}"#;
        let header = sign("s3cret", body);
        assert!(header.starts_with("sha256="));
        assert!(verify_signature("s3cret", body, &header));
    }

    #[test]
    fn known_vector() {
        // HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        let header = "sha256=f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8";
        assert!(verify_signature(
            "key",
            b"The quick brown fox jumps over the lazy dog",
            header
        ));
    }

    #[test]
    fn sha1_known_vector() {
        // HMAC-SHA1("key", "The quick brown fox jumps over the lazy dog")
        let header = "sha1=de7c9b85b8b78aa6bc8a7a36f70a90701c9db4d9";
        assert!(verify_signature(
            "key",
            b"The quick brown fox jumps over the lazy dog",
            header
        ));
        assert_eq!(
            sign_sha1("key", b"The quick brown fox jumps over the lazy dog"),
            header
        );
    }

    #[test]
    fn rejects_wrong_secret_or_body() {
        let header = sign("s3cret", b"payload");
        assert!(!verify_signature("other", b"payload", &header));
        assert!(!verify_signature("s3cret", b"payload2", &header));

        let legacy = sign_sha1("s3cret", b"payload");
        assert!(verify_signature("s3cret", b"payload", &legacy));
        assert!(!verify_signature("other", b"payload", &legacy));
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(!verify_signature("s3cret", b"x", ""));
        assert!(!verify_signature("s3cret", b"x", "md5=abcd"));
        assert!(!verify_signature("s3cret", b"x", "sha256=not-hex"));
        assert!(!verify_signature("s3cret", b"x", "sha256=abcd"));
        assert!(!verify_signature("s3cret", b"x", "sha1=abcd"));
    }
}
