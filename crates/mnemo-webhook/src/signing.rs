//! HMAC-SHA-256 request signing, per §6.7: `sig = HMAC(secret, ts "." body)`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "X-AWT-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-AWT-Signature";

/// Returns the lowercase-hex HMAC-SHA-256 of `ts "." body` under `secret`.
pub fn sign(secret: &str, timestamp_ms: i64, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{}.{}", timestamp_ms, body).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn signature_header_value(secret: &str, timestamp_ms: i64, body: &str) -> String {
    format!("sha256={}", sign(secret, timestamp_ms, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_64_hex_chars() {
        let value = signature_header_value("s3cr3t", 1_700_000_000_000, "{\"a\":1}");
        let hex_part = value.strip_prefix("sha256=").unwrap();
        assert_eq!(hex_part.len(), 64);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let a = sign("secret", 1000, "body");
        let b = sign("secret", 1000, "body");
        assert_eq!(a, b);
    }

    #[test]
    fn differs_on_body_change() {
        let a = sign("secret", 1000, "body-a");
        let b = sign("secret", 1000, "body-b");
        assert_ne!(a, b);
    }
}
