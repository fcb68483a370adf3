//! HMAC-SHA1 request signing for the Bitcasa dialect.
//!
//! Every API request is authorized by a signature over the request method,
//! path, canonical query string, and date, keyed by the application's
//! client secret:
//!
//! ```text
//! string_to_sign = METHOD & path & canonical_query & date
//! signature      = base64( hmac_sha1( client_secret, string_to_sign ) )
//! Authorization: BCS <client_id>:<signature>
//! ```
//!
//! Canonicalization sorts query parameters so the signature is independent
//! of the order a builder appended them in.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Percent-encode and sort query parameters into the canonical form that
/// both the signature and the request URL use.
pub fn canonical_query(params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| {
            (
                urlencoding::encode(key).into_owned(),
                urlencoding::encode(value).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Assemble the string covered by the signature.
pub fn string_to_sign(method: &str, path: &str, canonical_query: &str, date: &str) -> String {
    format!("{}&{}&{}&{}", method, path, canonical_query, date)
}

/// Sign with HMAC-SHA1 and base64-encode.
pub fn sign(secret: &str, string_to_sign: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(string_to_sign.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// The `Authorization` header value carrying the signature.
pub fn authorization(client_id: &str, signature: &str) -> String {
    format!("BCS {}:{}", client_id, signature)
}

/// RFC 1123 date header value the signature covers.
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_canonical_query_sorts_and_encodes() {
        let canonical = canonical_query(&[
            ("operation", "move"),
            ("access_token", "tok"),
            ("to", "/my docs"),
        ]);
        assert_eq!(canonical, "access_token=tok&operation=move&to=%2Fmy%20docs");
    }

    #[test]
    fn test_signature_is_order_independent() {
        let date = "Thu, 07 Aug 2014 10:00:00 GMT";
        let a = canonical_query(&[("b", "2"), ("a", "1")]);
        let b = canonical_query(&[("a", "1"), ("b", "2")]);
        assert_eq!(a, b);

        let sig_a = sign("secret", &string_to_sign("GET", "/folders/", &a, date));
        let sig_b = sign("secret", &string_to_sign("GET", "/folders/", &b, date));
        assert_eq!(sig_a, sig_b);
    }

    #[test]
    fn test_signature_is_deterministic_and_key_sensitive() {
        let sts = string_to_sign("GET", "/folders/docs", "access_token=t", "date");
        assert_eq!(sign("secret", &sts), sign("secret", &sts));
        assert_ne!(sign("secret", &sts), sign("other-secret", &sts));
        assert_ne!(
            sign("secret", &sts),
            sign("secret", &string_to_sign("POST", "/folders/docs", "access_token=t", "date"))
        );
    }

    #[test]
    fn test_signature_is_standard_base64() {
        let signature = sign("secret", "payload");
        // HMAC-SHA1 digests are 20 bytes -> 28 base64 chars with padding.
        assert_eq!(signature.len(), 28);
        assert!(signature.ends_with('='));
        assert!(signature
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='));
    }

    #[test]
    fn test_authorization_header_shape() {
        let header = authorization("client-1", "c2ln");
        assert_eq!(header, "BCS client-1:c2ln");
    }

    #[test]
    fn test_http_date_format() {
        let date = http_date(Utc.with_ymd_and_hms(2014, 8, 7, 10, 0, 0).unwrap());
        assert_eq!(date, "Thu, 07 Aug 2014 10:00:00 GMT");
    }
}
