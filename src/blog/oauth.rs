//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Signature base string:
//! `METHOD & enc(base_url) & enc(sorted "k=v" pairs joined by "&")`
//! where the pairs are the request's query/form parameters plus the
//! `oauth_*` protocol parameters, each percent-encoded per RFC 3986.
//! Signing key: `enc(consumer_secret) & enc(token_secret)`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::RngCore;
use sha1::Sha1;

/// RFC 3986 unreserved characters stay literal
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// 32 hex characters of randomness
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn protocol_params(
    credentials: &OAuthCredentials,
    nonce: &str,
    timestamp: i64,
) -> Vec<(String, String)> {
    vec![
        ("oauth_consumer_key".to_string(), credentials.consumer_key.clone()),
        ("oauth_nonce".to_string(), nonce.to_string()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_token".to_string(), credentials.token.clone()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ]
}

pub fn signature_base_string(
    method: &str,
    base_url: &str,
    params: &[(String, String)],
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(base_url),
        percent_encode(&normalized)
    )
}

pub fn sign(
    credentials: &OAuthCredentials,
    base_string: &str,
) -> Result<String, hmac::digest::InvalidLength> {
    let key = format!(
        "{}&{}",
        percent_encode(&credentials.consumer_secret),
        percent_encode(&credentials.token_secret)
    );

    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// `Authorization` header value for one request.
///
/// `request_params` are the query and form parameters that travel with the
/// request; `base_url` must not carry a query string.
pub fn authorization_header(
    credentials: &OAuthCredentials,
    method: &str,
    base_url: &str,
    request_params: &[(String, String)],
    nonce: &str,
    timestamp: i64,
) -> Result<String, hmac::digest::InvalidLength> {
    let oauth_params = protocol_params(credentials, nonce, timestamp);

    let mut all_params = oauth_params.clone();
    all_params.extend_from_slice(request_params);

    let base_string = signature_base_string(method, base_url, &all_params);
    let signature = sign(credentials, &base_string)?;

    let mut header_params = oauth_params;
    header_params.push(("oauth_signature".to_string(), signature));

    let fields = header_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {}", fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    // OAuth Core 1.0 appendix A example
    fn photos_credentials() -> OAuthCredentials {
        OAuthCredentials {
            consumer_key: "dpf43f3p2l4k3l03".to_string(),
            consumer_secret: "kd94hf93k423kf44".to_string(),
            token: "nnch734d00sl2jdk".to_string(),
            token_secret: "pfkkdhi9sl3r4s00".to_string(),
        }
    }

    fn photos_params() -> Vec<(String, String)> {
        let mut params = protocol_params(&photos_credentials(), "kllo9940pd9333jh", 1191242096);
        params.push(("file".to_string(), "vacation.jpg".to_string()));
        params.push(("size".to_string(), "original".to_string()));
        params
    }

    #[test]
    fn test_base_string() {
        let base = signature_base_string("get", "http://photos.example.net/photos", &photos_params());
        assert_eq!(
            base,
            "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&file%3Dvacation.jpg%26\
             oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3Dkllo9940pd9333jh%26\
             oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1191242096%26\
             oauth_token%3Dnnch734d00sl2jdk%26oauth_version%3D1.0%26size%3Doriginal"
        );
    }

    #[test]
    fn test_known_signature() {
        let base = signature_base_string("GET", "http://photos.example.net/photos", &photos_params());
        let signature = sign(&photos_credentials(), &base).unwrap();
        assert_eq!(signature, "tR3+Ty81lMeYAr/Fid0kMTYa/WM=");
    }

    #[test]
    fn test_percent_encode_reserved() {
        assert_eq!(percent_encode("a b+c/~d"), "a%20b%2Bc%2F~d");
        assert_eq!(percent_encode("Ξ"), "%CE%9E");
    }

    #[test]
    fn test_header_contains_signature() {
        let header = authorization_header(
            &photos_credentials(),
            "POST",
            "https://api.tumblr.com/v2/blog/x.tumblr.com/post",
            &[("type".to_string(), "text".to_string())],
            "nonce",
            1,
        )
        .unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"dpf43f3p2l4k3l03\""));
        assert!(header.contains("oauth_signature=\""));
        assert!(!header.contains("type="));
    }

    #[test]
    fn test_nonce_is_random_hex() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
