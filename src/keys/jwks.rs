//! Public key distribution in JWK form (RFC 7517).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub alg: String,
    /// RSA modulus, base64url
    pub n: String,
    /// RSA exponent, base64url
    pub e: String,
}

impl Jwk {
    /// RSA signing key in RS256 form.
    pub fn rsa(kid: impl Into<String>, n: String, e: String) -> Self {
        Jwk {
            kty: "RSA".to_string(),
            kid: kid.into(),
            key_use: "sig".to_string(),
            alg: "RS256".to_string(),
            n,
            e,
        }
    }
}

/// Thumbprint of an RSA public key given as base64url `n` and `e`.
///
/// Members are serialized in lexicographic order with no whitespace.
pub fn rsa_thumbprint(n: &str, e: &str) -> String {
    let canonical = format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#);
    let hash = Sha256::digest(canonical.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    pub fn single(key: Jwk) -> Self {
        Jwks { keys: vec![key] }
    }

    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc7638_example_thumbprint() {
        // Example key from RFC 7638 section 3.1.
        let n = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";
        let e = "AQAB";

        assert_eq!(
            rsa_thumbprint(n, e),
            "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs"
        );
    }

    #[test]
    fn test_jwks_serialization() {
        let jwks = Jwks::single(Jwk::rsa("key-1", "test-n".to_string(), "AQAB".to_string()));
        let json: serde_json::Value = serde_json::to_value(&jwks).unwrap();

        assert_eq!(json["keys"][0]["kid"], "key-1");
        assert_eq!(json["keys"][0]["use"], "sig");
        assert_eq!(json["keys"][0]["alg"], "RS256");
        assert_eq!(json["keys"][0]["kty"], "RSA");
    }

    #[test]
    fn test_find_by_kid() {
        let jwks = Jwks::single(Jwk::rsa("key-1", "n".to_string(), "AQAB".to_string()));
        assert!(jwks.find("key-1").is_some());
        assert!(jwks.find("key-2").is_none());
    }
}
