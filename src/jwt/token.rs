//! Type-state JWT wrapper.
//!
//! Claims are only reachable on a token whose signature and expiry have
//! both been checked: `Jwt<Unvalidated>` -> `Jwt<SignatureValidated>` ->
//! `Jwt<Validated>`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};

use crate::error::ValidationError;
use crate::jwt::claims::Claims;

/// The only algorithm this service signs with or accepts.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

mod private {
    pub trait Sealed {}
}

/// Marker trait for token validation states
pub trait JwtState: private::Sealed {
    /// Human-readable state name for debugging
    fn state_name() -> &'static str;
}

/// Parsed, nothing verified.
pub struct Unvalidated;
impl private::Sealed for Unvalidated {}
impl JwtState for Unvalidated {
    fn state_name() -> &'static str {
        "Unvalidated"
    }
}

/// Signature verified; expiry not yet checked.
pub struct SignatureValidated {
    claims: Claims,
}
impl private::Sealed for SignatureValidated {}
impl JwtState for SignatureValidated {
    fn state_name() -> &'static str {
        "SignatureValidated"
    }
}

/// Signature and expiry verified.
pub struct Validated {
    claims: Claims,
}
impl private::Sealed for Validated {}
impl JwtState for Validated {
    fn state_name() -> &'static str {
        "Validated"
    }
}

pub struct Jwt<S: JwtState> {
    raw: String,
    header: Header,
    state: S,
}

impl Jwt<Unvalidated> {
    /// Parse the compact serialization and its header.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::Malformed("empty token".to_string()));
        }
        if raw.split('.').count() != 3 {
            return Err(ValidationError::Malformed(
                "expected three dot-separated segments".to_string(),
            ));
        }

        let header = match decode_header(raw) {
            Ok(header) => header,
            // A readable header naming an algorithm we do not implement ("none",
            // "EdDSA" variants, ...) is an algorithm mismatch, not a parse error.
            Err(_) if declared_algorithm(raw).is_some() => {
                return Err(ValidationError::InvalidSignature)
            }
            Err(e) => {
                return Err(ValidationError::Malformed(format!("invalid header: {e}")));
            }
        };

        Ok(Jwt {
            raw: raw.to_string(),
            header,
            state: Unvalidated,
        })
    }

    /// Verify the RS256 signature with `key`.
    ///
    /// Any other header algorithm is rejected before the key is touched.
    pub fn verify_signature(
        self,
        key: &DecodingKey,
    ) -> Result<Jwt<SignatureValidated>, ValidationError> {
        if self.header.alg != SIGNING_ALGORITHM {
            return Err(ValidationError::InvalidSignature);
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Claims>(&self.raw, key, &validation)?;

        Ok(Jwt {
            raw: self.raw,
            header: self.header,
            state: SignatureValidated {
                claims: token_data.claims,
            },
        })
    }
}

impl Jwt<SignatureValidated> {
    /// Reject the token if `now` is at or past `exp`.
    pub fn check_expiry(self, now: DateTime<Utc>) -> Result<Jwt<Validated>, ValidationError> {
        let claims = self.state.claims;

        if claims.is_expired_at(now) {
            return Err(ValidationError::Expired {
                expired_at: claims.expires_at(),
            });
        }

        Ok(Jwt {
            raw: self.raw,
            header: self.header,
            state: Validated { claims },
        })
    }
}

impl Jwt<Validated> {
    pub fn claims(&self) -> &Claims {
        &self.state.claims
    }

    pub fn into_claims(self) -> Claims {
        self.state.claims
    }

    pub fn header(&self) -> &Header {
        &self.header
    }
}

impl<S: JwtState> std::fmt::Debug for Jwt<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwt")
            .field("state", &S::state_name())
            .field("alg", &self.header.alg)
            .field("kid", &self.header.kid)
            .finish_non_exhaustive()
    }
}

/// `alg` as written in the header, if the header is readable JSON at all.
fn declared_algorithm(raw: &str) -> Option<String> {
    let segment = raw.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    let header: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    header.get("alg")?.as_str().map(str::to_string)
}
