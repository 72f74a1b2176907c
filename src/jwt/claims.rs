use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claim set carried by every access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    /// The client the token was issued to
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl Claims {
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let client_id = client_id.into();
        Claims {
            iss: issuer.into(),
            sub: client_id.clone(),
            aud: client_id,
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Expiry as a timestamp; out-of-range values clamp to the epoch.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// A token is expired from the second named by `exp` onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}
