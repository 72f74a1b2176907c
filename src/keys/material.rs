//! RSA signing key held in process memory.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{encode, DecodingKey, EncodingKey, Header};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use std::path::Path;
use zeroize::Zeroizing;

use crate::error::KeyError;
use crate::jwt::{Claims, SIGNING_ALGORITHM};
use crate::keys::jwks::{rsa_thumbprint, Jwk};
use crate::keys::TokenSigner;

/// The service's single RS256 key pair.
///
/// The private half is only ever used through [`EncodingKey`]; nothing on this
/// type serializes it.
pub struct RsaKeyMaterial {
    key_id: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_key: RsaPublicKey,
}

impl RsaKeyMaterial {
    /// Load from a PEM private key, PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8
    /// (`PRIVATE KEY`).
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::KeyLoad`] if the input is not an RSA private key.
    pub fn from_pem(pem: &[u8]) -> Result<Self, KeyError> {
        let pem = std::str::from_utf8(pem)
            .map_err(|e| KeyError::KeyLoad(format!("key is not PEM text: {e}")))?;

        let private_key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| KeyError::KeyLoad(format!("unable to parse RSA private key: {e}")))?;

        Self::from_private_key(&private_key)
    }

    /// Load from a PEM file; the file contents are zeroized once parsed.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::KeyLoad`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let path = path.as_ref();
        let pem = Zeroizing::new(std::fs::read(path).map_err(|e| {
            KeyError::KeyLoad(format!("unable to read key file {}: {e}", path.display()))
        })?);

        Self::from_pem(&pem)
    }

    fn from_private_key(private_key: &RsaPrivateKey) -> Result<Self, KeyError> {
        let der = private_key
            .to_pkcs1_der()
            .map_err(|e| KeyError::KeyLoad(format!("unable to encode private key: {e}")))?;
        let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());

        let public_key = RsaPublicKey::from(private_key);
        let public_pem = encode_public_pem(&public_key)?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| KeyError::Encoding(e.to_string()))?;

        let (n, e) = public_components(&public_key);
        let key_id = rsa_thumbprint(&n, &e);

        Ok(Self {
            key_id,
            encoding_key,
            decoding_key,
            public_key,
        })
    }
}

impl TokenSigner for RsaKeyMaterial {
    fn sign(&self, claims: &Claims) -> Result<String, KeyError> {
        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(self.key_id.clone());

        encode(&header, claims, &self.encoding_key).map_err(|e| KeyError::Signing(e.to_string()))
    }

    fn public_key_pem(&self) -> Result<Vec<u8>, KeyError> {
        encode_public_pem(&self.public_key).map(String::into_bytes)
    }

    fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    fn jwk(&self) -> Jwk {
        let (n, e) = public_components(&self.public_key);
        Jwk::rsa(self.key_id.clone(), n, e)
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl fmt::Debug for RsaKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyMaterial")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// SubjectPublicKeyInfo PEM (`PUBLIC KEY` block).
fn encode_public_pem(public_key: &RsaPublicKey) -> Result<String, KeyError> {
    public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeyError::Encoding(format!("error encoding public key: {e}")))
}

fn public_components(public_key: &RsaPublicKey) -> (String, String) {
    let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
    (n, e)
}
