#![forbid(unsafe_code)]

//! Public key material produced by key resolution.

use ekeby_core::Error;
use ekeby_crypto::SigningKey;

/// A verification key.
#[derive(Clone)]
pub enum PublicKey {
    Rsa(rsa::RsaPublicKey),
    Dsa(dsa::VerifyingKey),
    EcP256(p256::ecdsa::VerifyingKey),
    EcP384(p384::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Decode a DER `SubjectPublicKeyInfo`.
    pub fn from_spki_der(spki_der: &[u8]) -> Result<Self, Error> {
        use spki::DecodePublicKey;

        if let Ok(pk) = rsa::RsaPublicKey::from_public_key_der(spki_der) {
            return Ok(Self::Rsa(pk));
        }
        if let Ok(vk) = p256::ecdsa::VerifyingKey::from_public_key_der(spki_der) {
            return Ok(Self::EcP256(vk));
        }
        if let Ok(vk) = p384::ecdsa::VerifyingKey::from_public_key_der(spki_der) {
            return Ok(Self::EcP384(vk));
        }
        {
            use der::Decode;
            if let Ok(spki_ref) = spki::SubjectPublicKeyInfoRef::from_der(spki_der) {
                if let Ok(vk) = dsa::VerifyingKey::try_from(spki_ref) {
                    return Ok(Self::Dsa(vk));
                }
            }
        }
        Err(Error::Key("unsupported SubjectPublicKeyInfo".into()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "RSA",
            Self::Dsa(_) => "DSA",
            Self::EcP256(_) => "EC P-256",
            Self::EcP384(_) => "EC P-384",
        }
    }

    /// Wrap for use with the signature algorithms.
    pub fn to_signing_key(&self) -> SigningKey {
        match self {
            Self::Rsa(pk) => SigningKey::RsaPublic(pk.clone()),
            Self::Dsa(vk) => SigningKey::DsaPublic(vk.clone()),
            Self::EcP256(vk) => SigningKey::EcP256Public(*vk),
            Self::EcP384(vk) => SigningKey::EcP384Public(*vk),
        }
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} public key", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_spki() {
        let err = PublicKey::from_spki_der(&[0x30, 0x00]).unwrap_err();
        assert_eq!(err.message_key(), "algorithms.WrongKeyForThisOperation");
    }
}
