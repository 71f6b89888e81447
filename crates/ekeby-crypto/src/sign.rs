#![forbid(unsafe_code)]

//! Signature algorithm implementations (RSA, DSA, ECDSA).
//!
//! DSA and ECDSA produce and consume the fixed-width `r‖s` value that
//! appears in `SignatureValue`; the DER form the primitives speak is
//! converted through [`SignatureCodec`].

use crate::codec::SignatureCodec;
use ekeby_core::{algorithm, Error};
use signature::SignatureEncoding;

/// Key material for signature operations.
pub enum SigningKey {
    Rsa(rsa::RsaPrivateKey),
    RsaPublic(rsa::RsaPublicKey),
    Dsa(dsa::SigningKey),
    DsaPublic(dsa::VerifyingKey),
    EcP256(p256::ecdsa::SigningKey),
    EcP256Public(p256::ecdsa::VerifyingKey),
    EcP384(p384::ecdsa::SigningKey),
    EcP384Public(p384::ecdsa::VerifyingKey),
}

impl SigningKey {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rsa(_) | Self::RsaPublic(_) => "RSA",
            Self::Dsa(_) | Self::DsaPublic(_) => "DSA",
            Self::EcP256(_) | Self::EcP256Public(_) => "EC P-256",
            Self::EcP384(_) | Self::EcP384Public(_) => "EC P-384",
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(
            self,
            Self::Rsa(_) | Self::Dsa(_) | Self::EcP256(_) | Self::EcP384(_)
        )
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kind", &self.kind())
            .field("private", &self.is_private())
            .finish()
    }
}

/// Trait for signature algorithms.
pub trait SignatureAlgorithm: Send + Sync {
    fn uri(&self) -> &'static str;
    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error>;
    fn verify(&self, key: &SigningKey, data: &[u8], signature: &[u8]) -> Result<bool, Error>;
}

/// Create a signature algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn SignatureAlgorithm>, Error> {
    match uri {
        algorithm::RSA_SHA1 => Ok(Box::new(RsaPkcs1v15 { uri: algorithm::RSA_SHA1, hash: HashType::Sha1 })),
        algorithm::RSA_SHA256 => Ok(Box::new(RsaPkcs1v15 { uri: algorithm::RSA_SHA256, hash: HashType::Sha256 })),
        algorithm::RSA_SHA384 => Ok(Box::new(RsaPkcs1v15 { uri: algorithm::RSA_SHA384, hash: HashType::Sha384 })),
        algorithm::RSA_SHA512 => Ok(Box::new(RsaPkcs1v15 { uri: algorithm::RSA_SHA512, hash: HashType::Sha512 })),

        algorithm::DSA_SHA1 => Ok(Box::new(Dsa {
            uri: algorithm::DSA_SHA1,
            hash: HashType::Sha1,
            codec: SignatureCodec::DSA_SHA1,
        })),
        algorithm::DSA_SHA256 => Ok(Box::new(Dsa {
            uri: algorithm::DSA_SHA256,
            hash: HashType::Sha256,
            codec: SignatureCodec::DSA_SHA256,
        })),

        algorithm::ECDSA_SHA256 => Ok(Box::new(EcdsaP256)),
        algorithm::ECDSA_SHA384 => Ok(Box::new(EcdsaP384)),

        _ => Err(Error::UnsupportedAlgorithm(format!("signature algorithm: {uri}"))),
    }
}

#[derive(Debug, Clone, Copy)]
enum HashType { Sha1, Sha256, Sha384, Sha512 }

// ── RSA PKCS#1 v1.5 ─────────────────────────────────────────────────

struct RsaPkcs1v15 { uri: &'static str, hash: HashType }

impl RsaPkcs1v15 {
    fn sign_with_key(&self, private_key: &rsa::RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        use signature::Signer;
        macro_rules! do_sign {
            ($hasher:ty) => {{
                let sk = rsa::pkcs1v15::SigningKey::<$hasher>::new(private_key.clone());
                let sig = sk
                    .try_sign(data)
                    .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))?;
                Ok(sig.to_vec())
            }};
        }
        match self.hash {
            HashType::Sha1 => do_sign!(sha1::Sha1),
            HashType::Sha256 => do_sign!(sha2::Sha256),
            HashType::Sha384 => do_sign!(sha2::Sha384),
            HashType::Sha512 => do_sign!(sha2::Sha512),
        }
    }

    fn verify_with_key(&self, public_key: &rsa::RsaPublicKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        use signature::Verifier;
        let sig = rsa::pkcs1v15::Signature::try_from(sig_bytes)
            .map_err(|e| Error::Crypto(format!("invalid RSA signature: {e}")))?;
        macro_rules! do_verify {
            ($hasher:ty) => {{
                let vk = rsa::pkcs1v15::VerifyingKey::<$hasher>::new(public_key.clone());
                Ok(vk.verify(data, &sig).is_ok())
            }};
        }
        match self.hash {
            HashType::Sha1 => do_verify!(sha1::Sha1),
            HashType::Sha256 => do_verify!(sha2::Sha256),
            HashType::Sha384 => do_verify!(sha2::Sha384),
            HashType::Sha512 => do_verify!(sha2::Sha512),
        }
    }
}

impl SignatureAlgorithm for RsaPkcs1v15 {
    fn uri(&self) -> &'static str { self.uri }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        match key {
            SigningKey::Rsa(pk) => self.sign_with_key(pk, data),
            _ => Err(Error::Key("RSA private key required".into())),
        }
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        let pubk = match key {
            SigningKey::Rsa(pk) => pk.to_public_key(),
            SigningKey::RsaPublic(pk) => pk.clone(),
            _ => return Err(Error::Key("RSA key required".into())),
        };
        self.verify_with_key(&pubk, data, sig_bytes)
    }
}

// ── DSA ──────────────────────────────────────────────────────────────

struct Dsa { uri: &'static str, hash: HashType, codec: SignatureCodec }

impl SignatureAlgorithm for Dsa {
    fn uri(&self) -> &'static str { self.uri }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        use der::Encode;
        use digest::Digest;
        use signature::DigestSigner;
        let SigningKey::Dsa(sk) = key else {
            return Err(Error::Key("DSA private key required".into()));
        };
        let sig: dsa::Signature = match self.hash {
            HashType::Sha1 => sk.try_sign_digest(sha1::Sha1::new_with_prefix(data)),
            HashType::Sha256 => sk.try_sign_digest(sha2::Sha256::new_with_prefix(data)),
            _ => return Err(Error::UnsupportedAlgorithm(self.uri.into())),
        }
        .map_err(|e| Error::Crypto(format!("DSA signing failed: {e}")))?;
        let asn1 = sig
            .to_der()
            .map_err(|e| Error::Crypto(format!("DSA signature encoding: {e}")))?;
        self.codec.to_fixed(&asn1)
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        use der::Decode;
        use digest::Digest;
        use signature::DigestVerifier;
        let vk = match key {
            SigningKey::Dsa(sk) => sk.verifying_key(),
            SigningKey::DsaPublic(vk) => vk,
            _ => return Err(Error::Key("DSA key required".into())),
        };
        let asn1 = self.codec.to_asn1(sig_bytes)?;
        let sig = dsa::Signature::from_der(&asn1)
            .map_err(|e| Error::Crypto(format!("invalid DSA signature: {e}")))?;
        let ok = match self.hash {
            HashType::Sha1 => vk.verify_digest(sha1::Sha1::new_with_prefix(data), &sig),
            HashType::Sha256 => vk.verify_digest(sha2::Sha256::new_with_prefix(data), &sig),
            _ => return Err(Error::UnsupportedAlgorithm(self.uri.into())),
        };
        Ok(ok.is_ok())
    }
}

// ── ECDSA ────────────────────────────────────────────────────────────

macro_rules! impl_ecdsa {
    ($name:ident, $curve:ident, $uri:expr, $codec:expr, $private:ident, $public:ident) => {
        struct $name;

        impl SignatureAlgorithm for $name {
            fn uri(&self) -> &'static str { $uri }

            fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
                use signature::Signer;
                let SigningKey::$private(sk) = key else {
                    return Err(Error::Key(concat!(stringify!($curve), " signing key required").into()));
                };
                let sig: $curve::ecdsa::Signature = sk
                    .try_sign(data)
                    .map_err(|e| Error::Crypto(format!("ECDSA signing failed: {e}")))?;
                $codec.to_fixed(sig.to_der().as_bytes())
            }

            fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
                use signature::Verifier;
                let vk = match key {
                    SigningKey::$private(sk) => *sk.verifying_key(),
                    SigningKey::$public(vk) => *vk,
                    _ => return Err(Error::Key(concat!(stringify!($curve), " key required").into())),
                };
                let asn1 = $codec.to_asn1(sig_bytes)?;
                let sig = $curve::ecdsa::Signature::from_der(&asn1)
                    .map_err(|e| Error::Crypto(format!("invalid ECDSA signature: {e}")))?;
                Ok(vk.verify(data, &sig).is_ok())
            }
        }
    };
}

impl_ecdsa!(EcdsaP256, p256, algorithm::ECDSA_SHA256, SignatureCodec::ECDSA_P256, EcP256, EcP256Public);
impl_ecdsa!(EcdsaP384, p384, algorithm::ECDSA_SHA384, SignatureCodec::ECDSA_P384, EcP384, EcP384Public);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecdsa_p256_value_is_fixed_width() {
        let sk = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let alg = from_uri(algorithm::ECDSA_SHA256).unwrap();
        let key = SigningKey::EcP256(sk);
        let sig = alg.sign(&key, b"payload").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(alg.verify(&key, b"payload", &sig).unwrap());
        assert!(!alg.verify(&key, b"tampered", &sig).unwrap());
    }

    #[test]
    fn test_ecdsa_p384_with_public_key() {
        let sk = p384::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let public = SigningKey::EcP384Public(*sk.verifying_key());
        let alg = from_uri(algorithm::ECDSA_SHA384).unwrap();
        let sig = alg.sign(&SigningKey::EcP384(sk), b"payload").unwrap();
        assert_eq!(sig.len(), 96);
        assert!(alg.verify(&public, b"payload", &sig).unwrap());
    }

    #[test]
    fn test_ecdsa_rejects_truncated_value() {
        let sk = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let alg = from_uri(algorithm::ECDSA_SHA256).unwrap();
        let key = SigningKey::EcP256(sk);
        let sig = alg.sign(&key, b"payload").unwrap();
        let err = alg.verify(&key, b"payload", &sig[..63]).unwrap_err();
        assert_eq!(err.message_key(), "algorithms.InvalidXMLDSIGFormat");
    }

    #[test]
    fn test_rsa_sha256_round_trip() {
        let sk = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let public = SigningKey::RsaPublic(sk.to_public_key());
        let alg = from_uri(algorithm::RSA_SHA256).unwrap();
        let sig = alg.sign(&SigningKey::Rsa(sk), b"payload").unwrap();
        assert!(alg.verify(&public, b"payload", &sig).unwrap());
        assert!(!alg.verify(&public, b"other", &sig).unwrap());
    }

    #[test]
    fn test_dsa_sha1_value_is_fixed_width() {
        let mut rng = rand::thread_rng();
        let components = dsa::Components::generate(&mut rng, dsa::KeySize::DSA_1024_160);
        let sk = dsa::SigningKey::generate(&mut rng, components);
        let public = SigningKey::DsaPublic(sk.verifying_key().clone());
        let alg = from_uri(algorithm::DSA_SHA1).unwrap();

        let sig = alg.sign(&SigningKey::Dsa(sk), b"payload").unwrap();
        assert_eq!(sig.len(), 40);
        assert!(alg.verify(&public, b"payload", &sig).unwrap());
        assert!(!alg.verify(&public, b"paylOad", &sig).unwrap());

        let mut tampered_r = sig.clone();
        tampered_r[19] ^= 0x01;
        assert!(!alg.verify(&public, b"payload", &tampered_r).unwrap());
        let mut tampered_s = sig;
        tampered_s[39] ^= 0x01;
        assert!(!alg.verify(&public, b"payload", &tampered_s).unwrap());
    }

    #[test]
    fn test_wrong_key_type() {
        let sk = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let alg = from_uri(algorithm::DSA_SHA1).unwrap();
        let err = alg.verify(&SigningKey::EcP256(sk), b"x", &[0u8; 40]).unwrap_err();
        assert_eq!(err.message_key(), "algorithms.WrongKeyForThisOperation");
    }

    #[test]
    fn test_unknown_algorithm() {
        assert!(from_uri("urn:unknown").is_err());
    }
}
