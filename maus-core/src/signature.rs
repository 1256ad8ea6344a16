//! Asymmetric signing/verification over an entry's integrity value, plus RSA key-wrapping for the
//! optional asymmetric key-protection mode (§4.1.2 step 6, §6).
//!
//! There's no direct teacher equivalent - `dexios` never signs anything - so this module is
//! grounded on the RustCrypto signature ecosystem directly: `rsa`, `dsa`, and `p256` all implement
//! the `signature::{Signer, Verifier}` traits the same way, which is what lets `SignatureAlgorithm`
//! dispatch through one pair of methods the way [`crate::cipher::Ciphers`] does for the symmetric
//! side.

use anyhow::{bail, Context, Result};
use dsa::signature::{Signer as _, Verifier as _};
use rand::rngs::OsRng;
use rsa::pkcs1v15::{SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey};
use rsa::sha2::Sha256 as RsaSha256;
use rsa::{RsaPrivateKey, RsaPublicKey};

/// A keypair able to produce a detached signature over an entry's integrity value.
#[derive(Clone)]
pub enum SigningKey {
    Rsa(Box<RsaPrivateKey>),
    Dsa(Box<dsa::SigningKey>),
    Ecdsa(Box<p256::ecdsa::SigningKey>),
}

/// The public half, used to verify a signature produced by the matching [`SigningKey`].
pub enum VerifyingKey {
    Rsa(Box<RsaPublicKey>),
    Dsa(Box<dsa::VerifyingKey>),
    Ecdsa(Box<p256::ecdsa::VerifyingKey>),
}

impl SigningKey {
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        match self {
            SigningKey::Rsa(sk) => VerifyingKey::Rsa(Box::new(sk.to_public_key())),
            SigningKey::Dsa(sk) => VerifyingKey::Dsa(Box::new(sk.verifying_key().clone())),
            SigningKey::Ecdsa(sk) => VerifyingKey::Ecdsa(Box::new(*sk.verifying_key())),
        }
    }

    #[must_use]
    pub fn algorithm_id(&self) -> AsymmetricId {
        match self {
            SigningKey::Rsa(_) => AsymmetricId::Rsa,
            SigningKey::Dsa(_) => AsymmetricId::Dsa,
            SigningKey::Ecdsa(_) => AsymmetricId::Ecdsa,
        }
    }

    /// Signs `message` (the entry's integrity value, per §4.1.2 step 6), returning the detached
    /// signature bytes.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        match self {
            SigningKey::Rsa(sk) => {
                let signing_key = RsaSigningKey::<RsaSha256>::new((**sk).clone());
                let sig = signing_key.sign(message);
                Ok(rsa::signature::SignatureEncoding::to_vec(&sig))
            }
            SigningKey::Dsa(sk) => {
                let sig: dsa::Signature = sk.sign(message);
                Ok(sig.to_der().as_bytes().to_vec())
            }
            SigningKey::Ecdsa(sk) => {
                let sig: p256::ecdsa::Signature = sk.sign(message);
                Ok(sig.to_der().as_bytes().to_vec())
            }
        }
    }
}

impl VerifyingKey {
    #[must_use]
    pub fn algorithm_id(&self) -> AsymmetricId {
        match self {
            VerifyingKey::Rsa(_) => AsymmetricId::Rsa,
            VerifyingKey::Dsa(_) => AsymmetricId::Dsa,
            VerifyingKey::Ecdsa(_) => AsymmetricId::Ecdsa,
        }
    }

    /// Verifies `signature` over `message`. A `false` return (rather than an error) means the
    /// signature simply didn't verify - callers surface this as `SignatureUnverified` (§7), not a
    /// decoding failure.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            VerifyingKey::Rsa(pk) => {
                let verifying_key = RsaVerifyingKey::<RsaSha256>::new((**pk).clone());
                let Ok(sig) = rsa::pkcs1v15::Signature::try_from(signature) else {
                    return false;
                };
                verifying_key.verify(message, &sig).is_ok()
            }
            VerifyingKey::Dsa(pk) => {
                let Ok(sig) = dsa::Signature::from_der(signature) else {
                    return false;
                };
                pk.verify(message, &sig).is_ok()
            }
            VerifyingKey::Ecdsa(pk) => {
                let Ok(sig) = p256::ecdsa::Signature::from_der(signature) else {
                    return false;
                };
                pk.verify(message, &sig).is_ok()
            }
        }
    }
}

/// Generates a fresh RSA keypair of `bits` modulus length, for use with the RSA key-wrap mode.
pub fn generate_rsa_keypair(bits: usize) -> Result<RsaPrivateKey> {
    RsaPrivateKey::new(&mut OsRng, bits).context("Failed to generate RSA keypair")
}

/// Wraps (encrypts) a symmetric key under an RSA public key, for the optional asymmetric
/// key-protection mode (§6: "wrapped-keys").
pub fn rsa_wrap_key(public_key: &RsaPublicKey, key: &[u8]) -> Result<Vec<u8>> {
    public_key
        .encrypt(&mut OsRng, rsa::Pkcs1v15Encrypt, key)
        .context("RSA key-wrap failed")
}

/// Unwraps (decrypts) a symmetric key previously wrapped with [`rsa_wrap_key`].
pub fn rsa_unwrap_key(private_key: &RsaPrivateKey, wrapped: &[u8]) -> Result<Vec<u8>> {
    private_key
        .decrypt(rsa::Pkcs1v15Encrypt, wrapped)
        .map_err(|_| anyhow::anyhow!("RSA key-unwrap failed, wrong key or corrupted header"))
}

/// Which asymmetric scheme a signature or key-wrap was produced with, as stored on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsymmetricId {
    Rsa,
    Dsa,
    Ecdsa,
}

impl AsymmetricId {
    #[must_use]
    pub fn wire(self) -> u16 {
        match self {
            AsymmetricId::Rsa => 0,
            AsymmetricId::Dsa => 1,
            AsymmetricId::Ecdsa => 2,
        }
    }

    pub fn from_wire(value: u16) -> Result<Self> {
        match value {
            0 => Ok(AsymmetricId::Rsa),
            1 => Ok(AsymmetricId::Dsa),
            2 => Ok(AsymmetricId::Ecdsa),
            other => bail!("Unrecognized asymmetric algorithm id {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsa::Components;
    use rsa::traits::PublicKeyParts as _;

    #[test]
    fn rsa_sign_and_verify_roundtrip() {
        let sk = generate_rsa_keypair(1024).unwrap();
        let signing_key = SigningKey::Rsa(Box::new(sk));
        let verifying_key = signing_key.verifying_key();

        let sig = signing_key.sign(b"integrity-value").unwrap();
        assert!(verifying_key.verify(b"integrity-value", &sig));
        assert!(!verifying_key.verify(b"tampered-value", &sig));
    }

    #[test]
    fn rsa_key_wrap_roundtrip() {
        let sk = generate_rsa_keypair(1024).unwrap();
        let pk = sk.to_public_key();
        let wrapped = rsa_wrap_key(&pk, b"0123456789abcdef").unwrap();
        let unwrapped = rsa_unwrap_key(&sk, &wrapped).unwrap();
        assert_eq!(unwrapped, b"0123456789abcdef");
    }

    #[test]
    fn ecdsa_sign_and_verify_roundtrip() {
        let sk = p256::ecdsa::SigningKey::random(&mut OsRng);
        let signing_key = SigningKey::Ecdsa(Box::new(sk));
        let verifying_key = signing_key.verifying_key();

        let sig = signing_key.sign(b"integrity-value").unwrap();
        assert!(verifying_key.verify(b"integrity-value", &sig));
        assert!(!verifying_key.verify(b"other-value", &sig));
    }

    #[test]
    fn dsa_sign_and_verify_roundtrip() {
        let components = Components::generate(&mut OsRng, dsa::KeySize::DSA_2048_256);
        let sk = dsa::SigningKey::generate(&mut OsRng, components);
        let signing_key = SigningKey::Dsa(Box::new(sk));
        let verifying_key = signing_key.verifying_key();

        let sig = signing_key.sign(b"integrity-value").unwrap();
        assert!(verifying_key.verify(b"integrity-value", &sig));
    }

    #[test]
    fn asymmetric_id_roundtrip() {
        for id in [AsymmetricId::Rsa, AsymmetricId::Dsa, AsymmetricId::Ecdsa] {
            assert_eq!(AsymmetricId::from_wire(id.wire()).unwrap(), id);
        }
        assert!(AsymmetricId::from_wire(99).is_err());
    }
}
