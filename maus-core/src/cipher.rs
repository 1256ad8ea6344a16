//! AES-CBC + PKCS#7 encryption/decryption, and the HMAC integrity primitive (§4.1.2 steps 4-5,
//! §4.1.3 step 5).
//!
//! This mirrors the shape of the teacher's `Ciphers` enum (one variant per supported key size,
//! `encrypt`/`decrypt` dispatching through it) but swaps AEAD streams for CBC + a detached HMAC,
//! since that's what this format specifies.

use aes::{Aes128, Aes192, Aes256};
use anyhow::{bail, Result};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use sha3::{Sha3_256, Sha3_512};

use crate::primitives::{ct_eq, HashId, AES_BLOCK_LEN};
use crate::protected::Protected;

/// Supported AES key sizes, in bits (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBits {
    Aes128,
    Aes192,
    Aes256,
}

impl KeyBits {
    #[must_use]
    pub fn key_len(self) -> usize {
        match self {
            KeyBits::Aes128 => 16,
            KeyBits::Aes192 => 24,
            KeyBits::Aes256 => 32,
        }
    }

    pub fn from_key_len(len: usize) -> Result<Self> {
        match len {
            16 => Ok(KeyBits::Aes128),
            24 => Ok(KeyBits::Aes192),
            32 => Ok(KeyBits::Aes256),
            _ => bail!("{len} bytes is not a valid AES key length (expected 16, 24 or 32)"),
        }
    }
}

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes192CbcEnc = cbc::Encryptor<Aes192>;
type Aes192CbcDec = cbc::Decryptor<Aes192>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// An AES-CBC cipher, keyed and ready for one encrypt or decrypt operation.
pub enum Ciphers {
    Aes128(Box<[u8; 16]>, Box<[u8; AES_BLOCK_LEN]>),
    Aes192(Box<[u8; 24]>, Box<[u8; AES_BLOCK_LEN]>),
    Aes256(Box<[u8; 32]>, Box<[u8; AES_BLOCK_LEN]>),
}

impl Ciphers {
    /// Initializes a cipher from a derived key and an IV. The key's length determines the AES
    /// variant.
    pub fn initialize(key: &Protected<Vec<u8>>, iv: &[u8]) -> Result<Self> {
        if iv.len() != AES_BLOCK_LEN {
            bail!("IV must be {AES_BLOCK_LEN} bytes, got {}", iv.len());
        }
        let mut iv_arr = [0u8; AES_BLOCK_LEN];
        iv_arr.copy_from_slice(iv);

        let bits = KeyBits::from_key_len(key.expose().len())?;
        Ok(match bits {
            KeyBits::Aes128 => {
                let mut arr = [0u8; 16];
                arr.copy_from_slice(key.expose());
                Ciphers::Aes128(Box::new(arr), Box::new(iv_arr))
            }
            KeyBits::Aes192 => {
                let mut arr = [0u8; 24];
                arr.copy_from_slice(key.expose());
                Ciphers::Aes192(Box::new(arr), Box::new(iv_arr))
            }
            KeyBits::Aes256 => {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(key.expose());
                Ciphers::Aes256(Box::new(arr), Box::new(iv_arr))
            }
        })
    }

    /// Encrypts `plaintext`, applying PKCS#7 padding to a block multiple.
    #[must_use]
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        match self {
            Ciphers::Aes128(key, iv) => {
                Aes128CbcEnc::new(key.as_ref().into(), iv.as_ref().into())
                    .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
            }
            Ciphers::Aes192(key, iv) => {
                Aes192CbcEnc::new(key.as_ref().into(), iv.as_ref().into())
                    .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
            }
            Ciphers::Aes256(key, iv) => {
                Aes256CbcEnc::new(key.as_ref().into(), iv.as_ref().into())
                    .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
            }
        }
    }

    /// Decrypts `ciphertext` and strips the PKCS#7 padding.
    ///
    /// Returns an error if `ciphertext` is not a block multiple or the padding is malformed -
    /// both are symptoms of a wrong key or tampered data, so callers should surface this as
    /// `IntegrityFailure` rather than propagate the raw padding error.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let result = match self {
            Ciphers::Aes128(key, iv) => {
                Aes128CbcDec::new(key.as_ref().into(), iv.as_ref().into())
                    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            }
            Ciphers::Aes192(key, iv) => {
                Aes192CbcDec::new(key.as_ref().into(), iv.as_ref().into())
                    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            }
            Ciphers::Aes256(key, iv) => {
                Aes256CbcDec::new(key.as_ref().into(), iv.as_ref().into())
                    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            }
        };
        result.map_err(|_| anyhow::anyhow!("AES-CBC decryption/unpadding failed"))
    }
}

/// Computes the HMAC over `message` under `key`, using the hash function paired with the entry.
///
/// The message is always `iv || ciphertext || primary-header-bytes` (§4.1.2 step 5).
pub fn hmac_compute(key: &Protected<Vec<u8>>, hash_fn: HashId, message: &[u8]) -> Vec<u8> {
    match hash_fn {
        HashId::Sha256 | HashId::Sha3_256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key.expose())
                .expect("HMAC accepts keys of any length");
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
        HashId::Sha512 | HashId::Sha3_512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(key.expose())
                .expect("HMAC accepts keys of any length");
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
    }
}

/// Verifies a stored HMAC against a freshly computed one, in constant time (§4.1.3 step 5, §8
/// "Constant-time compare").
#[must_use]
pub fn hmac_verify(key: &Protected<Vec<u8>>, hash_fn: HashId, message: &[u8], stored: &[u8]) -> bool {
    let computed = hmac_compute(key, hash_fn, message);
    ct_eq(&computed, stored)
}

/// Computes the plaintext hash used for unencrypted entries / the pre-image signed when no
/// encryption is active (§4.1.2 step 2).
#[must_use]
pub fn hash(hash_fn: HashId, data: &[u8]) -> Vec<u8> {
    use sha2::Digest as _;
    use sha3::Digest as _;
    match hash_fn {
        HashId::Sha256 => Sha256::digest(data).to_vec(),
        HashId::Sha512 => Sha512::digest(data).to_vec(),
        HashId::Sha3_256 => Sha3_256::digest(data).to_vec(),
        HashId::Sha3_512 => Sha3_512::digest(data).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(bytes: usize) -> Protected<Vec<u8>> {
        Protected::new(vec![0x42u8; bytes])
    }

    #[test]
    fn aes_roundtrip_all_key_sizes() {
        for size in [16, 24, 32] {
            let iv = vec![0x24u8; AES_BLOCK_LEN];
            let cipher = Ciphers::initialize(&key(size), &iv).unwrap();
            let plaintext = b"the quick brown fox jumps over the lazy dog";
            let ciphertext = cipher.encrypt(plaintext);
            assert_ne!(ciphertext, plaintext);
            let decrypted = cipher.decrypt(&ciphertext).unwrap();
            assert_eq!(decrypted, plaintext);
        }
    }

    #[test]
    fn wrong_key_fails_to_decrypt_or_produces_wrong_plaintext() {
        let iv = vec![0x24u8; AES_BLOCK_LEN];
        let cipher_a = Ciphers::initialize(&key(32), &iv).unwrap();
        let ciphertext = cipher_a.encrypt(b"secret");

        let cipher_b = Ciphers::initialize(&Protected::new(vec![0x99u8; 32]), &iv).unwrap();
        let result = cipher_b.decrypt(&ciphertext);
        assert!(result.is_err() || result.unwrap() != b"secret");
    }

    #[test]
    fn hmac_roundtrip_and_tamper_detection() {
        let k = Protected::new(b"hmac-key".to_vec());
        let mac = hmac_compute(&k, HashId::Sha256, b"iv-ciphertext-header");
        assert!(hmac_verify(&k, HashId::Sha256, b"iv-ciphertext-header", &mac));
        assert!(!hmac_verify(&k, HashId::Sha256, b"iv-ciphertext-headeX", &mac));
    }

    #[test]
    fn sha256_of_empty_string_matches_known_value() {
        let digest = hash(HashId::Sha256, b"");
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_of_hello_world_matches_known_value() {
        let digest = hash(HashId::Sha256, b"Hello, World!\n");
        assert_eq!(
            hex::encode(digest),
            "c98c24b677eff44860afea6f493bbaec5bb1c4cbb209c6fc2bbb47f66ff2ad31"
        );
    }
}
