//! The `/CF` crypt filters a `V4`/`V5` `/Encrypt` dictionary can name under `/StmF`/`/StrF`
//! (spec §4.10). Each filter knows how to turn the file encryption key plus an object's id into
//! a per-object key (`RC4`/`AESV2` salt it with the object number and generation; `AESV5` uses
//! the file key directly) and how to run its cipher.

use std::fmt;

use aes::cipher::block_padding::UnpadError;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};
use rand::RngCore;

use super::pkcs5::Pkcs5;
use super::rc4::Rc4;
use super::DecryptionError;
use crate::ObjectId;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// A cipher an `/Encrypt` dictionary's `/CF` entry can name. Implementors are stored behind
/// `Arc<dyn CryptFilter>` in [`super::EncryptionState`] and shared across every object a document
/// encrypts or decrypts, so the trait only ever borrows `self`.
pub trait CryptFilter: fmt::Debug + Send + Sync {
    /// The `/CFM` name this filter serializes as (`"V2"`, `"AESV2"`, `"AESV3"`, or `"Identity"`).
    fn method(&self) -> &'static [u8];

    /// Derives the per-object key from the file encryption key and the object's id (ISO 32000-2
    /// 7.6.2, Algorithm 1). `AESV3`/`V5` filters use the file encryption key unchanged.
    fn compute_key(&self, file_encryption_key: &[u8], obj_id: ObjectId) -> Result<Vec<u8>, DecryptionError>;

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError>;
    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError>;
}

/// `/CFM /Identity`: no encryption, used when a crypt filter name resolves to nothing meaningful.
#[derive(Debug, Clone, Copy)]
pub struct IdentityCryptFilter;

impl CryptFilter for IdentityCryptFilter {
    fn method(&self) -> &'static [u8] {
        b"Identity"
    }

    fn compute_key(&self, _file_encryption_key: &[u8], _obj_id: ObjectId) -> Result<Vec<u8>, DecryptionError> {
        Ok(Vec::new())
    }

    fn encrypt(&self, _key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, _key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        Ok(ciphertext.to_vec())
    }
}

fn object_key(file_encryption_key: &[u8], obj_id: ObjectId, extra: &[u8]) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(file_encryption_key);
    hasher.update((obj_id.0 as u32).to_le_bytes()[..3].to_vec());
    hasher.update((obj_id.1 as u16).to_le_bytes());
    hasher.update(extra);
    let hash = hasher.finalize();
    let n = (file_encryption_key.len() + 5).min(16);
    hash[..n].to_vec()
}

/// `/CFM /V2`: RC4 keyed per-object (ISO 32000-2 Algorithm 1). Also the implicit filter for
/// encryption versions 1/2, which have no `/CF` dictionary at all.
#[derive(Debug, Clone, Copy)]
pub struct Rc4CryptFilter;

impl CryptFilter for Rc4CryptFilter {
    fn method(&self) -> &'static [u8] {
        b"V2"
    }

    fn compute_key(&self, file_encryption_key: &[u8], obj_id: ObjectId) -> Result<Vec<u8>, DecryptionError> {
        Ok(object_key(file_encryption_key, obj_id, b""))
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        Ok(Rc4::new(key).encrypt(plaintext))
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        Ok(Rc4::new(key).decrypt(ciphertext))
    }
}

/// `/CFM /AESV2`: AES-128-CBC with a random 16-byte IV prepended to the ciphertext and PKCS#5
/// padding (ISO 32000-2 Algorithm 1, with the `sAlT` suffix for the per-object key).
#[derive(Debug, Clone, Copy)]
pub struct Aes128CryptFilter;

impl CryptFilter for Aes128CryptFilter {
    fn method(&self) -> &'static [u8] {
        b"AESV2"
    }

    fn compute_key(&self, file_encryption_key: &[u8], obj_id: ObjectId) -> Result<Vec<u8>, DecryptionError> {
        Ok(object_key(file_encryption_key, obj_id, b"sAlT"))
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        let mut iv = [0u8; 16];
        rand::rng().fill_bytes(&mut iv);
        let ciphertext = Aes128CbcEnc::new(key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs5>(plaintext);
        let mut out = Vec::with_capacity(16 + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        if ciphertext.len() < 16 {
            return Err(DecryptionError::InvalidCipherTextLength);
        }
        let (iv, body) = ciphertext.split_at(16);
        Aes128CbcDec::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<Pkcs5>(body)
            .map_err(|UnpadError| DecryptionError::Padding)
    }
}

/// `/CFM /AESV3`: AES-256-CBC, same framing as [`Aes128CryptFilter`] but keyed directly off the
/// 32-byte file encryption key (revision 5/6 documents derive that key from the password via
/// `PasswordAlgorithm`, not per-object).
#[derive(Debug, Clone, Copy)]
pub struct Aes256CryptFilter;

impl CryptFilter for Aes256CryptFilter {
    fn method(&self) -> &'static [u8] {
        b"AESV3"
    }

    fn compute_key(&self, file_encryption_key: &[u8], _obj_id: ObjectId) -> Result<Vec<u8>, DecryptionError> {
        if file_encryption_key.len() != 32 {
            return Err(DecryptionError::InvalidKeyLength);
        }
        Ok(file_encryption_key.to_vec())
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        let mut iv = [0u8; 16];
        rand::rng().fill_bytes(&mut iv);
        let ciphertext = Aes256CbcEnc::new(key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs5>(plaintext);
        let mut out = Vec::with_capacity(16 + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        if ciphertext.len() < 16 {
            return Err(DecryptionError::InvalidCipherTextLength);
        }
        let (iv, body) = ciphertext.split_at(16);
        Aes256CbcDec::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<Pkcs5>(body)
            .map_err(|UnpadError| DecryptionError::Padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc4_filter_round_trips() {
        let filter = Rc4CryptFilter;
        let key = filter.compute_key(&[1, 2, 3, 4, 5], (7, 0)).unwrap();
        let cipher = filter.encrypt(&key, b"hello world").unwrap();
        let plain = filter.decrypt(&key, &cipher).unwrap();
        assert_eq!(plain, b"hello world");
    }

    #[test]
    fn aes128_filter_round_trips() {
        let filter = Aes128CryptFilter;
        let key = filter.compute_key(&[0u8; 16], (3, 0)).unwrap();
        let cipher = filter.encrypt(&key, b"a padded message of some length").unwrap();
        let plain = filter.decrypt(&key, &cipher).unwrap();
        assert_eq!(plain, b"a padded message of some length");
    }

    #[test]
    fn aes256_filter_requires_a_32_byte_key() {
        let filter = Aes256CryptFilter;
        assert!(filter.compute_key(&[0u8; 16], (1, 0)).is_err());
        let key = filter.compute_key(&[0u8; 32], (1, 0)).unwrap();
        let cipher = filter.encrypt(&key, b"short").unwrap();
        assert_eq!(filter.decrypt(&key, &cipher).unwrap(), b"short");
    }

    #[test]
    fn identity_filter_is_a_no_op() {
        let filter = IdentityCryptFilter;
        let key = filter.compute_key(&[1, 2, 3], (1, 0)).unwrap();
        assert!(key.is_empty());
        assert_eq!(filter.encrypt(&key, b"data").unwrap(), b"data");
    }
}
