//! Password-based key derivation (spec §4.10, ISO 32000-2 Algorithms 2-9). Revisions 2-4 hash
//! with MD5 and wrap with RC4 (deprecated since PDF 2.0 but still the common case in the wild);
//! revision 6 (AES-256, PDF 2.0) iterates SHA-256/384/512 per Algorithm 2.B.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest as Md5Digest, Md5};
use rand::RngCore;
use sha2::{Digest, Sha256, Sha384, Sha512};

use super::rc4::Rc4;
use super::DecryptionError;
use super::Permissions;
use crate::{encodings, Document, Error, Object};

/// If the password string is less than 32 bytes long, pad it by appending the required number of
/// additional bytes from the beginning of this padding string (ISO 32000-2 Algorithm 2, step b).
const PAD_BYTES: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08, 0x2E, 0x2E, 0x00,
    0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

#[derive(Clone, Debug, Default)]
pub struct PasswordAlgorithm {
    pub length: Option<usize>,
    pub version: i64,
    pub revision: i64,
    pub encrypt_metadata: bool,
    pub permissions: Permissions,
    pub owner_value: Vec<u8>,
    pub owner_encrypted: Vec<u8>,
    pub user_value: Vec<u8>,
    pub user_encrypted: Vec<u8>,
    pub permission_encrypted: Vec<u8>,
}

impl TryFrom<&Document> for PasswordAlgorithm {
    type Error = Error;

    fn try_from(value: &Document) -> Result<Self, Self::Error> {
        let encrypted = value.get_encrypted().map_err(|_| DecryptionError::MissingEncryptDictionary)?;

        let length =
            if encrypted.get(b"Length").is_ok() { Some(encrypted.get(b"Length")?.as_i64()?.try_into()?) } else { None };

        let version = encrypted.get(b"V").map(|o| o.as_i64().unwrap_or(1)).unwrap_or(1);
        let revision = encrypted.get(b"R").map_err(|_| DecryptionError::MissingRevision)?.as_i64().map_err(|_| DecryptionError::InvalidType)?;
        let encrypt_metadata = encrypted.get(b"EncryptMetadata").unwrap_or(&Object::Boolean(true)).as_bool().unwrap_or(true);

        // `/P` round-trips through `Permissions::bits() as i64` on write (see `EncryptionState::decode`),
        // so reading it back is the same cast in reverse.
        let permissions = encrypted
            .get(b"P")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .map(|p| Permissions::from_bits_retain(p as u64))
            .unwrap_or_default();

        let read_string = |key: &[u8]| encrypted.get(key).ok().and_then(|o| o.as_str().ok()).map(|s| s.to_vec()).unwrap_or_default();
        let owner_value = read_string(b"O");
        let user_value = read_string(b"U");
        let owner_encrypted = read_string(b"OE");
        let user_encrypted = read_string(b"UE");
        let permission_encrypted = read_string(b"Perms");

        Ok(Self {
            length,
            version,
            revision,
            encrypt_metadata,
            permissions,
            owner_value,
            owner_encrypted,
            user_value,
            user_encrypted,
            permission_encrypted,
        })
    }
}

impl PasswordAlgorithm {
    // --- Revision 2-4 (MD5 + RC4), ISO 32000-2 Algorithms 2-7 ---------------------------------

    pub(crate) fn sanitize_password_r4(&self, password: &str) -> Result<Vec<u8>, DecryptionError> {
        Ok(encodings::string_to_bytes(&encodings::PDF_DOC_ENCODING, password))
    }

    pub(crate) fn compute_file_encryption_key_r4<P: AsRef<[u8]>>(
        &self,
        doc: &Document,
        password: P,
    ) -> Result<Vec<u8>, DecryptionError> {
        let password = password.as_ref();
        let encrypted = doc.get_encrypted().map_err(|_| DecryptionError::MissingEncryptDictionary)?;
        let encrypt_metadata =
            encrypted.get(b"EncryptMetadata").unwrap_or(&Object::Boolean(true)).as_bool().map_err(|_| DecryptionError::InvalidType)?;

        let len = password.len().min(32);
        let mut hasher = Md5::new();
        hasher.update(&password[..len]);
        hasher.update(&PAD_BYTES[len..]);

        let hashed_owner_password =
            encrypted.get(b"O").map_err(|_| DecryptionError::MissingOwnerPassword)?.as_str().map_err(|_| DecryptionError::InvalidType)?;
        hasher.update(hashed_owner_password);

        let permissions = encrypted.get(b"P").map_err(|_| DecryptionError::MissingPermissions)?.as_i64().map_err(|_| DecryptionError::InvalidType)? as u32;
        hasher.update(permissions.to_le_bytes());

        let file_id_0 = doc
            .trailer
            .get(b"ID")
            .map_err(|_| DecryptionError::MissingFileID)?
            .as_array()
            .map_err(|_| DecryptionError::InvalidType)?
            .first()
            .ok_or(DecryptionError::InvalidType)?
            .as_str()
            .map_err(|_| DecryptionError::InvalidType)?;
        hasher.update(file_id_0);

        if self.revision >= 4 && !encrypt_metadata {
            hasher.update(b"\xff\xff\xff\xff");
        }

        let mut hash = hasher.finalize().to_vec();

        let n = if self.revision >= 3 { self.length.ok_or(DecryptionError::InvalidKeyLength)? / 8 } else { 5 };
        if n > 16 {
            return Err(DecryptionError::InvalidKeyLength);
        }

        if self.revision >= 3 {
            for _ in 0..50 {
                hash = Md5::digest(&hash[..n]).to_vec();
            }
        }

        Ok(hash[..n].to_vec())
    }

    pub(crate) fn compute_hashed_owner_password_r4<O: AsRef<[u8]>, U: AsRef<[u8]>>(
        &self,
        owner_password: Option<O>,
        user_password: U,
    ) -> Result<Vec<u8>, DecryptionError> {
        let user_password = user_password.as_ref();
        let password = owner_password.as_ref().map(|p| p.as_ref()).unwrap_or(user_password);
        let len = password.len().min(32);

        let mut hasher = Md5::new();
        hasher.update(&password[..len]);
        hasher.update(&PAD_BYTES[len..]);
        let mut hash = hasher.finalize().to_vec();

        if self.revision >= 3 {
            for _ in 0..50 {
                hash = Md5::digest(&hash).to_vec();
            }
        }

        let n = if self.revision >= 3 { self.length.ok_or(DecryptionError::InvalidKeyLength)? / 8 } else { 5 };
        if n > 16 {
            return Err(DecryptionError::InvalidKeyLength);
        }

        let len = user_password.len().min(32);
        let mut bytes = [0u8; 32];
        bytes[..len].copy_from_slice(&user_password[..len]);
        bytes[len..].copy_from_slice(&PAD_BYTES[len..]);

        let mut result = Rc4::new(&hash[..n]).encrypt(bytes);

        if self.revision >= 3 {
            let mut key = vec![0u8; n];
            for i in 1..=19u8 {
                for (in_byte, out_byte) in hash[..n].iter().zip(key.iter_mut()) {
                    *out_byte = in_byte ^ i;
                }
                result = Rc4::new(&key).encrypt(&result);
            }
        }

        Ok(result)
    }

    pub(crate) fn compute_hashed_user_password_r2<U: AsRef<[u8]>>(
        &self,
        doc: &Document,
        user_password: U,
    ) -> Result<Vec<u8>, DecryptionError> {
        let file_encryption_key = self.compute_file_encryption_key_r4(doc, user_password)?;
        Ok(Rc4::new(&file_encryption_key).encrypt(PAD_BYTES))
    }

    pub(crate) fn compute_hashed_user_password_r3_r4<U: AsRef<[u8]>>(
        &self,
        doc: &Document,
        user_password: U,
    ) -> Result<Vec<u8>, DecryptionError> {
        let file_encryption_key = self.compute_file_encryption_key_r4(doc, user_password)?;

        let mut hasher = Md5::new();
        hasher.update(PAD_BYTES);
        let file_id_0 = doc
            .trailer
            .get(b"ID")
            .map_err(|_| DecryptionError::MissingFileID)?
            .as_array()
            .map_err(|_| DecryptionError::InvalidType)?
            .first()
            .ok_or(DecryptionError::InvalidType)?
            .as_str()
            .map_err(|_| DecryptionError::InvalidType)?;
        hasher.update(file_id_0);
        let hash = hasher.finalize();

        let mut result = Rc4::new(&file_encryption_key).encrypt(hash.as_slice());

        let mut key = vec![0u8; file_encryption_key.len()];
        for i in 1..=19u8 {
            for (in_byte, out_byte) in file_encryption_key.iter().zip(key.iter_mut()) {
                *out_byte = in_byte ^ i;
            }
            result = Rc4::new(&key).encrypt(&result);
        }

        result.resize(32, 0);
        rand::rng().fill_bytes(&mut result[16..]);
        Ok(result)
    }

    fn authenticate_user_password_r4<U: AsRef<[u8]>>(&self, doc: &Document, user_password: U) -> Result<(), DecryptionError> {
        let hashed_user_password = match self.revision {
            2 => self.compute_hashed_user_password_r2(doc, &user_password)?,
            3 | 4 => self.compute_hashed_user_password_r3_r4(doc, &user_password)?,
            _ => return Err(DecryptionError::InvalidRevision),
        };
        let len = match self.revision {
            3 | 4 => 16,
            _ => hashed_user_password.len(),
        };

        let encrypted = doc.get_encrypted().map_err(|_| DecryptionError::MissingEncryptDictionary)?;
        let stored = encrypted.get(b"U").map_err(|_| DecryptionError::MissingUserPassword)?.as_str().map_err(|_| DecryptionError::InvalidType)?;

        if hashed_user_password[..len] != stored[..len.min(stored.len())] {
            return Err(DecryptionError::IncorrectPassword);
        }
        Ok(())
    }

    // --- Revision 6 (SHA-256/384/512 + AES-256), ISO 32000-2 Algorithms 2.A/2.B/8/9 -----------

    pub(crate) fn sanitize_password_r6(&self, password: &str) -> Result<Vec<u8>, DecryptionError> {
        let prepped = stringprep::saslprep(password)?;
        let mut bytes = prepped.into_owned().into_bytes();
        bytes.truncate(127);
        Ok(bytes)
    }

    /// Algorithm 2.B: the iterated hash used for every r6 derivation.
    fn hash_2b(password: &[u8], salt: &[u8], udata: &[u8]) -> Vec<u8> {
        let mut input = Vec::with_capacity(password.len() + salt.len() + udata.len());
        input.extend_from_slice(password);
        input.extend_from_slice(salt);
        input.extend_from_slice(udata);

        let mut k = Sha256::digest(&input).to_vec();
        let mut round = 0u32;
        loop {
            let mut k1 = Vec::with_capacity((password.len() + k.len() + udata.len()) * 64);
            for _ in 0..64 {
                k1.extend_from_slice(password);
                k1.extend_from_slice(&k);
                k1.extend_from_slice(udata);
            }

            let key = &k[0..16];
            let iv = &k[16..32];
            // AES-128-CBC, no padding: k1's length is a multiple of 16 by construction.
            let mut e = k1;
            let mut encryptor = cbc::Encryptor::<aes::Aes128>::new(key.into(), iv.into());
            for block in e.chunks_mut(16) {
                encryptor.encrypt_block_mut(aes::cipher::generic_array::GenericArray::from_mut_slice(block));
            }

            let sum: u32 = e[0..16].iter().map(|&b| b as u32).sum();
            k = match sum % 3 {
                0 => Sha256::digest(&e).to_vec(),
                1 => Sha384::digest(&e).to_vec(),
                _ => Sha512::digest(&e).to_vec(),
            };

            round += 1;
            if round >= 64 && (*e.last().unwrap() as u32) <= round - 32 {
                break;
            }
        }
        k.truncate(32);
        k
    }

    pub(crate) fn compute_hashed_user_password_r6(
        &self,
        file_encryption_key: &[u8],
        user_password: Vec<u8>,
    ) -> Result<(Vec<u8>, Vec<u8>), DecryptionError> {
        let mut validation_salt = [0u8; 8];
        let mut key_salt = [0u8; 8];
        rand::rng().fill_bytes(&mut validation_salt);
        rand::rng().fill_bytes(&mut key_salt);

        let mut u = Self::hash_2b(&user_password, &validation_salt, &[]);
        u.extend_from_slice(&validation_salt);
        u.extend_from_slice(&key_salt);

        let intermediate_key = Self::hash_2b(&user_password, &key_salt, &[]);
        let ue = aes_cbc_no_padding_encrypt(&intermediate_key, &[0u8; 16], file_encryption_key)?;

        Ok((u, ue))
    }

    pub(crate) fn compute_hashed_owner_password_r6(
        &self,
        file_encryption_key: &[u8],
        owner_password: Vec<u8>,
    ) -> Result<(Vec<u8>, Vec<u8>), DecryptionError> {
        let mut validation_salt = [0u8; 8];
        let mut key_salt = [0u8; 8];
        rand::rng().fill_bytes(&mut validation_salt);
        rand::rng().fill_bytes(&mut key_salt);

        let mut o = Self::hash_2b(&owner_password, &validation_salt, &self.user_value);
        o.extend_from_slice(&validation_salt);
        o.extend_from_slice(&key_salt);

        let intermediate_key = Self::hash_2b(&owner_password, &key_salt, &self.user_value);
        let oe = aes_cbc_no_padding_encrypt(&intermediate_key, &[0u8; 16], file_encryption_key)?;

        Ok((o, oe))
    }

    /// Algorithm: encodes `/P` and `/EncryptMetadata` into the encrypted `/Perms` entry.
    pub(crate) fn compute_permissions(&self, file_encryption_key: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        let mut block = [0u8; 16];
        block[0..4].copy_from_slice(&(self.permissions.bits() as u32).to_le_bytes());
        block[4..8].copy_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        block[8] = if self.encrypt_metadata { b'T' } else { b'F' };
        block[9..12].copy_from_slice(b"adb");
        rand::rng().fill_bytes(&mut block[12..16]);
        aes_ecb_no_padding_encrypt(file_encryption_key, &block)
    }

    fn authenticate_password_r6(&self, stored: &[u8], password: &[u8], udata: &[u8]) -> Result<(), DecryptionError> {
        if stored.len() < 48 {
            return Err(DecryptionError::InvalidHashLength);
        }
        let validation_salt = &stored[32..40];
        let hash = Self::hash_2b(password, validation_salt, udata);
        if hash != stored[0..32] {
            return Err(DecryptionError::IncorrectPassword);
        }
        Ok(())
    }

    // --- Dispatch --------------------------------------------------------------------------

    pub fn sanitize_password(&self, password: &str) -> Result<Vec<u8>, DecryptionError> {
        match self.revision {
            2..=4 => self.sanitize_password_r4(password),
            5 | 6 => self.sanitize_password_r6(password),
            _ => Err(DecryptionError::UnsupportedRevision),
        }
    }

    pub fn compute_file_encryption_key<P: AsRef<[u8]>>(&self, doc: &Document, password: P) -> Result<Vec<u8>, DecryptionError> {
        match self.revision {
            2..=4 => self.compute_file_encryption_key_r4(doc, password),
            5 | 6 => self.compute_file_encryption_key_r6(doc, password.as_ref()),
            _ => Err(DecryptionError::UnsupportedRevision),
        }
    }

    fn compute_file_encryption_key_r6(&self, doc: &Document, password: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        let encrypted = doc.get_encrypted().map_err(|_| DecryptionError::MissingEncryptDictionary)?;
        let password = stringprep::saslprep(std::str::from_utf8(password).unwrap_or_default())
            .map(|p| p.into_owned().into_bytes())
            .unwrap_or_else(|_| password.to_vec());

        let u = encrypted.get(b"U").map_err(|_| DecryptionError::MissingUserPassword)?.as_str().map_err(|_| DecryptionError::InvalidType)?;
        if self.authenticate_password_r6(u, &password, &[]).is_ok() {
            let key_salt = &u[40..48];
            let intermediate_key = Self::hash_2b(&password, key_salt, &[]);
            let ue = encrypted.get(b"UE").map_err(|_| DecryptionError::MissingUserPassword)?.as_str().map_err(|_| DecryptionError::InvalidType)?;
            return aes_cbc_no_padding_decrypt(&intermediate_key, &[0u8; 16], ue);
        }

        let o = encrypted.get(b"O").map_err(|_| DecryptionError::MissingOwnerPassword)?.as_str().map_err(|_| DecryptionError::InvalidType)?;
        self.authenticate_password_r6(o, &password, u)?;
        let key_salt = &o[40..48];
        let intermediate_key = Self::hash_2b(&password, key_salt, u);
        let oe = encrypted.get(b"OE").map_err(|_| DecryptionError::MissingOwnerPassword)?.as_str().map_err(|_| DecryptionError::InvalidType)?;
        aes_cbc_no_padding_decrypt(&intermediate_key, &[0u8; 16], oe)
    }

    pub fn compute_hashed_owner_password<O: AsRef<[u8]>, U: AsRef<[u8]>>(
        &self,
        owner_password: Option<O>,
        user_password: U,
    ) -> Result<Vec<u8>, DecryptionError> {
        match self.revision {
            2..=4 => self.compute_hashed_owner_password_r4(owner_password, user_password),
            _ => Err(DecryptionError::UnsupportedRevision),
        }
    }

    pub fn authenticate_user_password<U: AsRef<[u8]>>(&self, doc: &Document, user_password: U) -> Result<(), DecryptionError> {
        match self.revision {
            2..=4 => self.authenticate_user_password_r4(doc, user_password),
            5 | 6 => {
                let encrypted = doc.get_encrypted().map_err(|_| DecryptionError::MissingEncryptDictionary)?;
                let u = encrypted.get(b"U").map_err(|_| DecryptionError::MissingUserPassword)?.as_str().map_err(|_| DecryptionError::InvalidType)?;
                self.authenticate_password_r6(u, user_password.as_ref(), &[])
            }
            _ => Err(DecryptionError::UnsupportedRevision),
        }
    }
}

fn aes_cbc_no_padding_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, DecryptionError> {
    if key.len() != 32 || data.len() % 16 != 0 {
        return Err(DecryptionError::InvalidKeyLength);
    }
    let mut buf = data.to_vec();
    let mut encryptor = Aes256CbcEnc::new(key.into(), iv.into());
    for block in buf.chunks_mut(16) {
        encryptor.encrypt_block_mut(aes::cipher::generic_array::GenericArray::from_mut_slice(block));
    }
    Ok(buf)
}

fn aes_cbc_no_padding_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, DecryptionError> {
    if key.len() != 32 || data.len() % 16 != 0 {
        return Err(DecryptionError::InvalidKeyLength);
    }
    let mut buf = data.to_vec();
    let mut decryptor = Aes256CbcDec::new(key.into(), iv.into());
    for block in buf.chunks_mut(16) {
        decryptor.decrypt_block_mut(aes::cipher::generic_array::GenericArray::from_mut_slice(block));
    }
    Ok(buf)
}

fn aes_ecb_no_padding_encrypt(key: &[u8], block: &[u8; 16]) -> Result<Vec<u8>, DecryptionError> {
    use aes::cipher::KeyInit;
    if key.len() != 32 {
        return Err(DecryptionError::InvalidKeyLength);
    }
    let mut buf = *block;
    let mut cipher = ecb::Encryptor::<aes::Aes256>::new(key.into());
    cipher.encrypt_block_mut(aes::cipher::generic_array::GenericArray::from_mut_slice(&mut buf));
    Ok(buf.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_2b_is_deterministic_for_the_same_inputs() {
        let a = PasswordAlgorithm::hash_2b(b"password", b"saltsalt", b"");
        let b = PasswordAlgorithm::hash_2b(b"password", b"saltsalt", b"");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn hash_2b_differs_for_different_passwords() {
        let a = PasswordAlgorithm::hash_2b(b"password", b"saltsalt", b"");
        let b = PasswordAlgorithm::hash_2b(b"different", b"saltsalt", b"");
        assert_ne!(a, b);
    }

    #[test]
    fn aes_cbc_no_padding_round_trips() {
        let key = [7u8; 32];
        let iv = [0u8; 16];
        let data = [1u8; 32];
        let encrypted = aes_cbc_no_padding_encrypt(&key, &iv, &data).unwrap();
        let decrypted = aes_cbc_no_padding_decrypt(&key, &iv, &encrypted).unwrap();
        assert_eq!(decrypted, data);
    }
}
