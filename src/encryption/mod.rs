//! Security handler (spec §4.10): password-based key derivation, the RC4/AES crypt filters
//! strings and streams are run through, and the `/Encrypt` dictionary's wire format. Ported
//! closely from the upstream `lopdf` encryption module this crate's dependency stack (aes, cbc,
//! ecb, md-5, sha2, stringprep, bitflags) was chosen to support.

mod algorithms;
pub mod crypt_filters;
mod pkcs5;
mod rc4;

use bitflags::bitflags;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::{Dictionary, Document, Error, Object, ObjectId};
use crypt_filters::*;

pub use algorithms::PasswordAlgorithm;
pub use crypt_filters::{Aes128CryptFilter, Aes256CryptFilter, CryptFilter, IdentityCryptFilter, Rc4CryptFilter};

#[derive(Error, Debug)]
pub enum DecryptionError {
    #[error("the /Encrypt dictionary is missing")]
    MissingEncryptDictionary,
    #[error("missing encryption version")]
    MissingVersion,
    #[error("missing encryption revision")]
    MissingRevision,
    #[error("missing the owner password (/O)")]
    MissingOwnerPassword,
    #[error("missing the user password (/U)")]
    MissingUserPassword,
    #[error("missing the permissions field (/P)")]
    MissingPermissions,
    #[error("missing the file /ID elements")]
    MissingFileID,

    #[error("invalid hash length")]
    InvalidHashLength,
    #[error("invalid key length")]
    InvalidKeyLength,
    #[error("invalid ciphertext length")]
    InvalidCipherTextLength,
    #[error("invalid permission length")]
    InvalidPermissionLength,
    #[error("invalid version")]
    InvalidVersion,
    #[error("invalid revision")]
    InvalidRevision,
    #[error("unexpected type; document does not comply with the expected encryption layout")]
    InvalidType,

    #[error("the supplied password is incorrect")]
    IncorrectPassword,

    #[error("the document uses an encryption scheme this crate does not implement")]
    UnsupportedEncryption,
    #[error("the encryption version is not implemented")]
    UnsupportedVersion,
    #[error("the encryption revision is not implemented")]
    UnsupportedRevision,

    #[error(transparent)]
    StringPrep(#[from] stringprep::Error),
    #[error("invalid padding encountered when decrypting, key might be incorrect")]
    Padding,
}

bitflags! {
    /// `/P` permission bits (spec §4.10). Bits not assigned a meaning must be forced to the
    /// value ISO 32000-2 mandates for them, which [`Permissions::correct_bits`] does.
    #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
    pub struct Permissions: u64 {
        const PRINTABLE = 1 << 2;
        const MODIFIABLE = 1 << 3;
        const COPYABLE = 1 << 4;
        const ANNOTABLE = 1 << 5;
        const FILLABLE = 1 << 8;
        const COPYABLE_FOR_ACCESSIBILITY = 1 << 9;
        const ASSEMBLABLE = 1 << 10;
        const PRINTABLE_IN_HIGH_QUALITY = 1 << 11;
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::all()
    }
}

impl Permissions {
    fn correct_bits(self) -> Self {
        let mut bits = self.bits();
        bits |= 0b11 << 6;
        bits |= 0b1111 << 12 | 0xffff << 16;
        bits |= 0xffffffffu64 << 32;
        Permissions::from_bits_retain(bits)
    }
}

/// Which revision/version combination to set up a freshly-encrypted document with (spec §4.10).
#[derive(Clone, Debug)]
pub enum EncryptionVersion<'a> {
    V1 {
        document: &'a Document,
        owner_password: &'a str,
        user_password: &'a str,
        permissions: Permissions,
    },
    V2 {
        document: &'a Document,
        owner_password: &'a str,
        user_password: &'a str,
        key_length: usize,
        permissions: Permissions,
    },
    V4 {
        document: &'a Document,
        encrypt_metadata: bool,
        crypt_filters: BTreeMap<Vec<u8>, Arc<dyn CryptFilter>>,
        stream_filter: Vec<u8>,
        string_filter: Vec<u8>,
        owner_password: &'a str,
        user_password: &'a str,
        permissions: Permissions,
    },
    V5 {
        encrypt_metadata: bool,
        crypt_filters: BTreeMap<Vec<u8>, Arc<dyn CryptFilter>>,
        file_encryption_key: &'a [u8],
        stream_filter: Vec<u8>,
        string_filter: Vec<u8>,
        owner_password: &'a str,
        user_password: &'a str,
        permissions: Permissions,
    },
}

#[derive(Clone, Debug, Default)]
pub struct EncryptionState {
    pub(crate) version: i64,
    pub(crate) revision: i64,
    pub(crate) key_length: Option<usize>,
    pub(crate) encrypt_metadata: bool,
    pub(crate) crypt_filters: BTreeMap<Vec<u8>, Arc<dyn CryptFilter>>,
    pub(crate) file_encryption_key: Vec<u8>,
    pub(crate) stream_filter: Vec<u8>,
    pub(crate) string_filter: Vec<u8>,
    pub(crate) owner_value: Vec<u8>,
    pub(crate) owner_encrypted: Vec<u8>,
    pub(crate) user_value: Vec<u8>,
    pub(crate) user_encrypted: Vec<u8>,
    pub(crate) permissions: Permissions,
    pub(crate) permission_encrypted: Vec<u8>,
}

impl TryFrom<EncryptionVersion<'_>> for EncryptionState {
    type Error = Error;

    fn try_from(version: EncryptionVersion) -> std::result::Result<EncryptionState, Self::Error> {
        match version {
            EncryptionVersion::V1 { document, owner_password, user_password, permissions } => {
                let permissions = permissions.correct_bits();
                let mut algorithm = PasswordAlgorithm {
                    encrypt_metadata: true,
                    length: None,
                    version: 1,
                    revision: 2,
                    permissions,
                    ..Default::default()
                };
                let owner_password = algorithm.sanitize_password_r4(owner_password)?;
                let user_password = algorithm.sanitize_password_r4(user_password)?;
                algorithm.owner_value =
                    algorithm.compute_hashed_owner_password_r4(Some(&owner_password), &user_password)?;
                algorithm.user_value = algorithm.compute_hashed_user_password_r2(document, &user_password)?;
                let file_encryption_key = algorithm.compute_file_encryption_key_r4(document, &user_password)?;
                Ok(Self {
                    version: algorithm.version,
                    revision: algorithm.revision,
                    key_length: algorithm.length,
                    encrypt_metadata: algorithm.encrypt_metadata,
                    file_encryption_key,
                    owner_value: algorithm.owner_value,
                    user_value: algorithm.user_value,
                    permissions: algorithm.permissions,
                    ..Default::default()
                })
            }
            EncryptionVersion::V2 { document, owner_password, user_password, key_length, permissions } => {
                let permissions = permissions.correct_bits();
                let mut algorithm = PasswordAlgorithm {
                    encrypt_metadata: true,
                    length: Some(key_length),
                    version: 2,
                    revision: 3,
                    permissions,
                    ..Default::default()
                };
                let owner_password = algorithm.sanitize_password_r4(owner_password)?;
                let user_password = algorithm.sanitize_password_r4(user_password)?;
                algorithm.owner_value =
                    algorithm.compute_hashed_owner_password_r4(Some(&owner_password), &user_password)?;
                algorithm.user_value = algorithm.compute_hashed_user_password_r3_r4(document, &user_password)?;
                let file_encryption_key = algorithm.compute_file_encryption_key_r4(document, &user_password)?;
                Ok(Self {
                    version: algorithm.version,
                    revision: algorithm.revision,
                    key_length: algorithm.length,
                    encrypt_metadata: algorithm.encrypt_metadata,
                    file_encryption_key,
                    owner_value: algorithm.owner_value,
                    user_value: algorithm.user_value,
                    permissions,
                    ..Default::default()
                })
            }
            EncryptionVersion::V4 {
                document,
                encrypt_metadata,
                crypt_filters,
                stream_filter,
                string_filter,
                owner_password,
                user_password,
                permissions,
            } => {
                let permissions = permissions.correct_bits();
                let mut algorithm = PasswordAlgorithm {
                    encrypt_metadata,
                    length: Some(128),
                    version: 4,
                    revision: 4,
                    permissions,
                    ..Default::default()
                };
                let owner_password = algorithm.sanitize_password_r4(owner_password)?;
                let user_password = algorithm.sanitize_password_r4(user_password)?;
                algorithm.owner_value =
                    algorithm.compute_hashed_owner_password_r4(Some(&owner_password), &user_password)?;
                algorithm.user_value = algorithm.compute_hashed_user_password_r3_r4(document, &user_password)?;
                let file_encryption_key = algorithm.compute_file_encryption_key_r4(document, &user_password)?;
                Ok(Self {
                    version: algorithm.version,
                    revision: algorithm.revision,
                    key_length: algorithm.length,
                    encrypt_metadata: algorithm.encrypt_metadata,
                    file_encryption_key,
                    crypt_filters,
                    stream_filter,
                    string_filter,
                    owner_value: algorithm.owner_value,
                    user_value: algorithm.user_value,
                    permissions: algorithm.permissions,
                    ..Default::default()
                })
            }
            EncryptionVersion::V5 {
                encrypt_metadata,
                crypt_filters,
                file_encryption_key,
                stream_filter,
                string_filter,
                owner_password,
                user_password,
                permissions,
            } => {
                if file_encryption_key.len() != 32 {
                    return Err(DecryptionError::InvalidKeyLength)?;
                }
                let permissions = permissions.correct_bits();
                let mut algorithm = PasswordAlgorithm {
                    encrypt_metadata,
                    version: 5,
                    revision: 6,
                    permissions,
                    ..Default::default()
                };
                let owner_password = algorithm.sanitize_password_r6(owner_password)?;
                let user_password = algorithm.sanitize_password_r6(user_password)?;
                let (user_value, user_encrypted) =
                    algorithm.compute_hashed_user_password_r6(file_encryption_key, user_password)?;
                algorithm.user_value = user_value;
                algorithm.user_encrypted = user_encrypted;
                let (owner_value, owner_encrypted) =
                    algorithm.compute_hashed_owner_password_r6(file_encryption_key, owner_password)?;
                algorithm.owner_value = owner_value;
                algorithm.owner_encrypted = owner_encrypted;
                algorithm.permission_encrypted = algorithm.compute_permissions(file_encryption_key)?;
                Ok(Self {
                    version: algorithm.version,
                    revision: algorithm.revision,
                    key_length: algorithm.length,
                    encrypt_metadata: algorithm.encrypt_metadata,
                    crypt_filters,
                    file_encryption_key: file_encryption_key.to_vec(),
                    stream_filter,
                    string_filter,
                    owner_value: algorithm.owner_value,
                    owner_encrypted: algorithm.owner_encrypted,
                    user_value: algorithm.user_value,
                    user_encrypted: algorithm.user_encrypted,
                    permissions: algorithm.permissions,
                    permission_encrypted: algorithm.permission_encrypted,
                })
            }
        }
    }
}

impl EncryptionState {
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    pub fn key_length(&self) -> Option<usize> {
        self.key_length
    }

    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    pub fn crypt_filters(&self) -> &BTreeMap<Vec<u8>, Arc<dyn CryptFilter>> {
        &self.crypt_filters
    }

    pub fn file_encryption_key(&self) -> &[u8] {
        self.file_encryption_key.as_ref()
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    /// Derives an [`EncryptionState`] from `document`'s `/Encrypt` dictionary and a candidate
    /// password, authenticating either the user or the owner password along the way (spec
    /// §4.10 Algorithms 6/7/2.A).
    pub fn decode<P: AsRef<[u8]>>(document: &Document, password: P) -> Result<Self, Error> {
        if !document.is_encrypted() {
            return Err(Error::NotEncrypted);
        }

        let filter = document
            .get_encrypted()
            .and_then(|dict| dict.get(b"Filter"))
            .and_then(|object| object.as_name())
            .map_err(|_| Error::DictKey("Filter".to_string()))?;

        if filter != b"Standard" {
            return Err(Error::UnsupportedSecurityHandler(filter.to_vec()));
        }

        let algorithm = PasswordAlgorithm::try_from(document)?;
        // Revisions 5/6 authenticate as part of unwrapping the file key below (trying the user
        // then owner password); only 2-4 need a standalone check first.
        if algorithm.revision <= 4 {
            algorithm.authenticate_user_password(document, &password)?;
        }
        let file_encryption_key = algorithm.compute_file_encryption_key(document, password)?;

        let mut crypt_filters = document.get_crypt_filters();
        if algorithm.version < 4 {
            crypt_filters.clear();
        }

        let mut state = Self {
            version: algorithm.version,
            revision: algorithm.revision,
            key_length: algorithm.length,
            encrypt_metadata: algorithm.encrypt_metadata,
            crypt_filters,
            file_encryption_key,
            owner_value: algorithm.owner_value,
            owner_encrypted: algorithm.owner_encrypted,
            user_value: algorithm.user_value,
            user_encrypted: algorithm.user_encrypted,
            permissions: algorithm.permissions,
            permission_encrypted: algorithm.permission_encrypted,
            ..Default::default()
        };

        if algorithm.version == 4 || algorithm.version == 5 {
            if let Ok(stream_filter) =
                document.get_encrypted().and_then(|dict| dict.get(b"StmF")).and_then(|object| object.as_name())
            {
                state.stream_filter = stream_filter.to_vec();
            }
            if let Ok(string_filter) =
                document.get_encrypted().and_then(|dict| dict.get(b"StrF")).and_then(|object| object.as_name())
            {
                state.string_filter = string_filter.to_vec();
            }
        }

        Ok(state)
    }

    /// Serializes this state back into an `/Encrypt` dictionary, the inverse of [`Self::decode`].
    pub fn encode(&self) -> std::result::Result<Dictionary, DecryptionError> {
        let mut encrypted = Dictionary::new();
        encrypted.set("Filter", Object::name("Standard"));
        encrypted.set("V", Object::Integer(self.version));
        encrypted.set("R", Object::Integer(self.revision));

        if let Some(key_length) = self.key_length {
            encrypted.set("Length", Object::Integer(key_length as i64));
        }
        if self.version >= 4 {
            encrypted.set("EncryptMetadata", Object::Boolean(self.encrypt_metadata));
        }

        encrypted.set("O", Object::string_literal(self.owner_value.clone()));
        encrypted.set("U", Object::string_literal(self.user_value.clone()));
        encrypted.set("P", Object::Integer(self.permissions.bits() as i64));

        if self.revision >= 4 {
            let mut filters = Dictionary::new();
            for (name, crypt_filter) in &self.crypt_filters {
                let mut filter = Dictionary::new();
                filter.set("Type", Object::name("CryptFilter"));
                filter.set("CFM", Object::Name(crypt_filter.method().to_vec()));
                filters.set(name.to_vec(), Object::Dictionary(filter));
            }
            encrypted.set("CF", Object::Dictionary(filters));
            encrypted.set("StmF", Object::Name(self.stream_filter.clone()));
            encrypted.set("StrF", Object::Name(self.string_filter.clone()));
        }

        if self.revision >= 5 {
            encrypted.set("OE", Object::string_literal(self.owner_encrypted.clone()));
            encrypted.set("UE", Object::string_literal(self.user_encrypted.clone()));
            encrypted.set("Perms", Object::string_literal(self.permission_encrypted.clone()));
        }

        Ok(encrypted)
    }

    pub fn get_stream_filter(&self) -> Arc<dyn CryptFilter> {
        self.crypt_filters.get(&self.stream_filter).cloned().unwrap_or_else(|| Arc::new(Rc4CryptFilter))
    }

    pub fn get_string_filter(&self) -> Arc<dyn CryptFilter> {
        self.crypt_filters.get(&self.string_filter).cloned().unwrap_or_else(|| Arc::new(Rc4CryptFilter))
    }
}

fn crypt_filter_override(obj: &Object, state: &EncryptionState) -> Option<Arc<dyn CryptFilter>> {
    let stream = obj.as_stream().ok()?;
    let names = crate::filters::stream_filter_names(&stream.dict).ok()?;
    if !names.iter().any(|n| n == b"Crypt") {
        return None;
    }
    let parms = stream.dict.get(b"DecodeParms").ok()?.as_dict().ok()?;
    let name = parms.get(b"Name").ok()?.as_name().ok()?;
    Some(state.crypt_filters.get(name).cloned().unwrap_or_else(|| Arc::new(IdentityCryptFilter)))
}

/// Encrypts `obj` in place (spec §4.10). The xref stream itself, and strings inside it, are
/// never encrypted; neither is `/Metadata` when `EncryptMetadata` is false.
pub fn encrypt_object(
    state: &EncryptionState,
    obj_id: ObjectId,
    obj: &mut Object,
) -> std::result::Result<(), DecryptionError> {
    if obj.as_stream().map(|s| s.dict.has_type(b"XRef")).unwrap_or(false) {
        return Ok(());
    }
    if obj.type_name().ok() == Some(b"Metadata") && !state.encrypt_metadata {
        return Ok(());
    }

    let override_filter = crypt_filter_override(obj, state);
    let (mut crypt_filter, plaintext) = match obj {
        Object::Array(objects) => {
            for o in objects {
                encrypt_object(state, obj_id, o)?;
            }
            return Ok(());
        }
        Object::Dictionary(dict) => {
            for (_, o) in dict.iter_mut() {
                encrypt_object(state, obj_id, o)?;
            }
            return Ok(());
        }
        Object::String(content, _) => (state.get_string_filter(), content.clone()),
        Object::Stream(stream) => (state.get_stream_filter(), stream.content.clone()),
        _ => return Ok(()),
    };
    if let Some(filter) = override_filter {
        crypt_filter = filter;
    }

    let key = crypt_filter.compute_key(&state.file_encryption_key, obj_id)?;
    let ciphertext = crypt_filter.encrypt(&key, &plaintext)?;
    match obj {
        Object::Stream(stream) => stream.set_plain_content(ciphertext),
        Object::String(content, _) => *content = ciphertext,
        _ => (),
    }
    Ok(())
}

/// Decrypts `obj` in place, the inverse of [`encrypt_object`].
pub fn decrypt_object(
    state: &EncryptionState,
    obj_id: ObjectId,
    obj: &mut Object,
) -> std::result::Result<(), DecryptionError> {
    if obj.as_stream().map(|s| s.dict.has_type(b"XRef")).unwrap_or(false) {
        return Ok(());
    }
    if obj.type_name().ok() == Some(b"Metadata") && !state.encrypt_metadata {
        return Ok(());
    }

    let override_filter = crypt_filter_override(obj, state);
    let (mut crypt_filter, ciphertext) = match obj {
        Object::Array(objects) => {
            for o in objects {
                decrypt_object(state, obj_id, o)?;
            }
            return Ok(());
        }
        Object::Dictionary(dict) => {
            for (_, o) in dict.iter_mut() {
                decrypt_object(state, obj_id, o)?;
            }
            return Ok(());
        }
        Object::String(content, _) => (state.get_string_filter(), content.clone()),
        Object::Stream(stream) => (state.get_stream_filter(), stream.content.clone()),
        _ => return Ok(()),
    };
    if let Some(filter) = override_filter {
        crypt_filter = filter;
    }

    let key = crypt_filter.compute_key(&state.file_encryption_key, obj_id)?;
    let plaintext = crypt_filter.decrypt(&key, &ciphertext)?;
    match obj {
        Object::Stream(stream) => stream.content = plaintext,
        Object::String(content, _) => *content = plaintext,
        _ => (),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::rc4::Rc4;
    use crate::creator::tests::create_document;
    use crate::encryption::{Aes128CryptFilter, Aes256CryptFilter, CryptFilter};
    use crate::{EncryptionState, EncryptionVersion, Permissions};
    use rand::RngCore;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[test]
    fn rc4_matches_known_vectors() {
        let cases = [
            (String::from("Key"), String::from("Plaintext"), "BBF316E8D940AF0AD3"),
            (String::from("Wiki"), String::from("pedia"), "1021BF0420"),
        ];
        for (key, plain, cipher_hex) in cases {
            let cipher_bytes: Vec<u8> = (0..cipher_hex.len())
                .step_by(2)
                .map(|i| u8::from_str_radix(&cipher_hex[i..i + 2], 16).unwrap())
                .collect();
            let decrypted = Rc4::new(key.as_bytes()).process(&cipher_bytes);
            assert_eq!(plain.as_bytes(), &decrypted[..]);
        }
    }

    #[test]
    fn encrypt_decrypt_round_trip_v1() {
        let mut document = create_document();
        let version = EncryptionVersion::V1 {
            document: &document,
            owner_password: "owner",
            user_password: "user",
            permissions: Permissions::all(),
        };
        let state = EncryptionState::try_from(version).unwrap();
        document.encrypt(&state).unwrap();
        document.decrypt("user").unwrap();
    }

    #[test]
    fn encrypt_decrypt_round_trip_v2() {
        let mut document = create_document();
        let version = EncryptionVersion::V2 {
            document: &document,
            owner_password: "owner",
            user_password: "user",
            key_length: 40,
            permissions: Permissions::all(),
        };
        let state = EncryptionState::try_from(version).unwrap();
        document.encrypt(&state).unwrap();
        document.decrypt("user").unwrap();
    }

    #[test]
    fn encrypt_decrypt_round_trip_v4_aes128() {
        let mut document = create_document();
        let crypt_filter: Arc<dyn CryptFilter> = Arc::new(Aes128CryptFilter);
        let version = EncryptionVersion::V4 {
            document: &document,
            encrypt_metadata: true,
            crypt_filters: BTreeMap::from([(b"StdCF".to_vec(), crypt_filter)]),
            stream_filter: b"StdCF".to_vec(),
            string_filter: b"StdCF".to_vec(),
            owner_password: "owner",
            user_password: "user",
            permissions: Permissions::all(),
        };
        let state = EncryptionState::try_from(version).unwrap();
        document.encrypt(&state).unwrap();
        document.decrypt("user").unwrap();
    }

    #[test]
    fn encrypt_decrypt_round_trip_v5_aes256() {
        let mut document = create_document();
        let crypt_filter: Arc<dyn CryptFilter> = Arc::new(Aes256CryptFilter);
        let mut file_encryption_key = [0u8; 32];
        rand::rng().fill_bytes(&mut file_encryption_key);
        let version = EncryptionVersion::V5 {
            encrypt_metadata: true,
            crypt_filters: BTreeMap::from([(b"StdCF".to_vec(), crypt_filter)]),
            file_encryption_key: &file_encryption_key,
            stream_filter: b"StdCF".to_vec(),
            string_filter: b"StdCF".to_vec(),
            owner_password: "owner",
            user_password: "user",
            permissions: Permissions::all(),
        };
        let state = EncryptionState::try_from(version).unwrap();
        document.encrypt(&state).unwrap();
        document.decrypt("user").unwrap();
    }

    #[test]
    fn wrong_password_fails_to_decrypt() {
        let mut document = create_document();
        let version = EncryptionVersion::V2 {
            document: &document,
            owner_password: "owner",
            user_password: "user",
            key_length: 128,
            permissions: Permissions::all(),
        };
        let state = EncryptionState::try_from(version).unwrap();
        document.encrypt(&state).unwrap();
        assert!(document.decrypt("wrong").is_err());
    }
}
