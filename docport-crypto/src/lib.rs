//! Field-level encryption contracts.
//!
//! This crate defines the roles involved in encrypting individual document
//! fields and ships no cryptographic algorithm of its own. Applications
//! bring their implementations of [`Encrypter`], [`Decrypter`] and
//! [`Keyring`], register them with a [`DefaultCryptoManager`], and use
//! [`encrypt_field`]/[`decrypt_field`] to swap a document field for its
//! encrypted envelope and back.
//!
//! Encrypted fields are renamed with a mangle prefix (default
//! [`DEFAULT_MANGLE_PREFIX`]) so that readers can tell at a glance, and
//! without guessing at the payload, which fields carry ciphertext.

use std::fmt;

use serde_json::{Map, Value};

mod error;
mod keyring;
mod manager;

pub use crate::error::{CryptoError, Result};
pub use crate::keyring::InsecureKeyring;
pub use crate::manager::{
    DEFAULT_ENCRYPTER_ALIAS, DEFAULT_MANGLE_PREFIX, DefaultCryptoManager, decrypt_field,
    encrypt_field,
};

/// Envelope member naming the algorithm, present in every envelope.
const ALG: &str = "alg";

/// A key handed out by a [`Keyring`]: opaque material plus the identifier
/// it was requested under.
#[derive(Clone, PartialEq, Eq)]
pub struct Key {
    pub id: String,
    pub material: Vec<u8>,
}

impl Key {
    pub fn new(id: impl Into<String>, material: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            material: material.into(),
        }
    }
}

// Key material stays out of Debug output and therefore out of logs.
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("id", &self.id)
            .field("material", &format_args!("<{} bytes>", self.material.len()))
            .finish()
    }
}

/// The JSON-object envelope an [`Encrypter`] produces and a [`Decrypter`]
/// consumes.
///
/// The `alg` member is mandatory and routes decryption; every other member
/// (key id, ciphertext, iv, signature, ...) is defined by the algorithm
/// implementation. The envelope converts to and from [`serde_json::Value`]
/// so it can be stored inside a document in place of the plaintext field.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptionResult {
    algorithm: String,
    entries: Map<String, Value>,
}

impl EncryptionResult {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            entries: Map::new(),
        }
    }

    /// Parses an envelope out of a document value.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidCipherText`] when the value is not an
    /// object or has no string `alg` member.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut entries) = value else {
            return Err(CryptoError::InvalidCipherText(
                "envelope is not a json object".to_string(),
            ));
        };
        match entries.remove(ALG) {
            Some(Value::String(algorithm)) => Ok(Self { algorithm, entries }),
            _ => Err(CryptoError::InvalidCipherText(format!(
                "envelope has no string {ALG:?} member"
            ))),
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Adds an implementation-defined member. An `alg` member set here is
    /// overridden by the envelope's own algorithm on serialization.
    pub fn put(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn into_value(self) -> Value {
        let Self {
            algorithm,
            mut entries,
        } = self;
        entries.insert(ALG.to_string(), Value::String(algorithm));
        Value::Object(entries)
    }
}

impl TryFrom<Value> for EncryptionResult {
    type Error = CryptoError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<EncryptionResult> for Value {
    fn from(envelope: EncryptionResult) -> Self {
        envelope.into_value()
    }
}

/// Produces encrypted envelopes from plaintext bytes.
///
/// An implementation owns everything about its algorithm: which keyring
/// and key it uses, how the ciphertext is encoded, which extra envelope
/// members it writes.
pub trait Encrypter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptionResult>;
}

/// Recovers plaintext bytes from envelopes of one algorithm.
pub trait Decrypter {
    /// The `alg` value this decrypter handles; the registry dispatches on it.
    fn algorithm(&self) -> &str;

    fn decrypt(&self, encrypted: &EncryptionResult) -> Result<Vec<u8>>;
}

/// Resolves key identifiers to key material.
pub trait Keyring {
    /// # Errors
    ///
    /// Returns [`CryptoError::CryptoKeyNotFound`] for an unknown id.
    fn get(&self, key_id: &str) -> Result<Key>;
}

/// Routes encryption and decryption requests and owns the field-name
/// mangling scheme. [`DefaultCryptoManager`] is the stock implementation.
pub trait CryptoManager {
    /// Encrypts with the encrypter registered under `encrypter_alias`,
    /// or under the default alias when `None`.
    fn encrypt(&self, plaintext: &[u8], encrypter_alias: Option<&str>) -> Result<EncryptionResult>;

    /// Decrypts an envelope with the decrypter registered for its `alg`.
    fn decrypt(&self, encrypted: &EncryptionResult) -> Result<Vec<u8>>;

    /// Prepends the mangle prefix to a field name.
    fn mangle(&self, field_name: &str) -> String;

    /// Strips the mangle prefix; an unmangled name is an error.
    fn demangle(&self, field_name: &str) -> Result<String>;

    fn is_mangled(&self, field_name: &str) -> bool;
}
