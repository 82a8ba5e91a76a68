use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{CryptoError, CryptoManager, Decrypter, Encrypter, EncryptionResult, Result};

/// Alias used when [`CryptoManager::encrypt`] is called without one.
pub const DEFAULT_ENCRYPTER_ALIAS: &str = "__DEFAULT__";

/// Prefix marking encrypted fields in a document.
pub const DEFAULT_MANGLE_PREFIX: &str = "__crypt_";

/// The stock [`CryptoManager`]: a registry of encrypters by alias and
/// decrypters by algorithm name.
///
/// Registration happens once at setup; afterwards the manager is used
/// read-only, so it can sit behind an [`Arc`] shared with every document
/// processing site.
pub struct DefaultCryptoManager {
    encrypters: HashMap<String, Arc<dyn Encrypter>>,
    decrypters: HashMap<String, Arc<dyn Decrypter>>,
    prefix: String,
}

impl DefaultCryptoManager {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_MANGLE_PREFIX)
    }

    /// A manager whose mangled fields carry `prefix` instead of
    /// [`DEFAULT_MANGLE_PREFIX`].
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            encrypters: HashMap::new(),
            decrypters: HashMap::new(),
            prefix: prefix.into(),
        }
    }

    /// Registers an encrypter under an alias.
    ///
    /// # Errors
    ///
    /// Each alias can be registered once.
    pub fn register_encrypter(
        &mut self,
        alias: impl Into<String>,
        encrypter: Arc<dyn Encrypter>,
    ) -> Result<()> {
        let alias = alias.into();
        if self.encrypters.contains_key(&alias) {
            return Err(CryptoError::EncrypterAlreadyRegistered(alias));
        }
        self.encrypters.insert(alias, encrypter);
        Ok(())
    }

    /// Registers the encrypter used when no alias is given.
    pub fn register_default_encrypter(&mut self, encrypter: Arc<dyn Encrypter>) -> Result<()> {
        self.register_encrypter(DEFAULT_ENCRYPTER_ALIAS, encrypter)
    }

    /// Registers a decrypter for the algorithm it reports.
    ///
    /// # Errors
    ///
    /// Each algorithm can be registered once.
    pub fn register_decrypter(&mut self, decrypter: Arc<dyn Decrypter>) -> Result<()> {
        let algorithm = decrypter.algorithm().to_string();
        if self.decrypters.contains_key(&algorithm) {
            return Err(CryptoError::DecrypterAlreadyRegistered(algorithm));
        }
        self.decrypters.insert(algorithm, decrypter);
        Ok(())
    }
}

impl Default for DefaultCryptoManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoManager for DefaultCryptoManager {
    fn encrypt(
        &self,
        plaintext: &[u8],
        encrypter_alias: Option<&str>,
    ) -> Result<EncryptionResult> {
        let alias = encrypter_alias.unwrap_or(DEFAULT_ENCRYPTER_ALIAS);
        let encrypter = self
            .encrypters
            .get(alias)
            .ok_or_else(|| CryptoError::EncrypterNotFound(alias.to_string()))?;
        encrypter.encrypt(plaintext)
    }

    fn decrypt(&self, encrypted: &EncryptionResult) -> Result<Vec<u8>> {
        let algorithm = encrypted.algorithm();
        let decrypter = self
            .decrypters
            .get(algorithm)
            .ok_or_else(|| CryptoError::DecrypterNotFound(algorithm.to_string()))?;
        decrypter.decrypt(encrypted)
    }

    fn mangle(&self, field_name: &str) -> String {
        format!("{}{field_name}", self.prefix)
    }

    fn demangle(&self, field_name: &str) -> Result<String> {
        field_name
            .strip_prefix(&self.prefix)
            .map(str::to_string)
            .ok_or_else(|| CryptoError::MangleError(field_name.to_string()))
    }

    fn is_mangled(&self, field_name: &str) -> bool {
        field_name.starts_with(&self.prefix)
    }
}

/// Replaces `doc[field]` with `doc[mangle(field)]` holding the encrypted
/// envelope. The plaintext is the field value serialized as JSON, so any
/// value type can be encrypted, not just strings.
///
/// # Errors
///
/// Fails when the field is absent or the manager cannot encrypt.
pub fn encrypt_field(
    doc: &mut Map<String, Value>,
    field: &str,
    manager: &dyn CryptoManager,
    encrypter_alias: Option<&str>,
) -> Result<()> {
    let value = doc
        .remove(field)
        .ok_or_else(|| CryptoError::EncryptionFailure(format!("no field {field:?} to encrypt")))?;
    let plaintext =
        serde_json::to_vec(&value).map_err(|e| CryptoError::EncryptionFailure(e.to_string()))?;
    let envelope = manager.encrypt(&plaintext, encrypter_alias)?;
    doc.insert(manager.mangle(field), envelope.into_value());
    Ok(())
}

/// The inverse of [`encrypt_field`]: replaces `doc[mangle(field)]` with
/// the decrypted `doc[field]`. `field` is the plain name.
///
/// # Errors
///
/// Fails when the mangled field is absent, the envelope is malformed, or
/// the manager cannot decrypt.
pub fn decrypt_field(
    doc: &mut Map<String, Value>,
    field: &str,
    manager: &dyn CryptoManager,
) -> Result<()> {
    let mangled = manager.mangle(field);
    let raw = doc.remove(&mangled).ok_or_else(|| {
        CryptoError::DecryptionFailure(format!("no encrypted field {field:?} in document"))
    })?;
    let envelope = EncryptionResult::from_value(raw)?;
    let plaintext = manager.decrypt(&envelope)?;
    let value: Value = serde_json::from_slice(&plaintext)
        .map_err(|e| CryptoError::InvalidCipherText(e.to_string()))?;
    doc.insert(field.to_string(), value);
    Ok(())
}
