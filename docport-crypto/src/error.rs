use thiserror::Error;

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors raised by the crypto contracts and their registry.
///
/// The first five kinds belong to implementors: an encrypter or keyring
/// signals its own failures through them. The rest report misuse of the
/// registry and of field-name mangling.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    EncryptionFailure(String),
    #[error("decryption failed: {0}")]
    DecryptionFailure(String),
    #[error("invalid crypto key: {0}")]
    InvalidCryptoKey(String),
    #[error("invalid ciphertext: {0}")]
    InvalidCipherText(String),
    #[error("crypto key not found: {0}")]
    CryptoKeyNotFound(String),
    #[error("no encrypter registered for alias {0:?}")]
    EncrypterNotFound(String),
    #[error("no decrypter registered for algorithm {0:?}")]
    DecrypterNotFound(String),
    #[error("an encrypter is already registered for alias {0:?}")]
    EncrypterAlreadyRegistered(String),
    #[error("a decrypter is already registered for algorithm {0:?}")]
    DecrypterAlreadyRegistered(String),
    #[error("field name {0:?} does not carry the mangle prefix")]
    MangleError(String),
}
