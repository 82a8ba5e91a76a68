use std::collections::HashMap;

use crate::{CryptoError, Key, Keyring, Result};

/// An in-memory keyring for tests and development.
///
/// Key material sits in process memory in the clear, with no rotation and
/// no access control. Do not use this in production; implement [`Keyring`]
/// over a real key store instead.
#[derive(Debug, Default)]
pub struct InsecureKeyring {
    keys: HashMap<String, Vec<u8>>,
}

impl InsecureKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key, replacing any previous material under the same id.
    pub fn insert(&mut self, id: impl Into<String>, material: impl Into<Vec<u8>>) {
        self.keys.insert(id.into(), material.into());
    }
}

impl Keyring for InsecureKeyring {
    fn get(&self, key_id: &str) -> Result<Key> {
        self.keys
            .get(key_id)
            .map(|material| Key::new(key_id, material.clone()))
            .ok_or_else(|| CryptoError::CryptoKeyNotFound(key_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_ids_and_reports_unknown_ones() {
        let mut keyring = InsecureKeyring::new();
        keyring.insert("k1", b"secret".to_vec());

        let key = keyring.get("k1").unwrap();
        assert_eq!(key.id, "k1");
        assert_eq!(key.material, b"secret");

        assert!(matches!(
            keyring.get("k2"),
            Err(CryptoError::CryptoKeyNotFound(_))
        ));
    }
}
