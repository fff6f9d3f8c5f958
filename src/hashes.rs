//! Name → hex digest registry.
//!
//! Every algorithm, cryptographic or not, is exposed through the same
//! [`Hasher`] contract: feed bytes, get a lowercase hex string back.

use digest::{Digest, DynDigest};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use crate::error::HashError;

const BUF_SIZE: usize = 64 * 1024;

/// Incremental hash producing a lowercase hex digest.
pub trait Hasher {
    fn update(&mut self, data: &[u8]);
    fn finalize_hex(self: Box<Self>) -> String;
}

/// Adapter for the RustCrypto digests (sha1, sha2 families).
struct DynDigestHasher(Box<dyn DynDigest>);

impl Hasher for DynDigestHasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        hex::encode(self.0.finalize())
    }
}

struct Md5Hasher(md5::Context);

impl Hasher for Md5Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.consume(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        format!("{:x}", self.0.finalize())
    }
}

/// CRC-32 normalized to eight zero-padded hex digits.
struct Crc32Hasher(crc32fast::Hasher);

impl Hasher for Crc32Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        format!("{:08x}", self.0.finalize())
    }
}

type Factory = Arc<dyn Fn() -> Box<dyn Hasher> + Send + Sync>;

/// Lowercase, with `-` and `_` dropped, so `SHA-256` and `sha256` are one name.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Compare a computed digest with the value recorded in a document.
pub fn digests_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

#[derive(Clone)]
pub struct HashRegistry {
    factories: HashMap<String, Factory>,
}

impl HashRegistry {
    /// Registry seeded with md5, sha1, the sha2 family and crc32.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("md5", || Box::new(Md5Hasher(md5::Context::new())));
        registry.register("sha1", || {
            Box::new(DynDigestHasher(Box::new(sha1::Sha1::new())))
        });
        registry.register("sha224", || {
            Box::new(DynDigestHasher(Box::new(sha2::Sha224::new())))
        });
        registry.register("sha256", || {
            Box::new(DynDigestHasher(Box::new(sha2::Sha256::new())))
        });
        registry.register("sha384", || {
            Box::new(DynDigestHasher(Box::new(sha2::Sha384::new())))
        });
        registry.register("sha512", || {
            Box::new(DynDigestHasher(Box::new(sha2::Sha512::new())))
        });
        registry.register("crc32", || Box::new(Crc32Hasher(crc32fast::Hasher::new())));
        registry
    }

    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Add or replace an algorithm.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Hasher> + Send + Sync + 'static,
    {
        self.factories.insert(normalize_name(name), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&normalize_name(name))
    }

    /// Registered algorithm names, sorted.
    pub fn algorithms(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    pub fn hasher(&self, name: &str) -> Result<Box<dyn Hasher>, HashError> {
        self.factories
            .get(&normalize_name(name))
            .map(|factory| factory())
            .ok_or_else(|| HashError::UnsupportedAlgorithm(name.to_string()))
    }

    pub fn digest(&self, name: &str, data: &[u8]) -> Result<String, HashError> {
        let mut hasher = self.hasher(name)?;
        hasher.update(data);
        Ok(hasher.finalize_hex())
    }

    /// Digest a stream in chunks; suitable for large files.
    pub fn digest_reader<R: Read>(&self, name: &str, mut reader: R) -> Result<String, HashError> {
        let mut hasher = self.hasher(name)?;
        let mut buf = vec![0u8; BUF_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize_hex())
    }
}

impl Default for HashRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HashRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRegistry")
            .field("algorithms", &self.algorithms())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn standard_digests_of_abc() {
        let registry = HashRegistry::new();
        assert_eq!(
            registry.digest("md5", b"abc").unwrap(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            registry.digest("sha1", b"abc").unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            registry.digest("sha224", b"abc").unwrap(),
            "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"
        );
        assert_eq!(
            registry.digest("sha256", b"abc").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            registry.digest("sha384", b"abc").unwrap(),
            "cb00753f45a35e8bb5a03d699ac65007272c32ab0eded1631a8b605a43ff5bed8086072ba1e7cc2358baeca134c825a7"
        );
        assert_eq!(
            registry.digest("sha512", b"abc").unwrap(),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    #[test]
    fn crc32_uses_hex_contract() {
        let registry = HashRegistry::new();
        assert_eq!(registry.digest("crc32", b"123456789").unwrap(), "cbf43926");
        // zero padded to eight digits
        assert_eq!(registry.digest("crc32", b"").unwrap(), "00000000");
    }

    #[test]
    fn names_are_normalized() {
        let registry = HashRegistry::new();
        assert!(registry.contains("SHA-256"));
        assert!(registry.contains("sha_1"));
        assert_eq!(
            registry.digest("SHA-256", b"abc").unwrap(),
            registry.digest("sha256", b"abc").unwrap()
        );
    }

    #[test]
    fn unknown_algorithm_is_explicit() {
        let registry = HashRegistry::new();
        match registry.digest("whirlpool", b"abc") {
            Err(HashError::UnsupportedAlgorithm(name)) => assert_eq!(name, "whirlpool"),
            other => panic!("expected UnsupportedAlgorithm, got {:?}", other),
        }
    }

    #[test]
    fn register_custom_algorithm() {
        let mut registry = HashRegistry::empty();
        assert!(registry.algorithms().is_empty());

        registry.register("Upper-CRC", || Box::new(Crc32Hasher(crc32fast::Hasher::new())));
        assert_eq!(registry.algorithms(), vec!["uppercrc"]);
        assert_eq!(registry.digest("uppercrc", b"123456789").unwrap(), "cbf43926");
    }

    #[test]
    fn digest_reader_matches_digest() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello metalink\n").unwrap();
        f.flush().unwrap();

        let registry = HashRegistry::new();
        let file = std::fs::File::open(f.path()).unwrap();
        assert_eq!(
            registry.digest_reader("sha256", file).unwrap(),
            "3338e2fc1d519735960f5665d1722ca67381890b65a85fa7b105506b298e4255"
        );
    }

    #[test]
    fn comparison_ignores_case_and_whitespace() {
        assert!(digests_match("  CBF43926\n", "cbf43926"));
        assert!(!digests_match("cbf43927", "cbf43926"));
    }
}
