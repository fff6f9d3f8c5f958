//! Per-descriptor integrity checks of a payload.
//!
//! The engine never decides whether a file is "verified": it yields one
//! [`CheckResult`] per descriptor, in descriptor order, and leaves the
//! policy to the caller.

pub mod signature;

pub use signature::{GpgVerifier, SignatureVerifier};

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::iter::{Enumerate, FusedIterator};
use std::slice;
use std::sync::Arc;
use tracing::debug;

use crate::error::HashError;
use crate::hashes::{self, HashRegistry};
use crate::model::{Descriptor, DescriptorKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Match,
    Mismatch,
    UnsupportedAlgorithm(String),
    VerificationUnavailable(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match => write!(f, "match"),
            Self::Mismatch => write!(f, "mismatch"),
            Self::UnsupportedAlgorithm(name) => write!(f, "unsupported algorithm '{}'", name),
            Self::VerificationUnavailable(reason) => write!(f, "unavailable: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult<'a> {
    pub index: usize,
    pub descriptor: &'a Descriptor,
    pub outcome: Outcome,
}

/// Counts of each outcome over a verification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub matched: usize,
    pub mismatched: usize,
    pub unsupported: usize,
    pub unavailable: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Match => self.matched += 1,
            Outcome::Mismatch => self.mismatched += 1,
            Outcome::UnsupportedAlgorithm(_) => self.unsupported += 1,
            Outcome::VerificationUnavailable(_) => self.unavailable += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.matched + self.mismatched + self.unsupported + self.unavailable
    }

    /// Nothing mismatched and at least one check matched.
    pub fn is_verified(&self) -> bool {
        self.mismatched == 0 && self.matched > 0
    }
}

impl<'a> FromIterator<CheckResult<'a>> for Summary {
    fn from_iter<I: IntoIterator<Item = CheckResult<'a>>>(iter: I) -> Self {
        let mut summary = Self::default();
        for result in iter {
            summary.record(&result.outcome);
        }
        summary
    }
}

#[derive(Debug, Clone)]
pub struct VerificationEngine {
    hashes: HashRegistry,
    signatures: HashMap<String, Arc<dyn SignatureVerifier>>,
}

impl VerificationEngine {
    /// Engine with no signature verifiers; every signature check reports
    /// an unsupported algorithm until one is registered.
    pub fn new(hashes: HashRegistry) -> Self {
        Self {
            hashes,
            signatures: HashMap::new(),
        }
    }

    pub fn register_signature<V>(&mut self, algorithm: &str, verifier: V)
    where
        V: SignatureVerifier + 'static,
    {
        self.signatures
            .insert(algorithm.trim().to_ascii_lowercase(), Arc::new(verifier));
    }

    pub fn hashes(&self) -> &HashRegistry {
        &self.hashes
    }

    /// Lazily evaluate `descriptors` against `payload`, one result each.
    pub fn verify<'a>(&'a self, descriptors: &'a [Descriptor], payload: &'a [u8]) -> Checks<'a> {
        Checks {
            engine: self,
            descriptors: descriptors.iter().enumerate(),
            payload,
        }
    }

    pub fn check(&self, descriptor: &Descriptor, payload: &[u8]) -> Outcome {
        let algorithm = descriptor.algorithm.as_deref().unwrap_or("");
        match &descriptor.kind {
            DescriptorKind::Hash => self.check_hash(algorithm, &descriptor.expected, payload),
            DescriptorKind::Signature => {
                match self.signatures.get(&algorithm.trim().to_ascii_lowercase()) {
                    Some(verifier) => verifier.verify(payload, &descriptor.expected),
                    None => Outcome::UnsupportedAlgorithm(algorithm.to_string()),
                }
            }
            DescriptorKind::Pieces { length, hashes } => {
                self.check_pieces(algorithm, *length, hashes, payload)
            }
            DescriptorKind::Other(tag) => Outcome::UnsupportedAlgorithm(tag.clone()),
        }
    }

    fn check_hash(&self, algorithm: &str, expected: &str, payload: &[u8]) -> Outcome {
        match self.hashes.digest(algorithm, payload) {
            Ok(actual) if hashes::digests_match(expected, &actual) => Outcome::Match,
            Ok(actual) => {
                debug!("{} mismatch: expected {}, got {}", algorithm, expected, actual);
                Outcome::Mismatch
            }
            Err(HashError::UnsupportedAlgorithm(name)) => Outcome::UnsupportedAlgorithm(name),
            Err(e) => Outcome::VerificationUnavailable(e.to_string()),
        }
    }

    fn check_pieces(
        &self,
        algorithm: &str,
        length: u64,
        expected: &[String],
        payload: &[u8],
    ) -> Outcome {
        if !self.hashes.contains(algorithm) {
            return Outcome::UnsupportedAlgorithm(algorithm.to_string());
        }
        let Ok(length) = usize::try_from(length) else {
            return Outcome::VerificationUnavailable(format!("piece length {} too large", length));
        };
        if length == 0 {
            return Outcome::VerificationUnavailable("piece length is zero".to_string());
        }

        let pieces = payload.chunks(length);
        if pieces.len() != expected.len() {
            debug!(
                "payload has {} pieces, document lists {}",
                pieces.len(),
                expected.len()
            );
            return Outcome::Mismatch;
        }
        for (piece, expected) in pieces.zip(expected) {
            match self.check_hash(algorithm, expected, piece) {
                Outcome::Match => continue,
                other => return other,
            }
        }
        Outcome::Match
    }
}

impl Default for VerificationEngine {
    /// Standard digests plus `pgp` backed by the system `gpg`.
    fn default() -> Self {
        let mut engine = Self::new(HashRegistry::new());
        engine.register_signature("pgp", GpgVerifier::default());
        engine
    }
}

/// Iterator returned by [`VerificationEngine::verify`].
pub struct Checks<'a> {
    engine: &'a VerificationEngine,
    descriptors: Enumerate<slice::Iter<'a, Descriptor>>,
    payload: &'a [u8],
}

impl<'a> Iterator for Checks<'a> {
    type Item = CheckResult<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, descriptor) = self.descriptors.next()?;
        let outcome = self.engine.check(descriptor, self.payload);
        debug!("check #{} {}: {}", index, descriptor, outcome);
        Some(CheckResult {
            index,
            descriptor,
            outcome,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.descriptors.size_hint()
    }
}

impl ExactSizeIterator for Checks<'_> {}

impl FusedIterator for Checks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const PAYLOAD: &[u8] = b"hello metalink\n";
    const SHA256: &str = "3338e2fc1d519735960f5665d1722ca67381890b65a85fa7b105506b298e4255";

    /// Records what it was asked to verify and answers with a fixed outcome.
    #[derive(Debug)]
    struct FixedVerifier {
        outcome: Outcome,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl SignatureVerifier for FixedVerifier {
        fn verify(&self, _payload: &[u8], signature: &str) -> Outcome {
            self.seen.lock().unwrap().push(signature.to_string());
            self.outcome.clone()
        }
    }

    fn engine_with(outcome: Outcome) -> (VerificationEngine, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut engine = VerificationEngine::new(HashRegistry::new());
        engine.register_signature(
            "pgp",
            FixedVerifier {
                outcome,
                seen: Arc::clone(&seen),
            },
        );
        (engine, seen)
    }

    #[test]
    fn results_follow_descriptor_order() {
        let (engine, seen) = engine_with(Outcome::Match);
        let descriptors = [
            Descriptor::hash("sha256", SHA256),
            Descriptor::signature("pgp", "SIG"),
        ];
        let results: Vec<CheckResult> = engine.verify(&descriptors, PAYLOAD).collect();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 0);
        assert_eq!(results[0].descriptor.kind, DescriptorKind::Hash);
        assert_eq!(results[0].outcome, Outcome::Match);
        assert_eq!(results[1].descriptor.kind, DescriptorKind::Signature);
        assert_eq!(results[1].outcome, Outcome::Match);
        assert_eq!(*seen.lock().unwrap(), ["SIG"]);
    }

    #[test]
    fn unsupported_algorithm_does_not_stop_the_run() {
        let (engine, _) = engine_with(Outcome::Match);
        let descriptors = [
            Descriptor::hash("whirlpool", "abc"),
            Descriptor::hash("md5", "7163383c6a915729265356db3bae7bb2"),
            Descriptor::hash("sha1", "0000"),
        ];
        let outcomes: Vec<Outcome> = engine
            .verify(&descriptors, PAYLOAD)
            .map(|r| r.outcome)
            .collect();
        assert_eq!(
            outcomes,
            [
                Outcome::UnsupportedAlgorithm("whirlpool".to_string()),
                Outcome::Match,
                Outcome::Mismatch
            ]
        );
    }

    #[test]
    fn checks_are_lazy_and_exact_size() {
        let (engine, seen) = engine_with(Outcome::Match);
        let descriptors = [
            Descriptor::hash("crc32", "b7ab37b3"),
            Descriptor::signature("pgp", "SIG"),
        ];
        let mut checks = engine.verify(&descriptors, PAYLOAD);
        assert_eq!(checks.len(), 2);

        assert_eq!(checks.next().unwrap().outcome, Outcome::Match);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(checks.len(), 1);

        checks.next();
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(checks.next().is_none());
    }

    #[test]
    fn unknown_signature_algorithm_is_unsupported() {
        let (engine, _) = engine_with(Outcome::Match);
        let descriptors = [
            Descriptor::signature("x509", "CERT"),
            Descriptor::hash("sha256", SHA256),
        ];
        let summary: Summary = engine.verify(&descriptors, PAYLOAD).collect();
        assert_eq!(summary.unsupported, 1);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.total(), 2);
        assert!(summary.is_verified());
    }

    #[test]
    fn summary_needs_a_match_and_no_mismatch() {
        let mut summary = Summary::default();
        assert!(!summary.is_verified());

        summary.record(&Outcome::UnsupportedAlgorithm("tiger".to_string()));
        assert!(!summary.is_verified());

        summary.record(&Outcome::Match);
        assert!(summary.is_verified());

        summary.record(&Outcome::Mismatch);
        assert!(!summary.is_verified());
    }

    #[test]
    fn unavailable_signature_keeps_going() {
        let (engine, _) =
            engine_with(Outcome::VerificationUnavailable("gpg not found".to_string()));
        let descriptors = [
            Descriptor::signature("pgp", "SIG"),
            Descriptor::hash("sha256", SHA256),
        ];
        let outcomes: Vec<Outcome> = engine
            .verify(&descriptors, PAYLOAD)
            .map(|r| r.outcome)
            .collect();
        assert!(matches!(outcomes[0], Outcome::VerificationUnavailable(_)));
        assert_eq!(outcomes[1], Outcome::Match);
    }

    #[test]
    fn engine_without_verifiers_reports_unsupported_signature() {
        let engine = VerificationEngine::new(HashRegistry::new());
        let outcome = engine.check(&Descriptor::signature("pgp", "SIG"), PAYLOAD);
        assert_eq!(outcome, Outcome::UnsupportedAlgorithm("pgp".to_string()));
    }

    #[test]
    fn pieces_are_checked_chunk_by_chunk() {
        let engine = VerificationEngine::new(HashRegistry::new());
        let good = Descriptor::pieces(
            "sha1",
            8,
            &[
                "21f3621cbf6d2ba00e5e75b08c5aa41f01f5730a",
                "c56577e180ab3369f6d06f888c9bf6bad2d67a80",
            ],
        );
        assert_eq!(engine.check(&good, PAYLOAD), Outcome::Match);

        let short = Descriptor::pieces("sha1", 8, &["21f3621cbf6d2ba00e5e75b08c5aa41f01f5730a"]);
        assert_eq!(engine.check(&short, PAYLOAD), Outcome::Mismatch);

        let zero = Descriptor::pieces("sha1", 0, &[]);
        assert!(matches!(
            engine.check(&zero, PAYLOAD),
            Outcome::VerificationUnavailable(_)
        ));

        let unknown = Descriptor::pieces("tiger", 8, &["a", "b"]);
        assert_eq!(
            engine.check(&unknown, PAYLOAD),
            Outcome::UnsupportedAlgorithm("tiger".to_string())
        );
    }

    #[test]
    fn other_descriptor_kinds_are_unsupported() {
        let engine = VerificationEngine::new(HashRegistry::new());
        let descriptor = Descriptor {
            kind: DescriptorKind::Other("checksum".to_string()),
            algorithm: None,
            expected: "x".to_string(),
        };
        assert_eq!(
            engine.check(&descriptor, PAYLOAD),
            Outcome::UnsupportedAlgorithm("checksum".to_string())
        );
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VerificationEngine>();
        assert_send_sync::<crate::model::Metalink>();
    }
}
