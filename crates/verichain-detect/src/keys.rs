//! Ed25519 reference key store.
//!
//! Signatures are hex-encoded Ed25519 signatures over the canonical form of
//! a record or event, keyed by the signer's tax ID.

use std::collections::BTreeMap;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use verichain_chain::hash::{canonical_event, canonical_record};
use verichain_contracts::{event::EventRecord, record::Record};
use verichain_core::traits::{SignatureCheck, SignatureVerifier};

/// Verifying keys by signer tax ID.
#[derive(Debug, Default, Clone)]
pub struct Ed25519KeyStore {
    keys: BTreeMap<String, VerifyingKey>,
}

impl Ed25519KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the key of `signer`.
    pub fn register(&mut self, signer: impl Into<String>, key: VerifyingKey) {
        self.keys.insert(signer.into(), key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl SignatureVerifier for Ed25519KeyStore {
    fn verify(&self, signer: &str, message: &[u8], signature: &str) -> SignatureCheck {
        let Some(key) = self.keys.get(signer) else {
            return SignatureCheck::UnknownSigner;
        };

        let bytes = match hex::decode(signature) {
            Ok(bytes) => bytes,
            Err(e) => {
                return SignatureCheck::Invalid { reason: format!("signature is not hex: {}", e) }
            }
        };
        let Ok(signature) = Signature::try_from(bytes.as_slice()) else {
            return SignatureCheck::Invalid {
                reason: format!("signature is {} bytes, expected 64", bytes.len()),
            };
        };

        match key.verify(message, &signature) {
            Ok(()) => SignatureCheck::Valid,
            Err(_) => SignatureCheck::Invalid {
                reason: "signature does not verify against the canonical form".to_string(),
            },
        }
    }
}

/// Sign `record`'s canonical form.  The chaining block must already be set.
pub fn sign_record(key: &SigningKey, record: &Record) -> String {
    hex::encode(key.sign(canonical_record(record).as_bytes()).to_bytes())
}

pub fn sign_event(key: &SigningKey, event: &EventRecord) -> String {
    hex::encode(key.sign(canonical_event(event).as_bytes()).to_bytes())
}
