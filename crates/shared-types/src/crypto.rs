//! # Validator Keys
//!
//! Ed25519 signing for votes, proposals and transactions. Signatures are
//! deterministic; no RNG is needed after key generation.

use crate::entities::{Address, PublicKey, Signature};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use sha3::{Digest, Keccak256};

/// Ed25519 keypair of a validator or account owner.
#[derive(Clone)]
pub struct ValidatorKeyPair {
    signing_key: SigningKey,
}

impl ValidatorKeyPair {
    /// Generate a random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from a 32-byte secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Public key (also the validator id).
    pub fn public_key(&self) -> PublicKey {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Account address owned by this key.
    pub fn address(&self) -> Address {
        address_from_public_key(&self.public_key())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for ValidatorKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorKeyPair")
            .field("public_key", &crate::entities::short_id(&self.public_key()))
            .finish_non_exhaustive()
    }
}

/// Verify an Ed25519 signature. Malformed keys verify as false.
pub fn verify_signature(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature);
    verifying_key.verify(message, &sig).is_ok()
}

/// Account address: last 20 bytes of Keccak-256 over the public key.
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    let digest = Keccak256::digest(public_key);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    address
}
