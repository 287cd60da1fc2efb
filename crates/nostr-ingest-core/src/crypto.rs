//! Cryptographic primitives.
//!
//! Wraps BIP-340 Schnorr signing over secp256k1 and sha256 hashing with
//! the hex-typed identifiers used on the wire.

use secp256k1::{schnorr::Signature, Message, Secp256k1, XOnlyPublicKey};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CoreError;
use crate::types::{is_hex_of_len, PublicKey, HEX_32_LEN, HEX_SIG_LEN};

/// A 32-byte sha256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the sha256 hash of the given data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Sha256Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Verify a BIP-340 signature over a 32-byte digest.
///
/// Both the key and the signature arrive as hex. Any length or encoding
/// problem is reported the same way as a failed verification would be,
/// with the more specific variant.
pub fn verify_schnorr(pubkey: &str, digest: &Sha256Hash, sig: &str) -> Result<(), CoreError> {
    if !is_hex_of_len(pubkey, HEX_32_LEN) {
        return Err(CoreError::InvalidPublicKey);
    }
    if !is_hex_of_len(sig, HEX_SIG_LEN) {
        return Err(CoreError::InvalidSignature);
    }

    let key_bytes = hex::decode(pubkey).map_err(|_| CoreError::InvalidPublicKey)?;
    let sig_bytes = hex::decode(sig).map_err(|_| CoreError::InvalidSignature)?;

    let key = XOnlyPublicKey::from_slice(&key_bytes).map_err(|_| CoreError::InvalidPublicKey)?;
    let sig = Signature::from_slice(&sig_bytes).map_err(|_| CoreError::InvalidSignature)?;
    let msg = Message::from_digest_slice(digest.as_bytes())
        .map_err(|e| CoreError::EncodingError(e.to_string()))?;

    Secp256k1::verification_only()
        .verify_schnorr(&sig, &msg, &key)
        .map_err(|_| CoreError::InvalidSignature)
}

/// A secp256k1 keypair for signing events and delegation tokens.
///
/// The relay itself never signs; this exists for fixtures and tooling.
#[derive(Clone)]
pub struct Keypair {
    inner: secp256k1::Keypair,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        use rand::RngCore;

        let secp = Secp256k1::signing_only();
        let mut rng = rand::thread_rng();
        loop {
            let mut seed = [0u8; 32];
            rng.fill_bytes(&mut seed);
            if let Ok(inner) = secp256k1::Keypair::from_seckey_slice(&secp, &seed) {
                return Self { inner };
            }
        }
    }

    /// Create from a 32-byte secret key.
    ///
    /// Fails for the zero key and for values at or above the curve order.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, CoreError> {
        let secp = Secp256k1::signing_only();
        let inner = secp256k1::Keypair::from_seckey_slice(&secp, seed)
            .map_err(|_| CoreError::InvalidSecretKey)?;
        Ok(Self { inner })
    }

    /// Parse a hex-encoded secret key.
    pub fn from_secret_hex(secret: &str) -> Result<Self, CoreError> {
        if !is_hex_of_len(secret, HEX_32_LEN) {
            return Err(CoreError::InvalidSecretKey);
        }
        let mut seed = [0u8; 32];
        hex::decode_to_slice(secret, &mut seed).map_err(|_| CoreError::InvalidSecretKey)?;
        Self::from_seed(&seed)
    }

    /// The x-only public key as hex.
    pub fn public_key(&self) -> PublicKey {
        let (xonly, _parity) = self.inner.x_only_public_key();
        PublicKey::from_bytes(xonly.serialize())
    }

    /// Sign a digest, returning the hex signature.
    ///
    /// Uses no auxiliary randomness so fixtures stay deterministic.
    pub fn sign(&self, digest: &Sha256Hash) -> Result<String, CoreError> {
        let msg = Message::from_digest_slice(digest.as_bytes())
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        let sig = Secp256k1::signing_only().sign_schnorr_no_aux_rand(&msg, &self.inner);
        Ok(sig.to_string())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}
