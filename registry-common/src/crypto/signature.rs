// Pluggable signature verification. The registry itself is curve-agnostic;
// today only secp256k1 (matching the original record-signature scheme) is
// wired up, but callers depend on `SignatureVerifier` rather than the
// concrete curve so a future scheme can be added without touching the
// record registry (see spec §9 "Signature flexibility").

use crate::crypto::hash::Hash;
use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("malformed public key")]
    InvalidPublicKey,
    #[error("malformed signature")]
    InvalidSignature,
}

/// A secp256k1 public key in SEC1-compressed form (33 bytes).
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "hex::serde")] Vec<u8>);

impl PublicKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Derives the registry address: ripemd160(sha256(pubkey_bytes)), bech32-encoded.
    pub fn to_address(&self, hrp: &str) -> Result<super::address::Address, SignatureError> {
        super::address::Address::from_pubkey(self, hrp)
    }
}

impl Serializer for PublicKey {
    fn write(&self, writer: &mut Writer) {
        writer.write_sized_bytes(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(PublicKey(reader.read_sized_bytes()?))
    }

    fn size(&self) -> usize {
        4 + self.0.len()
    }
}

/// Verifies a signature over `sha256(sha256(message))`, the payload used by
/// both record-signing and auction commit/reveal hashing.
pub trait SignatureVerifier {
    fn verify(&self, message_hash: &Hash, signature: &[u8], pubkey: &PublicKey) -> bool;
}

pub struct Secp256k1Verifier;

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, message_hash: &Hash, signature: &[u8], pubkey: &PublicKey) -> bool {
        let Ok(pk) = libsecp256k1::PublicKey::parse_slice(pubkey.as_bytes(), None) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let Ok(sig) = libsecp256k1::Signature::parse_standard(&sig_bytes) else {
            return false;
        };
        let message = libsecp256k1::Message::parse(message_hash.as_bytes());
        libsecp256k1::verify(&message, &sig, &pk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::double_sha256;

    #[test]
    fn roundtrip_sign_verify() {
        let secret = libsecp256k1::SecretKey::parse(&[7u8; 32]).unwrap();
        let public = libsecp256k1::PublicKey::from_secret_key(&secret);
        let pubkey = PublicKey::from_bytes(public.serialize_compressed().to_vec());

        let digest = double_sha256(b"attributes-json");
        let message = libsecp256k1::Message::parse(digest.as_bytes());
        let (sig, _recovery) = libsecp256k1::sign(&message, &secret);

        let verifier = Secp256k1Verifier;
        assert!(verifier.verify(&digest, &sig.serialize(), &pubkey));
    }

    #[test]
    fn rejects_wrong_message() {
        let secret = libsecp256k1::SecretKey::parse(&[9u8; 32]).unwrap();
        let public = libsecp256k1::PublicKey::from_secret_key(&secret);
        let pubkey = PublicKey::from_bytes(public.serialize_compressed().to_vec());

        let digest = double_sha256(b"one");
        let other = double_sha256(b"two");
        let message = libsecp256k1::Message::parse(digest.as_bytes());
        let (sig, _) = libsecp256k1::sign(&message, &secret);

        let verifier = Secp256k1Verifier;
        assert!(!verifier.verify(&other, &sig.serialize(), &pubkey));
    }
}
