use crate::crypto::signature::{PublicKey, SignatureError};
use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Display;

/// Bech32(ripemd160(sha256(pubkey_bytes))) account address, spec §6.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn from_pubkey(pubkey: &PublicKey, hrp: &str) -> Result<Self, SignatureError> {
        let sha = Sha256::digest(pubkey.as_bytes());
        let ripemd = Ripemd160::digest(sha);

        let hrp = Hrp::parse(hrp).map_err(|_| SignatureError::InvalidPublicKey)?;
        let encoded = bech32::encode::<Bech32>(hrp, &ripemd)
            .map_err(|_| SignatureError::InvalidPublicKey)?;
        Ok(Address(encoded))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Only for tests/fixtures that need an address without a real keypair.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Address(s.into())
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serializer for Address {
    fn write(&self, writer: &mut Writer) {
        writer.write_string(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Address(reader.read_string()?))
    }

    fn size(&self) -> usize {
        4 + self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_stable_address() {
        let pubkey = PublicKey::from_bytes(vec![2u8; 33]);
        let a1 = Address::from_pubkey(&pubkey, "wire").unwrap();
        let a2 = Address::from_pubkey(&pubkey, "wire").unwrap();
        assert_eq!(a1, a2);
        assert!(a1.as_str().starts_with("wire1"));
    }

    #[test]
    fn different_keys_different_addresses() {
        let a = Address::from_pubkey(&PublicKey::from_bytes(vec![2u8; 33]), "wire").unwrap();
        let b = Address::from_pubkey(&PublicKey::from_bytes(vec![3u8; 33]), "wire").unwrap();
        assert_ne!(a, b);
    }
}
