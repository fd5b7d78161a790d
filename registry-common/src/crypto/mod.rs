mod address;
mod hash;
mod signature;

pub use address::Address;
pub use hash::{double_sha256, sha256, Hash, HASH_SIZE};
pub use signature::{PublicKey, Secp256k1Verifier, SignatureError, SignatureVerifier};
