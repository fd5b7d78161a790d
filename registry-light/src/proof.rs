// Merkle inclusion proofs against a header's `app_hash` (spec §4.7). A
// query result is only trusted once its value hashes up to the signed
// root through the supplied sibling path — this is what lets a light
// client answer `resolve`/`whois`/etc. without holding the whole KV
// substrate.

use registry_common::crypto::{sha256, Hash};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Hash,
    /// Whether `sibling` is the left operand when hashing up one level.
    pub sibling_is_left: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_key: Vec<u8>,
    pub leaf_value: Vec<u8>,
    pub steps: Vec<ProofStep>,
}

fn leaf_hash(key: &[u8], value: &[u8]) -> Hash {
    let mut buf = Vec::with_capacity(key.len() + value.len() + 1);
    buf.extend_from_slice(key);
    buf.push(0);
    buf.extend_from_slice(value);
    sha256(&buf)
}

fn branch_hash(left: &Hash, right: &Hash) -> Hash {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(left.as_bytes());
    buf.extend_from_slice(right.as_bytes());
    sha256(&buf)
}

impl MerkleProof {
    /// Recomputes the root from the leaf and sibling path, returning
    /// whether it matches `expected_root`.
    pub fn verify(&self, expected_root: &Hash) -> bool {
        let mut current = leaf_hash(&self.leaf_key, &self.leaf_value);
        for step in &self.steps {
            current = if step.sibling_is_left {
                branch_hash(&step.sibling, &current)
            } else {
                branch_hash(&current, &step.sibling)
            };
        }
        &current == expected_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_step_proof_verifies() {
        let leaf = leaf_hash(b"key", b"value");
        let sibling = sha256(b"sibling");
        let root = branch_hash(&leaf, &sibling);

        let proof = MerkleProof {
            leaf_key: b"key".to_vec(),
            leaf_value: b"value".to_vec(),
            steps: vec![ProofStep {
                sibling,
                sibling_is_left: false,
            }],
        };
        assert!(proof.verify(&root));
    }

    #[test]
    fn tampered_value_fails_verification() {
        let leaf = leaf_hash(b"key", b"value");
        let sibling = sha256(b"sibling");
        let root = branch_hash(&leaf, &sibling);

        let proof = MerkleProof {
            leaf_key: b"key".to_vec(),
            leaf_value: b"tampered".to_vec(),
            steps: vec![ProofStep {
                sibling,
                sibling_is_left: false,
            }],
        };
        assert!(!proof.verify(&root));
    }
}
