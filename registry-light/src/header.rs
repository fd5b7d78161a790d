// Signed block headers (spec §4.7): the light client's only source of
// truth. `app_hash` commits to the full KV substrate at that height; a
// query result is trusted once its Merkle proof verifies against the
// `app_hash` of a header carrying enough validator signatures.

use registry_common::crypto::{double_sha256, PublicKey, Secp256k1Verifier, SignatureVerifier};
use registry_common::time::BlockTime;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Header {
    pub height: u64,
    pub time: BlockTime,
    pub app_hash: String,
    pub validators_hash: String,
}

impl Header {
    /// The bytes validators actually sign over.
    pub fn sign_bytes(&self) -> Vec<u8> {
        format!("{}:{}:{}:{}", self.height, self.time.secs, self.app_hash, self.validators_hash).into_bytes()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidatorSignature {
    pub validator: PublicKey,
    pub signature: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Commit {
    pub header: Header,
    pub signatures: Vec<ValidatorSignature>,
}

#[derive(Clone, Debug)]
pub struct ValidatorSet {
    pub validators: Vec<PublicKey>,
    /// Fraction of the validator set, in basis points, required to trust a commit.
    pub threshold_bps: u32,
}

impl ValidatorSet {
    pub fn new(validators: Vec<PublicKey>, threshold_bps: u32) -> Self {
        ValidatorSet {
            validators,
            threshold_bps,
        }
    }

    pub fn required_signers(&self) -> usize {
        let total = self.validators.len();
        ((total * self.threshold_bps as usize) + 9_999) / 10_000
    }
}

/// Verifies a commit carries signatures from enough *known* validators to
/// clear the trust threshold. Unknown signers and duplicate signers from
/// the same validator are both ignored rather than counted twice.
pub fn verify_commit(commit: &Commit, validator_set: &ValidatorSet) -> bool {
    let verifier = Secp256k1Verifier;
    let digest = double_sha256(&commit.header.sign_bytes());

    let mut counted = std::collections::HashSet::new();
    for sig in &commit.signatures {
        if !validator_set.validators.contains(&sig.validator) {
            continue;
        }
        if !verifier.verify(&digest, &sig.signature, &sig.validator) {
            continue;
        }
        counted.insert(sig.validator.clone());
    }

    counted.len() >= validator_set.required_signers()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_signers_rounds_up() {
        let vs = ValidatorSet::new(vec![], 6700);
        assert_eq!(vs.required_signers(), 0);
    }

    #[test]
    fn empty_commit_does_not_verify_nonempty_set() {
        let secret = libsecp256k1::SecretKey::parse(&[11u8; 32]).unwrap();
        let public = libsecp256k1::PublicKey::from_secret_key(&secret);
        let key = PublicKey::from_bytes(public.serialize_compressed().to_vec());
        let vs = ValidatorSet::new(vec![key], 6700);
        let commit = Commit {
            header: Header {
                height: 1,
                time: BlockTime::from_secs(1),
                app_hash: "deadbeef".to_string(),
                validators_hash: "feedface".to_string(),
            },
            signatures: vec![],
        };
        assert!(!verify_commit(&commit, &vs));
    }

    #[test]
    fn valid_signature_from_sole_validator_verifies() {
        let secret = libsecp256k1::SecretKey::parse(&[11u8; 32]).unwrap();
        let public = libsecp256k1::PublicKey::from_secret_key(&secret);
        let key = PublicKey::from_bytes(public.serialize_compressed().to_vec());
        let vs = ValidatorSet::new(vec![key.clone()], 10_000);

        let header = Header {
            height: 1,
            time: BlockTime::from_secs(1),
            app_hash: "deadbeef".to_string(),
            validators_hash: "feedface".to_string(),
        };
        let digest = double_sha256(&header.sign_bytes());
        let message = libsecp256k1::Message::parse(digest.as_bytes());
        let (sig, _) = libsecp256k1::sign(&message, &secret);

        let commit = Commit {
            header,
            signatures: vec![ValidatorSignature {
                validator: key,
                signature: sig.serialize().to_vec(),
            }],
        };
        assert!(verify_commit(&commit, &vs));
    }
}
