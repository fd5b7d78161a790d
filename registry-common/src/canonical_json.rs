// Canonical JSON + content-identifier computation (spec §3, §4.3, §9).
//
// `serde_json::Value::Object` is backed by a `BTreeMap` (we do not enable
// the `preserve_order` feature anywhere in this workspace), so
// `serde_json::to_string` already emits object keys in sorted order with no
// inserted whitespace — the two properties canonical JSON requires. The
// content-id is the CIDv1 dag-cbor identifier (spec §6) of the sha2-256
// digest of that canonical encoding, isolated here as a pure function per
// spec §9 so it can be tested against reference vectors independent of
// chain logic.

use cid::Cid;
use multihash::Multihash;
use serde_json::Value;
use thiserror::Error;

/// IPLD dag-cbor multicodec code.
const DAG_CBOR_CODEC: u64 = 0x71;
/// multihash code for sha2-256.
const SHA2_256_CODE: u64 = 0x12;

#[derive(Debug, Error)]
pub enum ContentIdError {
    #[error("attributes must be a JSON object")]
    NotAnObject,
    #[error("failed to build multihash")]
    Multihash,
}

/// Serializes `value` as canonical JSON: sorted keys, UTF-8, no
/// insignificant whitespace. `value` must already be a JSON object (the
/// registry only content-addresses record attribute maps).
pub fn canonical_json(value: &Value) -> Result<String, ContentIdError> {
    if !value.is_object() {
        return Err(ContentIdError::NotAnObject);
    }
    // serde_json's compact formatter is already whitespace-free; BTreeMap
    // backing guarantees lexicographic key order.
    serde_json::to_string(value).map_err(|_| ContentIdError::NotAnObject)
}

/// Computes the content identifier of a record's `attributes`: the CIDv1
/// dag-cbor CID of the sha2-256 digest of the attributes' canonical JSON
/// encoding. Two records with identical attributes always produce the same
/// id (spec §8.1, §8.9).
pub fn content_id(attributes: &Value) -> Result<String, ContentIdError> {
    let canonical = canonical_json(attributes)?;
    let digest = crate::crypto::sha256(canonical.as_bytes());

    let mh = Multihash::<64>::wrap(SHA2_256_CODE, digest.as_bytes())
        .map_err(|_| ContentIdError::Multihash)?;
    let cid = Cid::new_v1(DAG_CBOR_CODEC, mh);
    Ok(cid.to_string())
}
