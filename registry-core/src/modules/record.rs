// Record registry (spec §4.3): content-addressed records keyed by the
// CID of their canonical-JSON attributes. Re-submitting identical
// attributes is idempotent (spec §8 testable property #1) because the
// content ID is a pure function of the attributes.

use crate::modules::bond::BondModule;
use crate::storage::{Column, Storage};
use registry_common::canonical_json::{canonical_json, content_id};
use registry_common::coin::Coin;
use registry_common::context::ExecutionContext;
use registry_common::crypto::{double_sha256, PublicKey, Secp256k1Verifier, SignatureVerifier};
use registry_common::error::ChainError;
use registry_common::serializer::{Reader, ReaderError, Serializer, Writer};
use registry_common::time::BlockTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bech32 HRP used to derive owner addresses from record signatures.
const RECORD_ADDRESS_HRP: &str = "wire";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub bond_id: String,
    /// Sorted, deduplicated addresses derived from `SetRecord`'s signatures.
    pub owners: Vec<String>,
    pub attributes: Value,
    pub deleted: bool,
    pub created_at: u64,
    pub expiry_time: BlockTime,
}

/// One signature over a record's attributes, carried alongside `SetRecord`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordSignature {
    pub pubkey: PublicKey,
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
}

/// Verifies every signature over `sha256(sha256(canonical_json(attributes)))`
/// and derives the sorted, deduplicated owner address set (spec §4.3).
/// Aborts with `Unauthorized` on the first signature that fails to verify.
fn verify_and_derive_owners(attributes: &Value, signatures: &[RecordSignature]) -> Result<Vec<String>, ChainError> {
    let canonical = canonical_json(attributes)
        .map_err(|e| ChainError::invalid_request(format!("cannot canonicalize attributes: {e}")))?;
    let digest = double_sha256(canonical.as_bytes());
    let verifier = Secp256k1Verifier;

    let mut owners = Vec::with_capacity(signatures.len());
    for sig in signatures {
        if !verifier.verify(&digest, &sig.signature, &sig.pubkey) {
            return Err(ChainError::unauthorized("record signature does not verify"));
        }
        let address = sig
            .pubkey
            .to_address(RECORD_ADDRESS_HRP)
            .map_err(|e| ChainError::unauthorized(format!("cannot derive owner address: {e}")))?;
        owners.push(address.as_str().to_string());
    }
    owners.sort();
    owners.dedup();
    Ok(owners)
}

impl Serializer for Record {
    fn write(&self, writer: &mut Writer) {
        let bytes = serde_json::to_vec(self).expect("record always serializes");
        writer.write_sized_bytes(&bytes);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let bytes = reader.read_sized_bytes()?;
        serde_json::from_slice(&bytes).map_err(|_| ReaderError::InvalidValue)
    }

    fn size(&self) -> usize {
        serde_json::to_vec(self).map(|b| b.len()).unwrap_or(0) + 4
    }
}

/// Marker key stored for the composite `{bond_id}{record_id}` and
/// `{time_bucket}{record_id}` index columns — the value carried is `()`
/// so only key presence/prefix-iteration matters.
#[derive(Clone, Copy, Debug)]
pub struct Marker;

impl Serializer for Marker {
    fn write(&self, _writer: &mut Writer) {}
    fn read(_reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Marker)
    }
    fn size(&self) -> usize {
        0
    }
}

pub struct RecordModule {
    storage: Storage,
}

impl RecordModule {
    pub fn new(storage: Storage) -> Self {
        RecordModule { storage }
    }

    pub fn get(&self, record_id: &str) -> Result<Option<Record>, ChainError> {
        Ok(self.storage.load_optional(Column::Records, record_id.as_bytes())?)
    }

    /// Creates or idempotently re-affirms a record. Returns `(record, created)`.
    pub fn set_record(
        &self,
        ctx: &ExecutionContext,
        bond_id: &str,
        attributes: Value,
        signatures: &[RecordSignature],
        rent: &Coin,
        rent_duration_secs: u64,
    ) -> Result<(Record, bool), ChainError> {
        let id = content_id(&attributes)
            .map_err(|e| ChainError::invalid_request(format!("cannot derive content id: {e}")))?;

        if let Some(existing) = self.get(&id)? {
            return Ok((existing, false));
        }

        let owners = verify_and_derive_owners(&attributes, signatures)?;

        if !bond_id.is_empty() {
            BondModule::new(self.storage.clone()).deduct_rent(bond_id, rent)?;
        }

        let expiry_time = ctx.block_time.plus_seconds(rent_duration_secs);
        let record = Record {
            id: id.clone(),
            bond_id: bond_id.to_string(),
            owners,
            attributes,
            deleted: false,
            created_at: ctx.block_height,
            expiry_time,
        };

        self.index_bond(&record)?;
        self.save(&record)?;
        self.schedule_expiry(&record)?;
        Ok((record, true))
    }

    /// Only permitted on a tombstoned record whose previous rent window has
    /// passed; resets `deleted`, `created_at`, and `expiry_time` to the
    /// current block. Bond and name indexes are left untouched.
    pub fn renew_record(
        &self,
        ctx: &ExecutionContext,
        record_id: &str,
        rent_duration_secs: u64,
    ) -> Result<Record, ChainError> {
        let mut record = self
            .get(record_id)?
            .ok_or_else(|| ChainError::invalid_request("record not found"))?;
        if !record.deleted || ctx.block_time < record.expiry_time {
            return Err(ChainError::invalid_request("record is not eligible for renewal"));
        }

        self.unschedule_expiry(&record)?;
        record.deleted = false;
        record.created_at = ctx.block_height;
        record.expiry_time = ctx.block_time.plus_seconds(rent_duration_secs);
        self.save(&record)?;
        self.schedule_expiry(&record)?;
        Ok(record)
    }

    /// Record must currently carry no bond. If the record is a tombstone,
    /// it is re-enqueued for expiry so the next sweep surfaces it for a
    /// renewal attempt.
    pub fn associate_bond(&self, record_id: &str, bond_id: &str) -> Result<Record, ChainError> {
        let mut record = self
            .get(record_id)?
            .ok_or_else(|| ChainError::invalid_request("record not found"))?;
        if !record.bond_id.is_empty() {
            return Err(ChainError::invalid_request("record already has a bond"));
        }

        record.bond_id = bond_id.to_string();
        self.index_bond(&record)?;
        self.save(&record)?;
        if record.deleted {
            self.schedule_expiry(&record)?;
        }
        Ok(record)
    }

    pub fn dissociate_bond(&self, record_id: &str) -> Result<Record, ChainError> {
        let mut record = self
            .get(record_id)?
            .ok_or_else(|| ChainError::invalid_request("record not found"))?;

        self.deindex_bond(&record)?;
        record.bond_id = String::new();
        self.save(&record)?;
        Ok(record)
    }

    /// Batch `DissociateBond` over every record currently indexed under
    /// `bond_id`. Returns the affected record ids.
    pub fn dissociate_records(&self, bond_id: &str) -> Result<Vec<String>, ChainError> {
        let record_ids = self.records_for_bond(bond_id)?;
        for record_id in &record_ids {
            self.dissociate_bond(record_id)?;
        }
        Ok(record_ids)
    }

    /// Batch bond reassignment from `old_bond_id` to `new_bond_id`; mirrors
    /// `associate_bond`'s re-enqueue-on-tombstone behavior per record.
    pub fn reassociate_records(&self, old_bond_id: &str, new_bond_id: &str) -> Result<Vec<String>, ChainError> {
        let record_ids = self.records_for_bond(old_bond_id)?;
        for record_id in &record_ids {
            let mut record = self
                .get(record_id)?
                .ok_or_else(|| ChainError::invalid_request("record not found"))?;
            self.deindex_bond(&record)?;
            record.bond_id = new_bond_id.to_string();
            self.index_bond(&record)?;
            self.save(&record)?;
            if record.deleted {
                self.schedule_expiry(&record)?;
            }
        }
        Ok(record_ids)
    }

    fn records_for_bond(&self, bond_id: &str) -> Result<Vec<String>, ChainError> {
        let prefix = bond_index_key_prefix(bond_id);
        let rows: Vec<(Vec<u8>, Marker)> = self.storage.iter_prefix(Column::RecordsByBond, &prefix)?;
        Ok(rows
            .into_iter()
            .map(|(key, _)| String::from_utf8_lossy(&key[prefix.len()..]).to_string())
            .collect())
    }

    /// Processes a lapsed record's rent window (spec §4.5): first attempts
    /// to draw `rent` from the record's bond and, on success, renews the
    /// record in place for another `rent_duration_secs`. Only tombstones
    /// the record — the record stays in storage (spec glossary: "retained
    /// in the store but marked absent for query purposes") — when the bond
    /// is missing or can no longer cover the draw. Returns whether the
    /// record was renewed.
    pub fn expire_record(
        &self,
        ctx: &ExecutionContext,
        record_id: &str,
        rent: &Coin,
        rent_duration_secs: u64,
    ) -> Result<bool, ChainError> {
        let Some(mut record) = self.get(record_id)? else {
            return Ok(false);
        };
        self.unschedule_expiry(&record)?;

        if record.bond_id.is_empty() {
            record.deleted = true;
            self.save(&record)?;
            return Ok(false);
        }

        let bond = BondModule::new(self.storage.clone());
        match bond.deduct_rent(&record.bond_id, rent) {
            Ok(()) => {
                record.expiry_time = ctx.block_time.plus_seconds(rent_duration_secs);
                record.deleted = false;
                self.save(&record)?;
                self.schedule_expiry(&record)?;
                Ok(true)
            }
            Err(_) => {
                record.deleted = true;
                self.save(&record)?;
                Ok(false)
            }
        }
    }

    /// Permanently removes a record and its indexes, regardless of rent
    /// state.
    pub fn delete_record(&self, record_id: &str) -> Result<(), ChainError> {
        if let Some(record) = self.get(record_id)? {
            self.unschedule_expiry(&record)?;
            self.deindex_bond(&record)?;
            self.storage.remove(Column::Records, record_id.as_bytes())?;
        }
        Ok(())
    }

    /// Records whose expiry bucket is `<= now`, in chronological order.
    pub fn expired_before(&self, now: BlockTime) -> Result<Vec<String>, ChainError> {
        let rows: Vec<(Vec<u8>, Marker)> = self.storage.iter_all(Column::RecordExpiryQueue)?;
        let cutoff = now.to_sortable_key();
        let mut out = Vec::new();
        for (key, _) in rows {
            if key.len() < 12 {
                continue;
            }
            if key[..12] > cutoff {
                break;
            }
            out.push(String::from_utf8_lossy(&key[12..]).to_string());
        }
        Ok(out)
    }

    pub fn uses_bond(&self, bond_id: &str) -> Result<bool, ChainError> {
        let prefix = bond_id.as_bytes();
        let rows: Vec<(Vec<u8>, Marker)> = self.storage.iter_prefix(Column::RecordsByBond, prefix)?;
        Ok(!rows.is_empty())
    }

    fn save(&self, record: &Record) -> Result<(), ChainError> {
        self.storage.insert(Column::Records, record.id.as_bytes(), record)?;
        Ok(())
    }

    fn index_bond(&self, record: &Record) -> Result<(), ChainError> {
        if record.bond_id.is_empty() {
            return Ok(());
        }
        let key = bond_index_key(&record.bond_id, &record.id);
        self.storage.insert(Column::RecordsByBond, key, &Marker)?;
        Ok(())
    }

    fn deindex_bond(&self, record: &Record) -> Result<(), ChainError> {
        if record.bond_id.is_empty() {
            return Ok(());
        }
        let key = bond_index_key(&record.bond_id, &record.id);
        self.storage.remove(Column::RecordsByBond, key)?;
        Ok(())
    }

    fn schedule_expiry(&self, record: &Record) -> Result<(), ChainError> {
        let key = expiry_key(record.expiry_time, &record.id);
        self.storage.insert(Column::RecordExpiryQueue, key, &Marker)?;
        Ok(())
    }

    fn unschedule_expiry(&self, record: &Record) -> Result<(), ChainError> {
        let key = expiry_key(record.expiry_time, &record.id);
        self.storage.remove(Column::RecordExpiryQueue, key)?;
        Ok(())
    }
}

fn bond_index_key_prefix(bond_id: &str) -> Vec<u8> {
    let mut key = bond_id.as_bytes().to_vec();
    key.extend_from_slice(b"\0");
    key
}

fn bond_index_key(bond_id: &str, record_id: &str) -> Vec<u8> {
    let mut key = bond_index_key_prefix(bond_id);
    key.extend_from_slice(record_id.as_bytes());
    key
}

fn expiry_key(time: BlockTime, record_id: &str) -> Vec<u8> {
    let mut key = time.to_sortable_key().to_vec();
    key.extend_from_slice(record_id.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_common::coin::Coins;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_module() -> (TempDir, RecordModule, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        (dir, RecordModule::new(storage.clone()), storage)
    }

    /// Funds `bond_id` with a real `Bond` so `set_record`'s rent draw has
    /// somewhere to pull from.
    fn fund_bond(storage: &Storage, bond_id: &str, amount: u128) {
        let ctx = ExecutionContext::for_test();
        BondModule::new(storage.clone())
            .create_bond(&ctx, bond_id, "bond-owner", Coins::uwire(amount), &Coin::from_uwire(u128::MAX))
            .unwrap();
    }

    #[test]
    fn set_record_is_idempotent() {
        let (_dir, module, storage) = test_module();
        fund_bond(&storage, "bond-1", 1_000_000);
        let ctx = ExecutionContext::for_test();
        let attrs = json!({"type": "website", "url": "https://example.com"});
        let (r1, created1) = module
            .set_record(&ctx, "bond-1", attrs.clone(), &[], &Coin::from_uwire(1), 3600)
            .unwrap();
        let (r2, created2) = module
            .set_record(&ctx, "bond-1", attrs, &[], &Coin::from_uwire(1), 3600)
            .unwrap();
        assert!(created1);
        assert!(!created2);
        assert_eq!(r1.id, r2.id);
    }

    #[test]
    fn set_record_deducts_rent_from_the_bond() {
        let (_dir, module, storage) = test_module();
        fund_bond(&storage, "bond-1", 5_000_000);
        let ctx = ExecutionContext::for_test();
        module
            .set_record(&ctx, "bond-1", json!({"a": 1}), &[], &Coin::from_uwire(1_000_000), 3600)
            .unwrap();
        let bond = BondModule::new(storage).get("bond-1").unwrap().unwrap();
        assert_eq!(bond.balance.total_uwire(), 4_000_000);
    }

    #[test]
    fn set_record_rejects_exhausted_bond() {
        let (_dir, module, storage) = test_module();
        fund_bond(&storage, "bond-1", 500_000);
        let ctx = ExecutionContext::for_test();
        let err = module
            .set_record(&ctx, "bond-1", json!({"a": 1}), &[], &Coin::from_uwire(1_000_000), 3600)
            .unwrap_err();
        assert!(matches!(err, ChainError::InsufficientFunds(_)));
    }

    #[test]
    fn different_attributes_different_ids() {
        let (_dir, module, storage) = test_module();
        fund_bond(&storage, "bond-1", 1_000_000);
        let ctx = ExecutionContext::for_test();
        let (r1, _) = module
            .set_record(&ctx, "bond-1", json!({"a": 1}), &[], &Coin::from_uwire(1), 3600)
            .unwrap();
        let (r2, _) = module
            .set_record(&ctx, "bond-1", json!({"a": 2}), &[], &Coin::from_uwire(1), 3600)
            .unwrap();
        assert_ne!(r1.id, r2.id);
    }

    #[test]
    fn expiry_queue_orders_chronologically() {
        let (_dir, module, storage) = test_module();
        fund_bond(&storage, "bond-1", 1_000_000);
        let ctx = ExecutionContext::for_test();
        let (r1, _) = module
            .set_record(&ctx, "bond-1", json!({"a": 1}), &[], &Coin::from_uwire(1), 10)
            .unwrap();
        let (_r2, _) = module
            .set_record(&ctx, "bond-1", json!({"a": 2}), &[], &Coin::from_uwire(1), 10_000)
            .unwrap();
        let expired = module.expired_before(r1.expiry_time).unwrap();
        assert_eq!(expired, vec![r1.id]);
    }

    #[test]
    fn bond_usage_observer_reflects_index() {
        let (_dir, module, storage) = test_module();
        fund_bond(&storage, "bond-1", 1_000_000);
        let ctx = ExecutionContext::for_test();
        assert!(!module.uses_bond("bond-1").unwrap());
        module
            .set_record(&ctx, "bond-1", json!({"a": 1}), &[], &Coin::from_uwire(1), 10)
            .unwrap();
        assert!(module.uses_bond("bond-1").unwrap());
    }

    #[test]
    fn expiry_renews_while_the_bond_can_pay() {
        let (_dir, module, storage) = test_module();
        fund_bond(&storage, "bond-1", 2_000_000);
        let ctx = ExecutionContext::for_test();
        let (record, _) = module
            .set_record(&ctx, "bond-1", json!({"a": 1}), &[], &Coin::from_uwire(1_000_000), 10)
            .unwrap();

        let renewed = module
            .expire_record(&ctx, &record.id, &Coin::from_uwire(1_000_000), 3600)
            .unwrap();
        assert!(renewed);
        let record = module.get(&record.id).unwrap().unwrap();
        assert!(!record.deleted);
        assert_eq!(record.expiry_time, ctx.block_time.plus_seconds(3600));

        let bond = BondModule::new(storage).get("bond-1").unwrap().unwrap();
        assert_eq!(bond.balance.total_uwire(), 0);
    }

    #[test]
    fn expiry_tombstones_once_the_bond_is_exhausted() {
        let (_dir, module, storage) = test_module();
        fund_bond(&storage, "bond-1", 1_000_000);
        let ctx = ExecutionContext::for_test();
        let (record, _) = module
            .set_record(&ctx, "bond-1", json!({"a": 1}), &[], &Coin::from_uwire(1_000_000), 10)
            .unwrap();

        let renewed = module
            .expire_record(&ctx, &record.id, &Coin::from_uwire(1_000_000), 3600)
            .unwrap();
        assert!(!renewed);

        let tombstoned = module.get(&record.id).unwrap().unwrap();
        assert!(tombstoned.deleted);
        assert!(module.expired_before(record.expiry_time).unwrap().is_empty());
    }

    #[test]
    fn expiry_tombstones_orphan_records_immediately() {
        let (_dir, module, storage) = test_module();
        let ctx = ExecutionContext::for_test();
        let (record, _) = module
            .set_record(&ctx, "", json!({"a": 1}), &[], &Coin::from_uwire(1), 10)
            .unwrap();
        let _ = &storage;

        let renewed = module
            .expire_record(&ctx, &record.id, &Coin::from_uwire(1), 3600)
            .unwrap();
        assert!(!renewed);
        assert!(module.get(&record.id).unwrap().unwrap().deleted);
    }

    #[test]
    fn renew_requires_tombstone_and_elapsed_expiry() {
        let (_dir, module, storage) = test_module();
        fund_bond(&storage, "bond-1", 1_000_000);
        let ctx = ExecutionContext::for_test();
        let (record, _) = module
            .set_record(&ctx, "bond-1", json!({"a": 1}), &[], &Coin::from_uwire(1), 10)
            .unwrap();

        let err = module.renew_record(&ctx, &record.id, 10).unwrap_err();
        assert!(matches!(err, ChainError::InvalidRequest(_)));

        // Exhaust the bond so the expiry sweep tombstones rather than renews.
        module
            .expire_record(&ctx, &record.id, &Coin::from_uwire(1_000_000), 10)
            .unwrap();
        let later = ExecutionContext::new(ctx.chain_id.clone(), ctx.block_height + 1, record.expiry_time.plus_seconds(1));
        let renewed = module.renew_record(&later, &record.id, 3600).unwrap();
        assert!(!renewed.deleted);
        assert_eq!(renewed.created_at, later.block_height);
    }

    #[test]
    fn associate_bond_rejects_existing_bond() {
        let (_dir, module, storage) = test_module();
        fund_bond(&storage, "bond-1", 1_000_000);
        let ctx = ExecutionContext::for_test();
        let (record, _) = module
            .set_record(&ctx, "bond-1", json!({"a": 1}), &[], &Coin::from_uwire(1), 10)
            .unwrap();
        let err = module.associate_bond(&record.id, "bond-2").unwrap_err();
        assert!(matches!(err, ChainError::InvalidRequest(_)));
    }

    #[test]
    fn dissociate_and_reassociate_records_are_batched() {
        let (_dir, module, storage) = test_module();
        fund_bond(&storage, "bond-1", 1_000_000);
        let ctx = ExecutionContext::for_test();
        let (r1, _) = module
            .set_record(&ctx, "bond-1", json!({"a": 1}), &[], &Coin::from_uwire(1), 10)
            .unwrap();
        let (r2, _) = module
            .set_record(&ctx, "bond-1", json!({"a": 2}), &[], &Coin::from_uwire(1), 10)
            .unwrap();

        let moved = module.reassociate_records("bond-1", "bond-2").unwrap();
        assert_eq!(moved.len(), 2);
        assert!(!module.uses_bond("bond-1").unwrap());
        assert!(module.uses_bond("bond-2").unwrap());

        let dissociated = module.dissociate_records("bond-2").unwrap();
        assert_eq!(dissociated.len(), 2);
        assert!(!module.uses_bond("bond-2").unwrap());
        assert_eq!(module.get(&r1.id).unwrap().unwrap().bond_id, "");
        assert_eq!(module.get(&r2.id).unwrap().unwrap().bond_id, "");
    }
}
