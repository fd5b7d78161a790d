// Bond/escrow module (spec §4.1). A bond is a simple coin balance an
// address owns and can top up, withdraw from, or cancel, provided no other
// module is currently drawing rent from it. The cyclic-dependency problem
// this would otherwise create (bond depending on record/authority, which
// depend on bond) is broken with an observer list, matching the teacher's
// `usageKeepers` pattern in the original auction keeper.

use crate::storage::{Column, Storage};
use registry_common::coin::{Coin, Coins};
use registry_common::context::ExecutionContext;
use registry_common::error::{ChainError, StorageError};
use registry_common::serializer::{Reader, ReaderError, Serializer, Writer};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bond {
    pub id: String,
    pub owner: String,
    pub balance: Coins,
    pub created_at: u64,
}

impl Serializer for Bond {
    fn write(&self, writer: &mut Writer) {
        let bytes = serde_json::to_vec(self).expect("bond always serializes");
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

/// Implemented by every module that can hold a "this bond is in use" veto
/// over `CancelBond` (spec §4.1 invariant: a bond backing a live record or
/// authority cannot be cancelled out from under it).
pub trait BondUsageObserver: Send + Sync {
    fn uses_bond(&self, bond_id: &str) -> Result<bool, ChainError>;
}

pub struct BondModule {
    storage: Storage,
    observers: Vec<Box<dyn BondUsageObserver>>,
}

impl BondModule {
    pub fn new(storage: Storage) -> Self {
        BondModule {
            storage,
            observers: Vec::new(),
        }
    }

    pub fn register_observer(&mut self, observer: Box<dyn BondUsageObserver>) {
        self.observers.push(observer);
    }

    pub fn get(&self, bond_id: &str) -> Result<Option<Bond>, ChainError> {
        Ok(self.storage.load_optional(Column::Bonds, bond_id.as_bytes())?)
    }

    pub fn create_bond(
        &self,
        ctx: &ExecutionContext,
        bond_id: &str,
        owner: &str,
        deposit: Coins,
        max_bond_amount: &Coin,
    ) -> Result<Bond, ChainError> {
        if self.storage.contains(Column::Bonds, bond_id.as_bytes())? {
            return Err(ChainError::invalid_request("bond already exists"));
        }
        if deposit.total_uwire() > max_bond_amount.denom_uwire {
            return Err(ChainError::invalid_request("deposit exceeds the maximum bond amount"));
        }
        let bond = Bond {
            id: bond_id.to_string(),
            owner: owner.to_string(),
            balance: deposit,
            created_at: ctx.block_height,
        };
        self.save(&bond)?;
        self.storage.insert(
            Column::BondsByOwner,
            owner_index_key(owner, bond_id),
            &crate::modules::record::Marker,
        )?;
        Ok(bond)
    }

    /// Bond ids owned by `owner`, in lexicographic order.
    pub fn by_owner(&self, owner: &str) -> Result<Vec<String>, ChainError> {
        let mut prefix = owner.as_bytes().to_vec();
        prefix.push(0);
        let rows: Vec<(Vec<u8>, crate::modules::record::Marker)> =
            self.storage.iter_prefix(Column::BondsByOwner, &prefix)?;
        Ok(rows
            .into_iter()
            .map(|(key, _)| String::from_utf8_lossy(&key[prefix.len()..]).to_string())
            .collect())
    }

    pub fn refill_bond(
        &self,
        bond_id: &str,
        owner: &str,
        amount: Coins,
        max_bond_amount: &Coin,
    ) -> Result<Bond, ChainError> {
        let mut bond = self
            .get(bond_id)?
            .ok_or_else(|| ChainError::invalid_request("bond not found"))?;
        if bond.owner != owner {
            return Err(ChainError::unauthorized("only the bond owner may refill"));
        }
        let new_balance = bond.balance.checked_add(&amount)?;
        if new_balance.total_uwire() > max_bond_amount.denom_uwire {
            return Err(ChainError::invalid_request("refill would exceed the maximum bond amount"));
        }
        bond.balance = new_balance;
        self.save(&bond)?;
        Ok(bond)
    }

    pub fn withdraw_bond(&self, bond_id: &str, owner: &str, amount: Coins) -> Result<Bond, ChainError> {
        let mut bond = self
            .get(bond_id)?
            .ok_or_else(|| ChainError::invalid_request("bond not found"))?;
        if bond.owner != owner {
            return Err(ChainError::unauthorized("only the bond owner may withdraw"));
        }
        if !bond.balance.is_all_gte(&amount) {
            return Err(ChainError::insufficient_funds("bond balance too low"));
        }
        bond.balance = bond.balance.checked_sub(&amount)?;
        self.save(&bond)?;
        Ok(bond)
    }

    /// Deducts rent directly, bypassing the owner-authorization check —
    /// called only by the record/authority rent sweep during `EndBlock`.
    pub fn deduct_rent(&self, bond_id: &str, rent: &Coin) -> Result<(), ChainError> {
        let mut bond = self
            .get(bond_id)?
            .ok_or_else(|| ChainError::invalid_request("bond not found"))?;
        let rent_coins: Coins = (*rent).into();
        if !bond.balance.is_all_gte(&rent_coins) {
            return Err(ChainError::insufficient_funds("bond exhausted"));
        }
        bond.balance = bond.balance.checked_sub(&rent_coins)?;
        self.save(&bond)?;
        Ok(())
    }

    pub fn cancel_bond(&self, bond_id: &str, owner: &str) -> Result<Coins, ChainError> {
        let bond = self
            .get(bond_id)?
            .ok_or_else(|| ChainError::invalid_request("bond not found"))?;
        if bond.owner != owner {
            return Err(ChainError::unauthorized("only the bond owner may cancel"));
        }
        for observer in &self.observers {
            if observer.uses_bond(bond_id)? {
                return Err(ChainError::invalid_request(
                    "bond is still backing a live record or authority",
                ));
            }
        }
        self.storage.remove(Column::Bonds, bond_id.as_bytes())?;
        self.storage
            .remove(Column::BondsByOwner, owner_index_key(owner, bond_id))?;
        Ok(bond.balance)
    }

    fn save(&self, bond: &Bond) -> Result<(), StorageError> {
        self.storage.insert(Column::Bonds, bond.id.as_bytes(), bond)
    }
}

fn owner_index_key(owner: &str, bond_id: &str) -> Vec<u8> {
    let mut key = owner.as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(bond_id.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_common::coin::Coins;
    use tempfile::TempDir;

    fn test_module() -> (TempDir, BondModule) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        (dir, BondModule::new(storage))
    }

    fn ceiling() -> Coin {
        Coin::from_uwire(100_000_000)
    }

    #[test]
    fn create_refill_withdraw_roundtrip() {
        let (_dir, module) = test_module();
        let ctx = ExecutionContext::for_test();
        module
            .create_bond(&ctx, "bond-1", "alice", Coins::uwire(1_000_000), &ceiling())
            .unwrap();
        module
            .refill_bond("bond-1", "alice", Coins::uwire(500_000), &ceiling())
            .unwrap();
        let bond = module
            .withdraw_bond("bond-1", "alice", Coins::uwire(200_000))
            .unwrap();
        assert_eq!(bond.balance.total_uwire(), 1_300_000);
    }

    #[test]
    fn withdraw_rejects_wrong_owner() {
        let (_dir, module) = test_module();
        let ctx = ExecutionContext::for_test();
        module
            .create_bond(&ctx, "bond-1", "alice", Coins::uwire(1_000_000), &ceiling())
            .unwrap();
        let err = module
            .withdraw_bond("bond-1", "mallory", Coins::uwire(1))
            .unwrap_err();
        assert!(matches!(err, ChainError::Unauthorized(_)));
    }

    #[test]
    fn refill_rejects_wrong_owner() {
        let (_dir, module) = test_module();
        let ctx = ExecutionContext::for_test();
        module
            .create_bond(&ctx, "bond-1", "alice", Coins::uwire(1_000_000), &ceiling())
            .unwrap();
        let err = module
            .refill_bond("bond-1", "mallory", Coins::uwire(1), &ceiling())
            .unwrap_err();
        assert!(matches!(err, ChainError::Unauthorized(_)));
    }

    #[test]
    fn create_rejects_deposit_over_ceiling() {
        let (_dir, module) = test_module();
        let ctx = ExecutionContext::for_test();
        let err = module
            .create_bond(&ctx, "bond-1", "alice", Coins::uwire(200_000_000), &ceiling())
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidRequest(_)));
    }

    #[test]
    fn refill_rejects_result_over_ceiling() {
        let (_dir, module) = test_module();
        let ctx = ExecutionContext::for_test();
        module
            .create_bond(&ctx, "bond-1", "alice", Coins::uwire(90_000_000), &ceiling())
            .unwrap();
        let err = module
            .refill_bond("bond-1", "alice", Coins::uwire(20_000_000), &ceiling())
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidRequest(_)));
    }

    #[test]
    fn by_owner_reflects_creation_and_cancellation() {
        let (_dir, module) = test_module();
        let ctx = ExecutionContext::for_test();
        module
            .create_bond(&ctx, "bond-1", "alice", Coins::uwire(1_000_000), &ceiling())
            .unwrap();
        module
            .create_bond(&ctx, "bond-2", "alice", Coins::uwire(1_000_000), &ceiling())
            .unwrap();
        assert_eq!(
            module.by_owner("alice").unwrap(),
            vec!["bond-1".to_string(), "bond-2".to_string()]
        );
        module.cancel_bond("bond-1", "alice").unwrap();
        assert_eq!(module.by_owner("alice").unwrap(), vec!["bond-2".to_string()]);
    }

    #[test]
    fn deduct_rent_exhausts_then_fails() {
        let (_dir, module) = test_module();
        let ctx = ExecutionContext::for_test();
        module
            .create_bond(&ctx, "bond-1", "alice", Coins::uwire(2_000_000), &ceiling())
            .unwrap();
        module.deduct_rent("bond-1", &Coin::from_uwire(1_000_000)).unwrap();
        let bond = module.get("bond-1").unwrap().unwrap();
        assert_eq!(bond.balance.total_uwire(), 1_000_000);

        module.deduct_rent("bond-1", &Coin::from_uwire(1_000_000)).unwrap();
        let err = module.deduct_rent("bond-1", &Coin::from_uwire(1)).unwrap_err();
        assert!(matches!(err, ChainError::InsufficientFunds(_)));
    }

    struct AlwaysInUse;
    impl BondUsageObserver for AlwaysInUse {
        fn uses_bond(&self, _bond_id: &str) -> Result<bool, ChainError> {
            Ok(true)
        }
    }

    #[test]
    fn cancel_blocked_while_in_use() {
        let (_dir, mut module) = test_module();
        let ctx = ExecutionContext::for_test();
        module
            .create_bond(&ctx, "bond-1", "alice", Coins::uwire(1_000_000), &ceiling())
            .unwrap();
        module.register_observer(Box::new(AlwaysInUse));
        let err = module.cancel_bond("bond-1", "alice").unwrap_err();
        assert!(matches!(err, ChainError::InvalidRequest(_)));
    }
}
