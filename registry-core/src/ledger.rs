// Minimal token ledger collaborator (spec §1: the registry assumes an
// external bank/ledger module exists and only needs to move balances
// to/from its own module account). `InMemoryLedger` is a test double;
// production deployments wire this trait to whatever bank module the
// surrounding chain already has.

use registry_common::coin::Coins;
use registry_common::error::ChainError;
use std::collections::HashMap;
use std::sync::Mutex;

pub trait Ledger: Send + Sync {
    fn balance(&self, address: &str) -> Result<Coins, ChainError>;
    fn transfer(&self, from: &str, to: &str, amount: &Coins) -> Result<(), ChainError>;
}

#[derive(Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<String, Coins>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, address: &str, amount: Coins) {
        self.balances.lock().unwrap().insert(address.to_string(), amount);
    }
}

impl Ledger for InMemoryLedger {
    fn balance(&self, address: &str) -> Result<Coins, ChainError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    fn transfer(&self, from: &str, to: &str, amount: &Coins) -> Result<(), ChainError> {
        let mut balances = self.balances.lock().unwrap();
        let from_balance = balances.get(from).cloned().unwrap_or_default();
        if !from_balance.is_all_gte(amount) {
            return Err(ChainError::insufficient_funds(format!("{from} cannot cover transfer")));
        }
        let new_from = from_balance.checked_sub(amount)?;
        let to_balance = balances.get(to).cloned().unwrap_or_default();
        let new_to = to_balance.checked_add(amount)?;
        balances.insert(from.to_string(), new_from);
        balances.insert(to.to_string(), new_to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_moves_balance() {
        let ledger = InMemoryLedger::new();
        ledger.set_balance("alice", Coins::uwire(1_000_000));
        ledger.transfer("alice", "bob", &Coins::uwire(400_000)).unwrap();
        assert_eq!(ledger.balance("alice").unwrap().total_uwire(), 600_000);
        assert_eq!(ledger.balance("bob").unwrap().total_uwire(), 400_000);
    }

    #[test]
    fn transfer_rejects_insufficient_balance() {
        let ledger = InMemoryLedger::new();
        ledger.set_balance("alice", Coins::uwire(100));
        let err = ledger.transfer("alice", "bob", &Coins::uwire(400_000)).unwrap_err();
        assert!(matches!(err, ChainError::InsufficientFunds(_)));
    }
}
