// Governance-adjustable module parameters (spec §6), threaded through
// constructors as an explicit struct rather than a process-global
// singleton (spec §9 "Global-state management").

use crate::coin::{parse_coin, Coin, CoinError};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleParams {
    pub max_bond_amount: String,

    pub record_rent: String,
    pub record_rent_duration_secs: u64,

    pub authority_rent: String,
    pub authority_rent_duration_secs: u64,
    pub authority_grace_period_secs: u64,
    pub authority_auction_enabled: bool,

    pub commits_duration_secs: u64,
    pub reveals_duration_secs: u64,
    pub commit_fee: String,
    pub reveal_fee: String,
    pub minimum_bid: String,
}

impl Default for ModuleParams {
    fn default() -> Self {
        ModuleParams {
            max_bond_amount: "100000000000uwire".to_string(),
            record_rent: "1000000uwire".to_string(),
            record_rent_duration_secs: 3600,
            authority_rent: "1000000uwire".to_string(),
            authority_rent_duration_secs: 3600,
            authority_grace_period_secs: 7 * 24 * 3600,
            authority_auction_enabled: false,
            commits_duration_secs: 3600,
            reveals_duration_secs: 3600,
            commit_fee: "100000uwire".to_string(),
            reveal_fee: "100000uwire".to_string(),
            minimum_bid: "5000000uwire".to_string(),
        }
    }
}

impl ModuleParams {
    pub fn max_bond_amount(&self) -> Result<Coin, CoinError> {
        parse_coin(&self.max_bond_amount)
    }

    pub fn record_rent(&self) -> Result<Coin, CoinError> {
        parse_coin(&self.record_rent)
    }

    pub fn authority_rent(&self) -> Result<Coin, CoinError> {
        parse_coin(&self.authority_rent)
    }

    pub fn commit_fee(&self) -> Result<Coin, CoinError> {
        parse_coin(&self.commit_fee)
    }

    pub fn reveal_fee(&self) -> Result<Coin, CoinError> {
        parse_coin(&self.reveal_fee)
    }

    pub fn minimum_bid(&self) -> Result<Coin, CoinError> {
        parse_coin(&self.minimum_bid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_cleanly() {
        let params = ModuleParams::default();
        assert!(params.max_bond_amount().is_ok());
        assert!(params.record_rent().is_ok());
        assert!(params.authority_rent().is_ok());
        assert!(params.commit_fee().is_ok());
        assert!(params.reveal_fee().is_ok());
        assert!(params.minimum_bid().is_ok());
    }
}
