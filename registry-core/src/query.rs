// Read-only query surface (spec §4.8), the same handlers `registry-node`
// exposes over HTTP and light clients replay against locally verified
// state. Every method here takes `&Chain` and returns owned data — no
// handler mutates state.

use crate::chain::Chain;
use crate::modules::auction::Auction;
use crate::modules::authority::AuthorityEntry;
use crate::modules::bond::Bond;
use crate::modules::record::Record;
use registry_common::coin::Coins;
use registry_common::error::ChainError;
use registry_common::params::ModuleParams;
use registry_common::time::BlockTime;

pub struct QueryApi<'a> {
    chain: &'a Chain,
}

impl<'a> QueryApi<'a> {
    pub fn new(chain: &'a Chain) -> Self {
        QueryApi { chain }
    }

    pub fn parameters(&self) -> &ModuleParams {
        &self.chain.params
    }

    pub fn balance(&self, address: &str) -> Result<Coins, ChainError> {
        self.chain.ledger.balance(address)
    }

    pub fn get_bond(&self, bond_id: &str) -> Result<Option<Bond>, ChainError> {
        self.chain.bond().get(bond_id)
    }

    pub fn get_record(&self, record_id: &str) -> Result<Option<Record>, ChainError> {
        Ok(self.chain.record().get(record_id)?.filter(|r| !r.deleted))
    }

    pub fn record_expiry(&self, record_id: &str) -> Result<Option<BlockTime>, ChainError> {
        Ok(self.get_record(record_id)?.map(|r| r.expiry_time))
    }

    pub fn query_records_by_bond(&self, bond_id: &str) -> Result<bool, ChainError> {
        self.chain.record().uses_bond(bond_id)
    }

    pub fn bonds_by_owner(&self, owner: &str) -> Result<Vec<String>, ChainError> {
        self.chain.bond().by_owner(owner)
    }

    pub fn auctions_by_owner(&self, owner: &str) -> Result<Vec<String>, ChainError> {
        self.chain.auction().by_owner(owner)
    }

    pub fn whois(&self, authority_name: &str) -> Result<Option<AuthorityEntry>, ChainError> {
        self.chain.authority().get(authority_name)
    }

    pub fn authority_expiry(&self, authority_name: &str) -> Result<Option<BlockTime>, ChainError> {
        Ok(self.chain.authority().get(authority_name)?.map(|a| a.expiry_time))
    }

    pub fn lookup(&self, wrn_path_prefix: &str) -> Result<Vec<String>, ChainError> {
        self.chain.authority().lookup_names(wrn_path_prefix)
    }

    pub fn resolve(&self, wrn_path: &str, now: BlockTime) -> Result<Option<String>, ChainError> {
        self.chain.authority().resolve_name(wrn_path, now)
    }

    pub fn get_auction(&self, auction_id: &str) -> Result<Option<Auction>, ChainError> {
        self.chain.auction().get(auction_id)
    }
}
