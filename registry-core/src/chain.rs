// Block lifecycle glue (spec §5): `begin_block` / `deliver_tx` / `end_block`
// mirror the three hooks an external consensus driver calls once per
// height. All state mutation happens inside `deliver_tx`; `end_block`
// only sweeps time-bucketed queues and settles auctions whose reveal
// window has closed, then seals the block's changeset.

use crate::ledger::Ledger;
use crate::modules::auction::{AuctionModule, AuctionObserver, Auction};
use crate::modules::authority::AuthorityModule;
use crate::modules::bond::{BondModule, BondUsageObserver};
use crate::modules::changeset::{ChangeKind, ChangesetBuilder, ChangesetJournal};
use crate::modules::record::RecordModule;
use crate::storage::Storage;
use registry_common::coin::Coins;
use registry_common::context::ExecutionContext;
use registry_common::error::ChainError;
use registry_common::params::ModuleParams;
use serde_json::Value;
use std::sync::{Arc, Mutex};

pub enum Msg {
    CreateBond { bond_id: String, owner: String, deposit: Coins },
    RefillBond { bond_id: String, owner: String, amount: Coins },
    WithdrawBond { bond_id: String, owner: String, amount: Coins },
    CancelBond { bond_id: String, owner: String },

    SetRecord { bond_id: String, attributes: Value, signatures: Vec<crate::modules::record::RecordSignature> },
    RenewRecord { record_id: String },
    AssociateBond { record_id: String, bond_id: String },
    DissociateBond { record_id: String },
    DissociateRecords { bond_id: String },
    ReassociateRecords { old_bond_id: String, new_bond_id: String },
    DeleteRecord { record_id: String },

    ReserveAuthority { name: String, owner: String, bond_id: String },
    ReserveSubAuthority { name: String, owner: String, bond_id: String },
    SetAuthorityBond { name: String, owner: String, bond_id: String },
    SetName { wrn_path: String, owner: String, record_id: String },
    DeleteName { wrn_path: String, owner: String },

    CreateAuction { auction_id: String, name: String, owner_address: String },
    CommitBid { auction_id: String, bidder: String, commit: String },
    RevealBid { auction_id: String, bidder: String, reveal_hex: String },
}

struct RecordBondObserver(Storage);
impl BondUsageObserver for RecordBondObserver {
    fn uses_bond(&self, bond_id: &str) -> Result<bool, ChainError> {
        RecordModule::new(self.0.clone()).uses_bond(bond_id)
    }
}

struct AuthorityBondObserver(Storage);
impl BondUsageObserver for AuthorityBondObserver {
    fn uses_bond(&self, bond_id: &str) -> Result<bool, ChainError> {
        AuthorityModule::new(self.0.clone()).uses_bond(bond_id)
    }
}

struct WinnerSelectedObserver(Storage, ModuleParams);
impl AuctionObserver for WinnerSelectedObserver {
    fn on_auction_winner_selected(&self, ctx: &ExecutionContext, auction: &Auction) -> Result<(), ChainError> {
        let authority = AuthorityModule::new(self.0.clone());
        match &auction.winner {
            Some(winner) => {
                let rent_duration = self.1.authority_rent_duration_secs;
                // Winner's bond id is conventionally derived from the auction id;
                // callers associate the real bond via `set_authority_bond` right after.
                authority.on_auction_winner_selected(ctx, &auction.name, winner, "", rent_duration)?;
            }
            None => {
                authority.on_auction_expired(&auction.name)?;
            }
        }
        Ok(())
    }
}

pub struct Chain {
    storage: Storage,
    pub params: ModuleParams,
    pub ledger: Arc<dyn Ledger>,
    bond: BondModule,
    record: RecordModule,
    authority: AuthorityModule,
    auction: AuctionModule,
    changeset_journal: ChangesetJournal,
    pending_changes: Mutex<ChangesetBuilder>,
}

impl Chain {
    pub fn new(storage: Storage, params: ModuleParams, ledger: Arc<dyn Ledger>) -> Self {
        let mut bond = BondModule::new(storage.clone());
        bond.register_observer(Box::new(RecordBondObserver(storage.clone())));
        bond.register_observer(Box::new(AuthorityBondObserver(storage.clone())));

        let mut auction = AuctionModule::new(storage.clone(), ledger.clone());
        auction.register_observer(Box::new(WinnerSelectedObserver(storage.clone(), params.clone())));

        Chain {
            record: RecordModule::new(storage.clone()),
            authority: AuthorityModule::new(storage.clone()),
            changeset_journal: ChangesetJournal::new(storage.clone()),
            bond,
            auction,
            storage,
            params,
            ledger,
            pending_changes: Mutex::new(ChangesetBuilder::new()),
        }
    }

    pub fn begin_block(&self, _ctx: &ExecutionContext) -> Result<(), ChainError> {
        Ok(())
    }

    pub fn deliver_tx(&self, ctx: &ExecutionContext, msg: Msg) -> Result<(), ChainError> {
        match msg {
            Msg::CreateBond { bond_id, owner, deposit } => {
                let max_bond = self.params.max_bond_amount()?;
                self.bond.create_bond(ctx, &bond_id, &owner, deposit, &max_bond)?;
                self.note(ChangeKind::BondCreated { bond_id });
            }
            Msg::RefillBond { bond_id, owner, amount } => {
                let max_bond = self.params.max_bond_amount()?;
                self.bond.refill_bond(&bond_id, &owner, amount, &max_bond)?;
            }
            Msg::WithdrawBond { bond_id, owner, amount } => {
                self.bond.withdraw_bond(&bond_id, &owner, amount)?;
            }
            Msg::CancelBond { bond_id, owner } => {
                let refund = self.bond.cancel_bond(&bond_id, &owner)?;
                self.ledger.transfer("registry-module", &owner, &refund)?;
            }
            Msg::SetRecord { bond_id, attributes, signatures } => {
                let rent = self.params.record_rent()?;
                let (record, _created) = self.record.set_record(
                    ctx,
                    &bond_id,
                    attributes,
                    &signatures,
                    &rent,
                    self.params.record_rent_duration_secs,
                )?;
                self.note(ChangeKind::RecordSet { record_id: record.id });
            }
            Msg::RenewRecord { record_id } => {
                let record = self.record.renew_record(
                    ctx,
                    &record_id,
                    self.params.record_rent_duration_secs,
                )?;
                self.note(ChangeKind::RecordSet { record_id: record.id });
            }
            Msg::AssociateBond { record_id, bond_id } => {
                self.record.associate_bond(&record_id, &bond_id)?;
            }
            Msg::DissociateBond { record_id } => {
                self.record.dissociate_bond(&record_id)?;
            }
            Msg::DissociateRecords { bond_id } => {
                self.record.dissociate_records(&bond_id)?;
            }
            Msg::ReassociateRecords { old_bond_id, new_bond_id } => {
                self.record.reassociate_records(&old_bond_id, &new_bond_id)?;
            }
            Msg::DeleteRecord { record_id } => {
                self.record.delete_record(&record_id)?;
                self.note(ChangeKind::RecordDeleted { record_id });
            }
            Msg::ReserveAuthority { name, owner, bond_id } => {
                self.authority.reserve_authority(
                    ctx,
                    &name,
                    &owner,
                    &bond_id,
                    self.params.authority_rent_duration_secs,
                )?;
                self.note(ChangeKind::AuthorityReserved { name });
            }
            Msg::ReserveSubAuthority { name, owner, bond_id } => {
                self.authority.reserve_sub_authority(
                    ctx,
                    &name,
                    &owner,
                    &bond_id,
                    self.params.authority_rent_duration_secs,
                )?;
                self.note(ChangeKind::AuthorityReserved { name });
            }
            Msg::SetAuthorityBond { name, owner, bond_id } => {
                self.authority.set_authority_bond(&name, &owner, &bond_id)?;
            }
            Msg::SetName { wrn_path, owner, record_id } => {
                self.authority.set_name(&wrn_path, &owner, &record_id, ctx.block_height)?;
                self.note(ChangeKind::NameSet { wrn_path });
            }
            Msg::DeleteName { wrn_path, owner } => {
                self.authority.delete_name(&wrn_path, &owner)?;
                self.note(ChangeKind::NameDeleted { wrn_path });
            }
            Msg::CreateAuction { auction_id, name, owner_address } => {
                let min_bid = self.params.minimum_bid()?;
                let commit_fee = self.params.commit_fee()?;
                let reveal_fee = self.params.reveal_fee()?;
                self.auction.create_auction(
                    ctx,
                    &auction_id,
                    &name,
                    &owner_address,
                    &min_bid,
                    &commit_fee,
                    &reveal_fee,
                    self.params.commits_duration_secs,
                    self.params.reveals_duration_secs,
                )?;
                self.note(ChangeKind::AuctionCreated { auction_id });
            }
            Msg::CommitBid { auction_id, bidder, commit } => {
                self.auction.commit_bid(&auction_id, &bidder, &commit, ctx.block_time)?;
                self.note(ChangeKind::AuctionBidTouched { auction_id, bidder });
            }
            Msg::RevealBid { auction_id, bidder, reveal_hex } => {
                self.auction.reveal_bid(ctx, &auction_id, &bidder, &reveal_hex)?;
                self.note(ChangeKind::AuctionBidTouched { auction_id, bidder });
            }
        }
        Ok(())
    }

    /// Sweeps expiry queues, settles concluded auctions, and seals the
    /// block's changeset. Storage invariants (spec §7 `Invariant`) are
    /// re-checked at the very end and are fatal if they fail.
    pub fn end_block(&self, ctx: &ExecutionContext) -> Result<(), ChainError> {
        let record_rent = self.params.record_rent()?;
        for record_id in self.record.expired_before(ctx.block_time)? {
            let renewed = self.record.expire_record(
                ctx,
                &record_id,
                &record_rent,
                self.params.record_rent_duration_secs,
            )?;
            if renewed {
                self.note(ChangeKind::RecordRenewed { record_id });
            } else {
                self.note(ChangeKind::RecordDeleted { record_id });
            }
        }

        let authority_rent = self.params.authority_rent()?;
        for name in self.authority.expired_before(ctx.block_time)? {
            let renewed = self.authority.expire_authority(
                ctx,
                &name,
                &authority_rent,
                self.params.authority_rent_duration_secs,
            )?;
            if renewed {
                self.note(ChangeKind::AuthorityRenewed { name });
            } else {
                self.note(ChangeKind::AuthorityExpired { name });
            }
        }

        for auction_id in self.auction.pending_completions(ctx.block_time)? {
            self.auction.complete_auction(ctx, &auction_id)?;
            self.note(ChangeKind::AuctionCompleted { auction_id });
        }

        for auction_id in self.auction.pending_deletions(ctx.block_time)? {
            self.auction.delete_auction(&auction_id)?;
            self.note(ChangeKind::AuctionDeleted { auction_id });
        }

        let changeset = {
            let mut pending = self.pending_changes.lock().unwrap();
            std::mem::take(&mut *pending).into_changeset(ctx.block_height)
        };
        self.changeset_journal.commit(&changeset)?;

        self.run_invariants()?;
        Ok(())
    }

    /// Fatal sanity checks that must hold after every block (spec §7,
    /// testable properties 4, 5, 9). Invariant 6 (module-account balance
    /// equals the sum of bond balances) is still not checked here: bonds
    /// are plain `Coins` fields on the `Bond` record rather than entries in
    /// `Ledger`, so there is no bond module-account balance to reconcile
    /// against. The auction module account, by contrast, is fully backed by
    /// `Ledger` transfers now — see `DESIGN.md`.
    pub fn run_invariants(&self) -> Result<(), ChainError> {
        let records = self.storage.iter_all::<crate::modules::record::Record>(crate::storage::Column::Records)?;
        for (_, record) in &records {
            if !record.bond_id.is_empty() && self.bond.get(&record.bond_id)?.is_none() {
                return Err(ChainError::invariant(format!(
                    "record {} references missing bond {}",
                    record.id, record.bond_id
                )));
            }
            let recomputed = registry_common::canonical_json::content_id(&record.attributes).map_err(|e| {
                ChainError::invariant(format!("record {} attributes do not hash: {e}", record.id))
            })?;
            if recomputed != record.id {
                return Err(ChainError::invariant(format!(
                    "record {} id does not match recomputed content id {recomputed}",
                    record.id
                )));
            }
        }

        let authorities = self
            .storage
            .iter_all::<crate::modules::authority::AuthorityEntry>(crate::storage::Column::Authorities)?;
        for (_, authority) in &authorities {
            if authority.status == crate::modules::authority::AuthorityStatus::Active
                && !authority.bond_id.is_empty()
                && self.bond.get(&authority.bond_id)?.is_none()
            {
                return Err(ChainError::invariant(format!(
                    "authority {} references missing bond {}",
                    authority.name, authority.bond_id
                )));
            }
        }

        Ok(())
    }

    pub fn bond(&self) -> &BondModule {
        &self.bond
    }

    pub fn record(&self) -> &RecordModule {
        &self.record
    }

    pub fn authority(&self) -> &AuthorityModule {
        &self.authority
    }

    pub fn auction(&self) -> &AuctionModule {
        &self.auction
    }

    pub fn changesets(&self) -> &ChangesetJournal {
        &self.changeset_journal
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    fn note(&self, entry: ChangeKind) {
        self.pending_changes.lock().unwrap().record(entry);
    }
}
