// Sealed-bid auction module (spec §4.2): commit/reveal, second-price
// settlement. Bidders commit the content id of a canonical-JSON reveal
// payload during the commit window, then disclose that payload during the
// reveal window; the highest revealed bid wins and pays the second-highest
// revealed amount (or its own bid if there was only one reveal), matching
// `MatchAuctions` in the original auction keeper.

use crate::ledger::Ledger;
use crate::storage::{Column, Storage};
use registry_common::canonical_json::content_id;
use registry_common::coin::{Coin, Coins};
use registry_common::context::ExecutionContext;
use registry_common::error::ChainError;
use registry_common::serializer::{Reader, ReaderError, Serializer, Writer};
use registry_common::time::BlockTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Holds fees and locked bids between commit and settlement; never pays out
/// to or burns from outside bidders' own accounts.
pub const AUCTION_MODULE_ACCOUNT: &str = "auction-module";
/// Sink for the winner's premium over `minimum_bid` (spec §4.2, scenario S3).
pub const AUCTION_BURN_ACCOUNT: &str = "auction_burn";
/// Grace period after settlement before a completed auction and its bids
/// are swept away (spec §4.2 phase table: `completed -> (deleted)`).
const AUCTION_DELETION_GRACE_SECS: u64 = 24 * 3600;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    Commit,
    Reveal,
    Completed,
    Expired,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Auction {
    pub id: String,
    pub name: String,
    pub owner_address: String,
    pub status: AuctionStatus,
    pub commits_end: BlockTime,
    pub reveals_end: BlockTime,
    pub min_bid_uwire: u128,
    pub commit_fee_uwire: u128,
    pub reveal_fee_uwire: u128,
    pub winner: Option<String>,
    pub winner_bid_uwire: Option<u128>,
    pub winning_price_uwire: Option<u128>,
}

impl Serializer for Auction {
    fn write(&self, writer: &mut Writer) {
        let bytes = serde_json::to_vec(self).expect("auction always serializes");
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

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bid {
    pub bidder: String,
    pub commit_hash: String,
    pub commit_fee_uwire: u128,
    pub reveal_fee_uwire: u128,
    pub revealed_amount_uwire: Option<u128>,
}

impl Serializer for Bid {
    fn write(&self, writer: &mut Writer) {
        let bytes = serde_json::to_vec(self).expect("bid always serializes");
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

/// Callbacks the authority registry hooks onto auction lifecycle events
/// (spec §4.4 `on_auction`, `on_auction_bid`, `on_auction_winner_selected`).
pub trait AuctionObserver: Send + Sync {
    fn on_auction_winner_selected(&self, ctx: &ExecutionContext, auction: &Auction) -> Result<(), ChainError>;
}

/// Computes the commit hash for a reveal payload: the content id (spec's
/// record-id CID algorithm) of the canonical-JSON reveal object.
pub fn reveal_commit_hash(
    chain_id: &str,
    auction_id: &str,
    bidder_address: &str,
    bid_amount_uwire: u128,
    noise: &str,
) -> Result<String, ChainError> {
    let payload = serde_json::json!({
        "chainId": chain_id,
        "auctionId": auction_id,
        "bidderAddress": bidder_address,
        "bidAmount": bid_amount_uwire as u64,
        "noise": noise,
    });
    content_id(&payload).map_err(|e| ChainError::invalid_request(format!("cannot hash reveal: {e}")))
}

pub struct AuctionModule {
    storage: Storage,
    ledger: Arc<dyn Ledger>,
    observers: Vec<Box<dyn AuctionObserver>>,
}

impl AuctionModule {
    pub fn new(storage: Storage, ledger: Arc<dyn Ledger>) -> Self {
        AuctionModule {
            storage,
            ledger,
            observers: Vec::new(),
        }
    }

    pub fn register_observer(&mut self, observer: Box<dyn AuctionObserver>) {
        self.observers.push(observer);
    }

    pub fn get(&self, auction_id: &str) -> Result<Option<Auction>, ChainError> {
        Ok(self.storage.load_optional(Column::Auctions, auction_id.as_bytes())?)
    }

    pub fn create_auction(
        &self,
        ctx: &ExecutionContext,
        auction_id: &str,
        name: &str,
        owner_address: &str,
        min_bid: &Coin,
        commit_fee: &Coin,
        reveal_fee: &Coin,
        commits_duration_secs: u64,
        reveals_duration_secs: u64,
    ) -> Result<Auction, ChainError> {
        if self.storage.contains(Column::Auctions, auction_id.as_bytes())? {
            return Err(ChainError::invalid_request("auction already exists"));
        }
        let commits_end = ctx.block_time.plus_seconds(commits_duration_secs);
        let reveals_end = commits_end.plus_seconds(reveals_duration_secs);
        let auction = Auction {
            id: auction_id.to_string(),
            name: name.to_string(),
            owner_address: owner_address.to_string(),
            status: AuctionStatus::Commit,
            commits_end,
            reveals_end,
            min_bid_uwire: min_bid.denom_uwire,
            commit_fee_uwire: commit_fee.denom_uwire,
            reveal_fee_uwire: reveal_fee.denom_uwire,
            winner: None,
            winner_bid_uwire: None,
            winning_price_uwire: None,
        };
        self.save(&auction)?;
        self.storage.insert(
            Column::AuctionsByOwner,
            owner_index_key(owner_address, auction_id),
            &crate::modules::record::Marker,
        )?;
        Ok(auction)
    }

    /// Auction ids created by `owner_address`, in lexicographic order.
    pub fn by_owner(&self, owner_address: &str) -> Result<Vec<String>, ChainError> {
        let mut prefix = owner_address.as_bytes().to_vec();
        prefix.push(0);
        let rows: Vec<(Vec<u8>, crate::modules::record::Marker)> =
            self.storage.iter_prefix(Column::AuctionsByOwner, &prefix)?;
        Ok(rows
            .into_iter()
            .map(|(key, _)| String::from_utf8_lossy(&key[prefix.len()..]).to_string())
            .collect())
    }

    fn load_bid(&self, auction_id: &str, bidder: &str) -> Result<Option<Bid>, ChainError> {
        Ok(self.storage.load_optional(Column::AuctionBids, bid_key(auction_id, bidder))?)
    }

    fn save_bid(&self, auction_id: &str, bid: &Bid) -> Result<(), ChainError> {
        self.storage.insert(Column::AuctionBids, bid_key(auction_id, &bid.bidder), bid)?;
        Ok(())
    }

    /// Deducts `commit_fee + reveal_fee` from `bidder` into the auction
    /// module account. A prior commit from the same bidder is refunded
    /// before the new one is charged (spec §4.2 "replacement semantics").
    pub fn commit_bid(&self, auction_id: &str, bidder: &str, commit: &str, now: BlockTime) -> Result<(), ChainError> {
        let auction = self
            .get(auction_id)?
            .ok_or_else(|| ChainError::invalid_request("auction not found"))?;
        if auction.status != AuctionStatus::Commit || now > auction.commits_end {
            return Err(ChainError::invalid_request("auction is not in the commit phase"));
        }

        if let Some(prior) = self.load_bid(auction_id, bidder)? {
            let refund = Coins::uwire(prior.commit_fee_uwire + prior.reveal_fee_uwire);
            self.ledger.transfer(AUCTION_MODULE_ACCOUNT, bidder, &refund)?;
        }

        let fee = Coins::uwire(auction.commit_fee_uwire + auction.reveal_fee_uwire);
        self.ledger.transfer(bidder, AUCTION_MODULE_ACCOUNT, &fee)?;

        let bid = Bid {
            bidder: bidder.to_string(),
            commit_hash: commit.to_string(),
            commit_fee_uwire: auction.commit_fee_uwire,
            reveal_fee_uwire: auction.reveal_fee_uwire,
            revealed_amount_uwire: None,
        };
        self.save_bid(auction_id, &bid)?;
        Ok(())
    }

    /// Discloses a sealed bid. `reveal_hex` is the hex encoding of a UTF-8
    /// canonical-JSON object whose content id must equal the stored
    /// `commit_hash`, and whose `chainId`/`auctionId`/`bidderAddress` must
    /// match this call (spec §4.2 `RevealBid`).
    pub fn reveal_bid(
        &self,
        ctx: &ExecutionContext,
        auction_id: &str,
        bidder: &str,
        reveal_hex: &str,
    ) -> Result<(), ChainError> {
        let now = ctx.block_time;
        let auction = self
            .get(auction_id)?
            .ok_or_else(|| ChainError::invalid_request("auction not found"))?;
        if now <= auction.commits_end || now > auction.reveals_end {
            return Err(ChainError::invalid_request("auction is not in the reveal phase"));
        }
        let mut bid = self
            .load_bid(auction_id, bidder)?
            .ok_or_else(|| ChainError::invalid_request("no commit found for bidder"))?;

        let reveal_bytes =
            hex::decode(reveal_hex).map_err(|e| ChainError::invalid_request(format!("reveal is not valid hex: {e}")))?;
        let reveal_json: serde_json::Value = serde_json::from_slice(&reveal_bytes)
            .map_err(|e| ChainError::invalid_request(format!("reveal is not valid JSON: {e}")))?;

        let actual_hash = content_id(&reveal_json)
            .map_err(|e| ChainError::invalid_request(format!("cannot hash reveal: {e}")))?;
        if actual_hash != bid.commit_hash {
            return Err(ChainError::invalid_request("reveal does not match commit"));
        }

        let chain_id = reveal_json
            .get("chainId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChainError::invalid_request("reveal missing chainId"))?;
        if chain_id != ctx.chain_id {
            return Err(ChainError::invalid_request("reveal chainId does not match"));
        }
        let reveal_auction_id = reveal_json
            .get("auctionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChainError::invalid_request("reveal missing auctionId"))?;
        if reveal_auction_id != auction_id {
            return Err(ChainError::invalid_request("reveal auctionId does not match"));
        }
        let bidder_address = reveal_json
            .get("bidderAddress")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChainError::invalid_request("reveal missing bidderAddress"))?;
        if bidder_address != bidder {
            return Err(ChainError::invalid_request("reveal bidderAddress does not match signer"));
        }
        let amount_uwire = reveal_json
            .get("bidAmount")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ChainError::invalid_request("reveal missing bidAmount"))? as u128;
        if amount_uwire < auction.min_bid_uwire {
            return Err(ChainError::invalid_request("revealed bid below minimum"));
        }

        self.ledger
            .transfer(bidder, AUCTION_MODULE_ACCOUNT, &Coins::uwire(amount_uwire))?;

        bid.revealed_amount_uwire = Some(amount_uwire);
        self.save_bid(auction_id, &bid)?;
        Ok(())
    }

    pub fn bids(&self, auction_id: &str) -> Result<Vec<Bid>, ChainError> {
        let mut prefix = auction_id.as_bytes().to_vec();
        prefix.push(0);
        let rows: Vec<(Vec<u8>, Bid)> = self.storage.iter_prefix(Column::AuctionBids, &prefix)?;
        Ok(rows.into_iter().map(|(_, bid)| bid).collect())
    }

    /// Settles a concluded auction via second-price rule: the highest
    /// revealed bidder wins, paying the second-highest revealed amount (or
    /// their own bid if theirs was the only reveal). Every revealed bidder
    /// is refunded their locked `bid_amount` and `reveal_fee`; the winner
    /// then pays `winner_price` fresh, and the premium over `minimum_bid`
    /// is burned (spec §4.2, scenario S3). Un-revealed bidders forfeit both
    /// fees, which stay in the module account (spec's open question).
    pub fn complete_auction(&self, ctx: &ExecutionContext, auction_id: &str) -> Result<Auction, ChainError> {
        let now = ctx.block_time;
        let mut auction = self
            .get(auction_id)?
            .ok_or_else(|| ChainError::invalid_request("auction not found"))?;
        if now <= auction.reveals_end {
            return Err(ChainError::invalid_request("reveal phase still open"));
        }
        if auction.status == AuctionStatus::Completed {
            return Ok(auction);
        }

        let bids = self.bids(auction_id)?;
        let mut revealed: Vec<(String, u128)> = bids
            .iter()
            .filter_map(|b| b.revealed_amount_uwire.map(|amt| (b.bidder.clone(), amt)))
            .collect();
        revealed.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        for bid in &bids {
            if bid.revealed_amount_uwire.is_none() {
                continue;
            }
            let refund = Coins::uwire(bid.reveal_fee_uwire + bid.revealed_amount_uwire.unwrap());
            self.ledger.transfer(AUCTION_MODULE_ACCOUNT, &bid.bidder, &refund)?;
        }

        if revealed.is_empty() {
            auction.status = AuctionStatus::Completed;
            auction.winner = None;
            self.save(&auction)?;
            for observer in &self.observers {
                observer.on_auction_winner_selected(ctx, &auction)?;
            }
            return Ok(auction);
        }

        let (winner, top_amount) = revealed[0].clone();
        let price = revealed.get(1).map(|(_, amt)| *amt).unwrap_or(top_amount);

        self.ledger
            .transfer(&winner, AUCTION_MODULE_ACCOUNT, &Coins::uwire(price))?;
        let burn = price.saturating_sub(auction.min_bid_uwire);
        if burn > 0 {
            self.ledger
                .transfer(AUCTION_MODULE_ACCOUNT, AUCTION_BURN_ACCOUNT, &Coins::uwire(burn))?;
        }

        auction.status = AuctionStatus::Completed;
        auction.winner = Some(winner);
        auction.winner_bid_uwire = Some(top_amount);
        auction.winning_price_uwire = Some(price);
        self.save(&auction)?;

        for observer in &self.observers {
            observer.on_auction_winner_selected(ctx, &auction)?;
        }

        Ok(auction)
    }

    /// Auctions whose reveal window has closed but haven't been settled yet.
    pub fn pending_completions(&self, now: BlockTime) -> Result<Vec<String>, ChainError> {
        let rows: Vec<(Vec<u8>, Auction)> = self.storage.iter_all(Column::Auctions)?;
        Ok(rows
            .into_iter()
            .filter(|(_, a)| a.status != AuctionStatus::Completed && a.status != AuctionStatus::Expired && now > a.reveals_end)
            .map(|(_, a)| a.id)
            .collect())
    }

    /// Completed auctions past their deletion grace period (spec §4.2
    /// phase table: `completed -> (deleted)` at `reveals_end_time + 24h`).
    pub fn pending_deletions(&self, now: BlockTime) -> Result<Vec<String>, ChainError> {
        let rows: Vec<(Vec<u8>, Auction)> = self.storage.iter_all(Column::Auctions)?;
        Ok(rows
            .into_iter()
            .filter(|(_, a)| {
                a.status == AuctionStatus::Completed
                    && now > a.reveals_end.plus_seconds(AUCTION_DELETION_GRACE_SECS)
            })
            .map(|(_, a)| a.id)
            .collect())
    }

    /// Removes a completed auction, its owner index entry, and every bid
    /// recorded against it.
    pub fn delete_auction(&self, auction_id: &str) -> Result<(), ChainError> {
        let Some(auction) = self.get(auction_id)? else {
            return Ok(());
        };
        for bid in self.bids(auction_id)? {
            self.storage.remove(Column::AuctionBids, bid_key(auction_id, &bid.bidder))?;
        }
        self.storage
            .remove(Column::AuctionsByOwner, owner_index_key(&auction.owner_address, auction_id))?;
        self.storage.remove(Column::Auctions, auction_id.as_bytes())?;
        Ok(())
    }

    fn save(&self, auction: &Auction) -> Result<(), ChainError> {
        self.storage.insert(Column::Auctions, auction.id.as_bytes(), auction)?;
        Ok(())
    }
}

fn bid_key(auction_id: &str, bidder: &str) -> Vec<u8> {
    let mut key = auction_id.as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(bidder.as_bytes());
    key
}

fn owner_index_key(owner_address: &str, auction_id: &str) -> Vec<u8> {
    let mut key = owner_address.as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(auction_id.as_bytes());
    key
}
