use strum::{AsRefStr, Display, EnumIter};

/// Backing column families. Composite keys are documented inline; all are
/// designed so that lexicographic byte order equals the iteration order a
/// query handler actually wants (spec §9 "Time-bucketed queues").
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash, EnumIter, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Column {
    /// {bond_id} => Bond
    Bonds,
    /// {owner_address}{bond_id} => ()
    BondsByOwner,

    /// {record_id} => Record
    Records,
    /// {bond_id}{record_id} => ()
    RecordsByBond,
    /// {time_bucket}{record_id} => ()
    RecordExpiryQueue,

    /// {authority_name} => AuthorityEntry
    Authorities,
    /// {time_bucket}{authority_name} => ()
    AuthorityExpiryQueue,

    /// {wrn_path} => NameEntry
    Names,

    /// {auction_id} => Auction
    Auctions,
    /// {owner_address}{auction_id} => ()
    AuctionsByOwner,
    /// {auction_id}{bidder_address} => Bid
    AuctionBids,

    /// {block_height} => Changeset
    Changesets,

    /// Singleton module parameters and other misc chain-level data.
    Params,
}
