use registry_common::context::ExecutionContext;
use registry_common::params::ModuleParams;
use registry_core::chain::Msg;
use registry_core::ledger::InMemoryLedger;
use registry_core::storage::Storage;
use registry_core::Chain;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn chain() -> (TempDir, Chain, Arc<InMemoryLedger>) {
    let dir = TempDir::new().unwrap();
    let storage = Storage::open(dir.path()).unwrap();
    let ledger = Arc::new(InMemoryLedger::new());
    let chain = Chain::new(storage, ModuleParams::default(), ledger.clone());
    (dir, chain, ledger)
}

/// Sub-authority reservation requires ownership of the parent, and the
/// resulting name resolves under the sub-authority's own bond.
#[test]
fn sub_authority_reservation_and_resolution() {
    let (_dir, chain, _ledger) = chain();
    let ctx = ExecutionContext::for_test();

    chain
        .deliver_tx(
            &ctx,
            Msg::CreateBond {
                bond_id: "bond-alice".to_string(),
                owner: "alice".to_string(),
                deposit: registry_common::coin::Coins::uwire(50_000_000),
            },
        )
        .unwrap();
    chain
        .deliver_tx(
            &ctx,
            Msg::ReserveAuthority {
                name: "alice".to_string(),
                owner: "alice".to_string(),
                bond_id: "bond-alice".to_string(),
            },
        )
        .unwrap();
    chain
        .deliver_tx(
            &ctx,
            Msg::ReserveSubAuthority {
                name: "team.alice".to_string(),
                owner: "alice".to_string(),
                bond_id: "bond-alice".to_string(),
            },
        )
        .unwrap();
    chain
        .deliver_tx(
            &ctx,
            Msg::SetRecord {
                bond_id: "bond-alice".to_string(),
                attributes: json!({"type": "website"}),
                signatures: vec![],
            },
        )
        .unwrap();

    let record_id = registry_common::canonical_json::content_id(&json!({"type": "website"})).unwrap();
    chain
        .deliver_tx(
            &ctx,
            Msg::SetName {
                wrn_path: "wrn://team.alice/site".to_string(),
                owner: "alice".to_string(),
                record_id: record_id.clone(),
            },
        )
        .unwrap();

    let resolved = chain
        .authority()
        .resolve_name("wrn://team.alice/site", ctx.block_time)
        .unwrap();
    assert_eq!(resolved, Some(record_id));
}

/// A name auction concludes and hands the authority to the second-price
/// winner; the authority's old owner no longer controls it.
#[test]
fn name_auction_reassigns_authority() {
    let (_dir, chain, ledger) = chain();
    let ctx = ExecutionContext::for_test();
    ledger.set_balance("bidder-a", registry_common::coin::Coins::uwire(10_000_000));
    ledger.set_balance("bidder-b", registry_common::coin::Coins::uwire(10_000_000));

    chain
        .deliver_tx(
            &ctx,
            Msg::CreateBond {
                bond_id: "bond-alice".to_string(),
                owner: "alice".to_string(),
                deposit: registry_common::coin::Coins::uwire(50_000_000),
            },
        )
        .unwrap();
    chain
        .deliver_tx(
            &ctx,
            Msg::ReserveAuthority {
                name: "prized".to_string(),
                owner: "alice".to_string(),
                bond_id: "bond-alice".to_string(),
            },
        )
        .unwrap();
    chain
        .deliver_tx(
            &ctx,
            Msg::CreateAuction {
                auction_id: "auction-1".to_string(),
                name: "prized".to_string(),
                owner_address: "bidder-a".to_string(),
            },
        )
        .unwrap();

    let reveal_payload = |bidder: &str, amount_uwire: u64, noise: &str| {
        hex::encode(
            serde_json::to_vec(&json!({
                "chainId": ctx.chain_id,
                "auctionId": "auction-1",
                "bidderAddress": bidder,
                "bidAmount": amount_uwire,
                "noise": noise,
            }))
            .unwrap(),
        )
    };
    let c1 = registry_core::modules::auction::reveal_commit_hash(&ctx.chain_id, "auction-1", "bidder-a", 5_000_000, "n1").unwrap();
    let c2 = registry_core::modules::auction::reveal_commit_hash(&ctx.chain_id, "auction-1", "bidder-b", 9_000_000, "n2").unwrap();
    chain
        .deliver_tx(
            &ctx,
            Msg::CommitBid {
                auction_id: "auction-1".to_string(),
                bidder: "bidder-a".to_string(),
                commit: c1,
            },
        )
        .unwrap();
    chain
        .deliver_tx(
            &ctx,
            Msg::CommitBid {
                auction_id: "auction-1".to_string(),
                bidder: "bidder-b".to_string(),
                commit: c2,
            },
        )
        .unwrap();

    let reveal_ctx = ExecutionContext::new(ctx.chain_id.clone(), ctx.block_height, ctx.block_time.plus_seconds(4000));
    chain
        .deliver_tx(
            &reveal_ctx,
            Msg::RevealBid {
                auction_id: "auction-1".to_string(),
                bidder: "bidder-a".to_string(),
                reveal_hex: reveal_payload("bidder-a", 5_000_000, "n1"),
            },
        )
        .unwrap();
    chain
        .deliver_tx(
            &reveal_ctx,
            Msg::RevealBid {
                auction_id: "auction-1".to_string(),
                bidder: "bidder-b".to_string(),
                reveal_hex: reveal_payload("bidder-b", 9_000_000, "n2"),
            },
        )
        .unwrap();

    let settle_ctx = ExecutionContext::new(ctx.chain_id.clone(), ctx.block_height, ctx.block_time.plus_seconds(10_000));
    chain.end_block(&settle_ctx).unwrap();

    let authority = chain.authority().get("prized").unwrap().unwrap();
    assert_eq!(authority.owner, "bidder-b");
}
