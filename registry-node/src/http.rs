// Query HTTP surface (spec §4.8). Every route is read-only; transaction
// submission is out of scope for this node binary (spec Non-goals —
// mempool/p2p transaction gossip belongs to the external consensus
// driver, not this crate).

use actix_web::{web, HttpResponse};
use registry_common::time::BlockTime;
use registry_core::{Chain, QueryApi};
use serde::Deserialize;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/bonds/{bond_id}").route(web::get().to(get_bond)))
        .service(web::resource("/records/{record_id}").route(web::get().to(get_record)))
        .service(web::resource("/records/{record_id}/expiry").route(web::get().to(record_expiry)))
        .service(web::resource("/authorities/{name}").route(web::get().to(whois)))
        .service(web::resource("/authorities/{name}/expiry").route(web::get().to(authority_expiry)))
        .service(web::resource("/names").route(web::get().to(lookup)))
        .service(web::resource("/resolve").route(web::get().to(resolve)))
        .service(web::resource("/auctions/{auction_id}").route(web::get().to(get_auction)))
        .service(web::resource("/balances/{address}").route(web::get().to(get_balance)))
        .service(web::resource("/owners/{address}/bonds").route(web::get().to(bonds_by_owner)))
        .service(web::resource("/owners/{address}/auctions").route(web::get().to(auctions_by_owner)))
        .service(web::resource("/params").route(web::get().to(get_params)));
}

async fn get_bond(chain: web::Data<Arc<Chain>>, path: web::Path<String>) -> HttpResponse {
    let api = QueryApi::new(&chain);
    match api.get_bond(&path) {
        Ok(Some(bond)) => HttpResponse::Ok().json(bond),
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

async fn get_record(chain: web::Data<Arc<Chain>>, path: web::Path<String>) -> HttpResponse {
    let api = QueryApi::new(&chain);
    match api.get_record(&path) {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

async fn record_expiry(chain: web::Data<Arc<Chain>>, path: web::Path<String>) -> HttpResponse {
    let api = QueryApi::new(&chain);
    match api.record_expiry(&path) {
        Ok(Some(time)) => HttpResponse::Ok().json(time),
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

async fn whois(chain: web::Data<Arc<Chain>>, path: web::Path<String>) -> HttpResponse {
    let api = QueryApi::new(&chain);
    match api.whois(&path) {
        Ok(Some(entry)) => HttpResponse::Ok().json(entry),
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

async fn authority_expiry(chain: web::Data<Arc<Chain>>, path: web::Path<String>) -> HttpResponse {
    let api = QueryApi::new(&chain);
    match api.authority_expiry(&path) {
        Ok(Some(time)) => HttpResponse::Ok().json(time),
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

#[derive(Deserialize)]
struct PrefixQuery {
    prefix: String,
}

async fn lookup(chain: web::Data<Arc<Chain>>, query: web::Query<PrefixQuery>) -> HttpResponse {
    let api = QueryApi::new(&chain);
    match api.lookup(&query.prefix) {
        Ok(names) => HttpResponse::Ok().json(names),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

#[derive(Deserialize)]
struct ResolveQuery {
    wrn: String,
    at_secs: u64,
}

async fn resolve(chain: web::Data<Arc<Chain>>, query: web::Query<ResolveQuery>) -> HttpResponse {
    let api = QueryApi::new(&chain);
    match api.resolve(&query.wrn, BlockTime::from_secs(query.at_secs)) {
        Ok(Some(record_id)) => HttpResponse::Ok().json(record_id),
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

async fn get_auction(chain: web::Data<Arc<Chain>>, path: web::Path<String>) -> HttpResponse {
    let api = QueryApi::new(&chain);
    match api.get_auction(&path) {
        Ok(Some(auction)) => HttpResponse::Ok().json(auction),
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

async fn get_balance(chain: web::Data<Arc<Chain>>, path: web::Path<String>) -> HttpResponse {
    let api = QueryApi::new(&chain);
    match api.balance(&path) {
        Ok(balance) => HttpResponse::Ok().json(balance),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

async fn bonds_by_owner(chain: web::Data<Arc<Chain>>, path: web::Path<String>) -> HttpResponse {
    let api = QueryApi::new(&chain);
    match api.bonds_by_owner(&path) {
        Ok(ids) => HttpResponse::Ok().json(ids),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

async fn auctions_by_owner(chain: web::Data<Arc<Chain>>, path: web::Path<String>) -> HttpResponse {
    let api = QueryApi::new(&chain);
    match api.auctions_by_owner(&path) {
        Ok(ids) => HttpResponse::Ok().json(ids),
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

async fn get_params(chain: web::Data<Arc<Chain>>) -> HttpResponse {
    let api = QueryApi::new(&chain);
    HttpResponse::Ok().json(api.parameters())
}
