// Light sync engine (spec §4.7): verify a chain of signed commits one
// header at a time, check each height's changeset against the header's
// `app_hash`, and bail out via a sync-timeout watchdog rather than hang
// forever against an unresponsive or censoring endpoint.

use crate::endpoint::EndpointPool;
use crate::header::{verify_commit, Commit, Header, ValidatorSet};
use registry_common::crypto::sha256;
use registry_core::modules::changeset::Changeset;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LightClientError {
    #[error("commit at height {0} failed signature verification")]
    UntrustedCommit(u64),
    #[error("changeset at height {0} does not match the header's app hash")]
    ChangesetMismatch(u64),
    #[error("sync timed out after {0:?} with no responsive endpoint")]
    SyncTimeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisFile {
    pub header: Header,
    pub validators: Vec<registry_common::crypto::PublicKey>,
    pub threshold_bps: u32,
}

#[derive(Clone, Debug)]
pub struct SyncState {
    pub trusted_header: Header,
    pub validators: ValidatorSet,
    pub height: u64,
}

/// Whether a changeset is the one committed to by `header.app_hash`.
/// The substrate's full Merkle tree is reserved for per-key inclusion
/// proofs (`MerkleProof`); the whole-block changeset only needs a direct
/// content-hash commitment since it is always verified in full.
pub fn verify_changeset(header: &Header, changeset_bytes: &[u8]) -> bool {
    sha256(changeset_bytes).to_string() == header.app_hash
}

pub struct LightClient {
    http: reqwest::Client,
    pool: EndpointPool,
    pub sync_timeout: Duration,
}

impl LightClient {
    pub fn new(pool: EndpointPool, sync_timeout: Duration) -> Self {
        LightClient {
            http: reqwest::Client::new(),
            pool,
            sync_timeout,
        }
    }

    pub fn init_from_genesis_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<SyncState> {
        let bytes = std::fs::read(path)?;
        let genesis: GenesisFile = serde_json::from_slice(&bytes)?;
        Ok(SyncState {
            trusted_header: genesis.header,
            validators: ValidatorSet::new(genesis.validators, genesis.threshold_bps),
            height: 0,
        })
    }

    pub async fn init_from_node(&self, endpoint: &str) -> anyhow::Result<SyncState> {
        let genesis: GenesisFile = self
            .http
            .get(format!("{endpoint}/light/genesis"))
            .send()
            .await?
            .json()
            .await?;
        Ok(SyncState {
            trusted_header: genesis.header,
            validators: ValidatorSet::new(genesis.validators, genesis.threshold_bps),
            height: 0,
        })
    }

    /// Advances `state` by exactly one height, trying each pooled endpoint
    /// in order until one responds.
    pub async fn sync_height(&self, state: &mut SyncState, height: u64) -> Result<Changeset, LightClientError> {
        let attempt = tokio::time::timeout(self.sync_timeout, self.sync_height_inner(state, height));
        match attempt.await {
            Ok(result) => result,
            Err(_) => Err(LightClientError::SyncTimeout(self.sync_timeout)),
        }
    }

    async fn sync_height_inner(&self, state: &mut SyncState, height: u64) -> Result<Changeset, LightClientError> {
        let mut last_err = None;
        for endpoint in self.pool.ordered() {
            match self.fetch_and_verify(state, endpoint, height).await {
                Ok(changeset) => return Ok(changeset),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| LightClientError::UntrustedCommit(height)))
    }

    async fn fetch_and_verify(
        &self,
        state: &mut SyncState,
        endpoint: &str,
        height: u64,
    ) -> Result<Changeset, LightClientError> {
        let commit: Commit = self
            .http
            .get(format!("{endpoint}/light/commit/{height}"))
            .send()
            .await
            .map_err(|e| LightClientError::Transport(e.into()))?
            .json()
            .await
            .map_err(|e| LightClientError::Transport(e.into()))?;

        if !verify_commit(&commit, &state.validators) {
            return Err(LightClientError::UntrustedCommit(height));
        }

        let changeset_bytes = self
            .http
            .get(format!("{endpoint}/light/changeset/{height}"))
            .send()
            .await
            .map_err(|e| LightClientError::Transport(e.into()))?
            .bytes()
            .await
            .map_err(|e| LightClientError::Transport(e.into()))?;

        if !verify_changeset(&commit.header, &changeset_bytes) {
            return Err(LightClientError::ChangesetMismatch(height));
        }

        let changeset: Changeset = serde_json::from_slice(&changeset_bytes)
            .map_err(|e| LightClientError::Transport(e.into()))?;

        state.trusted_header = commit.header;
        state.height = height;
        Ok(changeset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_common::time::BlockTime;

    #[test]
    fn verify_changeset_matches_direct_hash() {
        let bytes = b"{\"height\":1,\"entries\":[]}".to_vec();
        let header = Header {
            height: 1,
            time: BlockTime::from_secs(1),
            app_hash: sha256(&bytes).to_string(),
            validators_hash: "feedface".to_string(),
        };
        assert!(verify_changeset(&header, &bytes));
    }

    #[test]
    fn verify_changeset_rejects_tampered_bytes() {
        let bytes = b"{\"height\":1,\"entries\":[]}".to_vec();
        let header = Header {
            height: 1,
            time: BlockTime::from_secs(1),
            app_hash: sha256(&bytes).to_string(),
            validators_hash: "feedface".to_string(),
        };
        assert!(!verify_changeset(&header, b"tampered"));
    }
}
