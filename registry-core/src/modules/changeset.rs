// Per-block changeset journal (spec §4.6): a append-only log of what
// mutated during a block, so light clients can replay proofs without
// downloading the full KV substrate. Each entry names the logical
// resource that changed rather than a raw storage key, since light
// clients reason about records/authorities/bonds, not column families.

use crate::storage::{Column, Storage};
use registry_common::error::ChainError;
use registry_common::serializer::{Reader, ReaderError, Serializer, Writer};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ChangeKind {
    RecordSet { record_id: String },
    RecordRenewed { record_id: String },
    RecordDeleted { record_id: String },
    AuthorityReserved { name: String },
    AuthorityRenewed { name: String },
    AuthorityExpired { name: String },
    NameSet { wrn_path: String },
    NameDeleted { wrn_path: String },
    BondCreated { bond_id: String },
    AuctionCreated { auction_id: String },
    AuctionBidTouched { auction_id: String, bidder: String },
    AuctionCompleted { auction_id: String },
    AuctionDeleted { auction_id: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Changeset {
    pub height: u64,
    pub entries: Vec<ChangeKind>,
}

impl Serializer for Changeset {
    fn write(&self, writer: &mut Writer) {
        let bytes = serde_json::to_vec(self).expect("changeset always serializes");
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

/// Accumulates entries for the block currently being processed; `chain.rs`
/// drains it into storage at the end of `EndBlock`.
#[derive(Default)]
pub struct ChangesetBuilder {
    entries: Vec<ChangeKind>,
}

impl ChangesetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: ChangeKind) {
        self.entries.push(entry);
    }

    pub fn into_changeset(self, height: u64) -> Changeset {
        Changeset {
            height,
            entries: self.entries,
        }
    }
}

pub struct ChangesetJournal {
    storage: Storage,
}

impl ChangesetJournal {
    pub fn new(storage: Storage) -> Self {
        ChangesetJournal { storage }
    }

    pub fn commit(&self, changeset: &Changeset) -> Result<(), ChainError> {
        self.storage
            .insert(Column::Changesets, &changeset.height.to_be_bytes(), changeset)?;
        Ok(())
    }

    pub fn get(&self, height: u64) -> Result<Option<Changeset>, ChainError> {
        Ok(self.storage.load_optional(Column::Changesets, &height.to_be_bytes())?)
    }

    /// Changesets for `from..=to`, in height order, for a light client
    /// catching up across several blocks in one sync pass.
    pub fn range(&self, from: u64, to: u64) -> Result<Vec<Changeset>, ChainError> {
        let mut out = Vec::new();
        for height in from..=to {
            if let Some(cs) = self.get(height)? {
                out.push(cs);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn commit_and_fetch_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let journal = ChangesetJournal::new(storage);

        let mut builder = ChangesetBuilder::new();
        builder.record(ChangeKind::RecordSet {
            record_id: "rec-1".to_string(),
        });
        let changeset = builder.into_changeset(5);
        journal.commit(&changeset).unwrap();

        let fetched = journal.get(5).unwrap().unwrap();
        assert_eq!(fetched.entries.len(), 1);
    }

    #[test]
    fn range_skips_empty_heights() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let journal = ChangesetJournal::new(storage);

        journal
            .commit(&ChangesetBuilder::new().into_changeset(1))
            .unwrap();
        journal
            .commit(&ChangesetBuilder::new().into_changeset(3))
            .unwrap();

        let range = journal.range(1, 3).unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].height, 1);
        assert_eq!(range[1].height, 3);
    }
}
