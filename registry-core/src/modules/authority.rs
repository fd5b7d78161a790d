// Authority registry (spec §4.4): hierarchical naming authorities
// (`alice`, `team.alice`, …) and the name index that maps a WRN path under
// an authority to a record. Grounded on the reserve/sub-authority/name
// lifecycle of the original naming keeper.

use crate::modules::authority_reserved::is_reserved_root_name;
use crate::modules::bond::BondModule;
use crate::modules::record::Marker;
use crate::storage::{Column, Storage};
use registry_common::coin::Coin;
use registry_common::context::ExecutionContext;
use registry_common::error::ChainError;
use registry_common::serializer::{Reader, ReaderError, Serializer, Writer};
use registry_common::time::BlockTime;
use registry_common::wrn::split_parent;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityStatus {
    Active,
    /// Past `expiry_time` but still within the grace period; can still be
    /// renewed by its owner, but no longer resolves names.
    Expired,
    /// Handed off to an auction for re-assignment.
    Auction,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorityEntry {
    pub name: String,
    pub owner: String,
    pub bond_id: String,
    pub status: AuthorityStatus,
    pub created_at: u64,
    pub expiry_time: BlockTime,
}

impl Serializer for AuthorityEntry {
    fn write(&self, writer: &mut Writer) {
        let bytes = serde_json::to_vec(self).expect("authority always serializes");
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
pub struct NameEntry {
    pub record_id: String,
    pub height: u64,
}

impl Serializer for NameEntry {
    fn write(&self, writer: &mut Writer) {
        let bytes = serde_json::to_vec(self).expect("name entry always serializes");
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

pub struct AuthorityModule {
    storage: Storage,
}

impl AuthorityModule {
    pub fn new(storage: Storage) -> Self {
        AuthorityModule { storage }
    }

    pub fn get(&self, name: &str) -> Result<Option<AuthorityEntry>, ChainError> {
        Ok(self.storage.load_optional(Column::Authorities, name.as_bytes())?)
    }

    /// Reserves a root authority. Sub-authorities are reserved via
    /// `reserve_sub_authority`, which requires owning the parent.
    pub fn reserve_authority(
        &self,
        ctx: &ExecutionContext,
        name: &str,
        owner: &str,
        bond_id: &str,
        rent_duration_secs: u64,
    ) -> Result<AuthorityEntry, ChainError> {
        let (parent, _) = split_parent(name);
        if parent.is_some() {
            return Err(ChainError::invalid_request(
                "sub-authorities must be reserved via reserve_sub_authority",
            ));
        }
        if is_reserved_root_name(name) {
            return Err(ChainError::invalid_request("name is reserved"));
        }
        self.reserve(ctx, name, owner, bond_id, rent_duration_secs)
    }

    pub fn reserve_sub_authority(
        &self,
        ctx: &ExecutionContext,
        name: &str,
        owner: &str,
        bond_id: &str,
        rent_duration_secs: u64,
    ) -> Result<AuthorityEntry, ChainError> {
        let (parent, _) = split_parent(name);
        let parent = parent.ok_or_else(|| ChainError::invalid_request("not a sub-authority name"))?;
        let parent_entry = self
            .get(parent)?
            .ok_or_else(|| ChainError::invalid_request("parent authority not reserved"))?;
        if parent_entry.owner != owner {
            return Err(ChainError::unauthorized("only the parent authority owner may reserve sub-authorities"));
        }
        self.reserve(ctx, name, owner, bond_id, rent_duration_secs)
    }

    /// An authority name is reservable if it has never been reserved, or if
    /// its current holder has let it lapse past the grace period (spec:
    /// "an expired authority can be re-reserved by anyone").
    fn reserve(
        &self,
        ctx: &ExecutionContext,
        name: &str,
        owner: &str,
        bond_id: &str,
        rent_duration_secs: u64,
    ) -> Result<AuthorityEntry, ChainError> {
        if let Some(existing) = self.get(name)? {
            if existing.status != AuthorityStatus::Expired {
                return Err(ChainError::invalid_request("authority already reserved"));
            }
            self.unschedule_expiry(&existing)?;
        }
        let entry = AuthorityEntry {
            name: name.to_string(),
            owner: owner.to_string(),
            bond_id: bond_id.to_string(),
            status: AuthorityStatus::Active,
            created_at: ctx.block_height,
            expiry_time: ctx.block_time.plus_seconds(rent_duration_secs),
        };
        self.save(&entry)?;
        self.schedule_expiry(&entry)?;
        Ok(entry)
    }

    pub fn set_authority_bond(&self, name: &str, owner: &str, bond_id: &str) -> Result<AuthorityEntry, ChainError> {
        let mut entry = self
            .get(name)?
            .ok_or_else(|| ChainError::invalid_request("authority not found"))?;
        if entry.owner != owner {
            return Err(ChainError::unauthorized("only the authority owner may set its bond"));
        }
        entry.bond_id = bond_id.to_string();
        self.save(&entry)?;
        Ok(entry)
    }

    pub fn renew_authority(
        &self,
        name: &str,
        rent_duration_secs: u64,
        now: BlockTime,
    ) -> Result<AuthorityEntry, ChainError> {
        let mut entry = self
            .get(name)?
            .ok_or_else(|| ChainError::invalid_request("authority not found"))?;
        self.unschedule_expiry(&entry)?;
        entry.expiry_time = now.plus_seconds(rent_duration_secs);
        entry.status = AuthorityStatus::Active;
        self.save(&entry)?;
        self.schedule_expiry(&entry)?;
        Ok(entry)
    }

    pub fn set_name(&self, wrn_path: &str, owner: &str, record_id: &str, height: u64) -> Result<(), ChainError> {
        let authority_name = self.authority_for_path(wrn_path)?;
        let entry = self
            .get(&authority_name)?
            .ok_or_else(|| ChainError::invalid_request("authority not found"))?;
        if entry.owner != owner {
            return Err(ChainError::unauthorized("only the authority owner may set names under it"));
        }
        if entry.status != AuthorityStatus::Active {
            return Err(ChainError::invalid_request("authority is not active"));
        }
        self.storage.insert(
            Column::Names,
            wrn_path.as_bytes(),
            &NameEntry {
                record_id: record_id.to_string(),
                height,
            },
        )?;
        Ok(())
    }

    pub fn delete_name(&self, wrn_path: &str, owner: &str) -> Result<(), ChainError> {
        let authority_name = self.authority_for_path(wrn_path)?;
        let entry = self
            .get(&authority_name)?
            .ok_or_else(|| ChainError::invalid_request("authority not found"))?;
        if entry.owner != owner {
            return Err(ChainError::unauthorized("only the authority owner may delete names under it"));
        }
        self.storage.remove(Column::Names, wrn_path.as_bytes())?;
        Ok(())
    }

    /// Names under `prefix`, excluding any whose owning authority has
    /// rotated ownership since the name was set (spec testable property 8).
    pub fn lookup_names(&self, prefix: &str) -> Result<Vec<String>, ChainError> {
        let rows: Vec<(Vec<u8>, NameEntry)> = self.storage.iter_prefix(Column::Names, prefix.as_bytes())?;
        let mut out = Vec::new();
        for (key, name_entry) in rows {
            let wrn_path = String::from_utf8_lossy(&key).to_string();
            if self.is_fresh(&wrn_path, &name_entry)? {
                out.push(wrn_path);
            }
        }
        Ok(out)
    }

    /// Resolves a WRN path to its record id, returning `None` (stale name)
    /// if the owning authority has passed its grace period or rotated
    /// ownership since the name was set.
    pub fn resolve_name(&self, wrn_path: &str, now: BlockTime) -> Result<Option<String>, ChainError> {
        let authority_name = self.authority_for_path(wrn_path)?;
        let entry = match self.get(&authority_name)? {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if entry.status != AuthorityStatus::Active || entry.expiry_time < now {
            return Ok(None);
        }
        let name_entry: Option<NameEntry> = self.storage.load_optional(Column::Names, wrn_path.as_bytes())?;
        match name_entry {
            Some(name_entry) if entry.created_at <= name_entry.height => Ok(Some(name_entry.record_id)),
            _ => Ok(None),
        }
    }

    /// Whether `name_entry` was set at or after its authority's current
    /// ownership took effect. An authority that rotated owners after the
    /// name was set makes the name stale (spec testable property 8, S4).
    fn is_fresh(&self, wrn_path: &str, name_entry: &NameEntry) -> Result<bool, ChainError> {
        let authority_name = self.authority_for_path(wrn_path)?;
        Ok(match self.get(&authority_name)? {
            Some(authority) => authority.created_at <= name_entry.height,
            None => false,
        })
    }

    fn authority_for_path(&self, wrn_path: &str) -> Result<String, ChainError> {
        let parsed = registry_common::wrn::parse_wrn(wrn_path)
            .map_err(|e| ChainError::invalid_request(e.to_string()))?;
        Ok(parsed.authority)
    }

    /// Authorities whose expiry bucket is `<= now`.
    pub fn expired_before(&self, now: BlockTime) -> Result<Vec<String>, ChainError> {
        let rows: Vec<(Vec<u8>, Marker)> = self.storage.iter_all(Column::AuthorityExpiryQueue)?;
        let cutoff = now.to_sortable_key();
        let mut out = Vec::new();
        for (key, _) in rows {
            if key.len() < 12 {
                continue;
            }
            if key[..12] > cutoff {
                break;
            }
            out.push(String::from_utf8_lossy(&key[12..]).to_string());
        }
        Ok(out)
    }

    /// Called from the `EndBlock` expiry sweep (spec §4.5): first tries to
    /// renew by drawing `rent` from the authority's bond; only falls back to
    /// `Expired` if the bond is missing or exhausted. Returns whether the
    /// authority was renewed.
    pub fn expire_authority(
        &self,
        ctx: &ExecutionContext,
        name: &str,
        rent: &Coin,
        rent_duration_secs: u64,
    ) -> Result<bool, ChainError> {
        let Some(mut entry) = self.get(name)? else {
            return Ok(false);
        };
        self.unschedule_expiry(&entry)?;

        if entry.bond_id.is_empty() {
            entry.status = AuthorityStatus::Expired;
            self.save(&entry)?;
            return Ok(false);
        }

        let bond = BondModule::new(self.storage.clone());
        match bond.deduct_rent(&entry.bond_id, rent) {
            Ok(()) => {
                entry.expiry_time = ctx.block_time.plus_seconds(rent_duration_secs);
                entry.status = AuthorityStatus::Active;
                self.save(&entry)?;
                self.schedule_expiry(&entry)?;
                Ok(true)
            }
            Err(_) => {
                entry.status = AuthorityStatus::Expired;
                self.save(&entry)?;
                Ok(false)
            }
        }
    }

    /// Called when a name auction concludes with no reveals (spec §4.4):
    /// the authority is left with no bidder to hand off to, so it simply
    /// moves to `expired`.
    pub fn on_auction_expired(&self, name: &str) -> Result<(), ChainError> {
        if let Some(mut entry) = self.get(name)? {
            self.unschedule_expiry(&entry)?;
            entry.status = AuthorityStatus::Expired;
            self.save(&entry)?;
        }
        Ok(())
    }

    /// Called when a name auction concludes (spec §4.4 `on_auction_winner_selected`).
    pub fn on_auction_winner_selected(
        &self,
        ctx: &ExecutionContext,
        name: &str,
        winner: &str,
        bond_id: &str,
        rent_duration_secs: u64,
    ) -> Result<AuthorityEntry, ChainError> {
        let mut entry = self
            .get(name)?
            .ok_or_else(|| ChainError::invalid_request("authority not found"))?;
        self.unschedule_expiry(&entry)?;
        entry.owner = winner.to_string();
        entry.bond_id = bond_id.to_string();
        entry.status = AuthorityStatus::Active;
        entry.expiry_time = ctx.block_time.plus_seconds(rent_duration_secs);
        self.save(&entry)?;
        self.schedule_expiry(&entry)?;
        Ok(entry)
    }

    pub fn uses_bond(&self, bond_id: &str) -> Result<bool, ChainError> {
        // Authorities are scanned linearly since there is no dedicated
        // bond index column for this small, typically short-lived table.
        let rows: Vec<(Vec<u8>, AuthorityEntry)> = self.storage.iter_all(Column::Authorities)?;
        Ok(rows.iter().any(|(_, entry)| entry.bond_id == bond_id))
    }

    fn save(&self, entry: &AuthorityEntry) -> Result<(), ChainError> {
        self.storage.insert(Column::Authorities, entry.name.as_bytes(), entry)?;
        Ok(())
    }

    fn schedule_expiry(&self, entry: &AuthorityEntry) -> Result<(), ChainError> {
        let key = expiry_key(entry.expiry_time, &entry.name);
        self.storage.insert(Column::AuthorityExpiryQueue, key, &Marker)?;
        Ok(())
    }

    fn unschedule_expiry(&self, entry: &AuthorityEntry) -> Result<(), ChainError> {
        let key = expiry_key(entry.expiry_time, &entry.name);
        self.storage.remove(Column::AuthorityExpiryQueue, key)?;
        Ok(())
    }
}

fn expiry_key(time: BlockTime, name: &str) -> Vec<u8> {
    let mut key = time.to_sortable_key().to_vec();
    key.extend_from_slice(name.as_bytes());
    key
}
