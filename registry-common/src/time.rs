// Deterministic block time. Unlike `std::time`'s wall-clock helpers (used
// only for logging/metrics elsewhere in this workspace, never here), every
// value here is supplied by the external consensus driver via
// `BeginBlock` — see spec §5 "Determinism forbids any dependency on
// wall-clock time".

use crate::serializer::{Reader, ReaderError, Serializer, Writer};
use serde::{Deserialize, Serialize};
use std::ops::Add;

#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Debug, Serialize, Deserialize, Default)]
pub struct BlockTime {
    /// Unix seconds.
    pub secs: u64,
    /// Sub-second nanoseconds, 0..1_000_000_000.
    pub nanos: u32,
}

impl BlockTime {
    pub const fn from_secs(secs: u64) -> Self {
        BlockTime { secs, nanos: 0 }
    }

    pub fn plus_seconds(&self, seconds: u64) -> Self {
        BlockTime {
            secs: self.secs.saturating_add(seconds),
            nanos: self.nanos,
        }
    }

    pub fn plus_duration(&self, duration: std::time::Duration) -> Self {
        let total_nanos = self.nanos as u64 + duration.subsec_nanos() as u64;
        BlockTime {
            secs: self.secs + duration.as_secs() + total_nanos / 1_000_000_000,
            nanos: (total_nanos % 1_000_000_000) as u32,
        }
    }

    /// Fixed-width, big-endian encoding used as the time-bucket queue key
    /// prefix (spec §9 "Time-bucketed queues"): lexicographic order over
    /// these bytes equals chronological order.
    pub fn to_sortable_key(self) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[0..8].copy_from_slice(&self.secs.to_be_bytes());
        out[8..12].copy_from_slice(&self.nanos.to_be_bytes());
        out
    }
}

impl Add<u64> for BlockTime {
    type Output = BlockTime;

    fn add(self, seconds: u64) -> BlockTime {
        self.plus_seconds(seconds)
    }
}

impl Serializer for BlockTime {
    fn write(&self, writer: &mut Writer) {
        writer.write_u64(&self.secs);
        writer.write_u32(&self.nanos);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let secs = reader.read_u64()?;
        let nanos = reader.read_u32()?;
        Ok(BlockTime { secs, nanos })
    }

    fn size(&self) -> usize {
        12
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sortable_key_matches_chronological_order() {
        let earlier = BlockTime::from_secs(100);
        let later = BlockTime::from_secs(200);
        assert!(earlier.to_sortable_key() < later.to_sortable_key());
    }

    #[test]
    fn plus_seconds_is_monotonic() {
        let t = BlockTime::from_secs(10).plus_seconds(3600);
        assert_eq!(t.secs, 3610);
    }
}
