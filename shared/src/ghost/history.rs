use thiserror::Error;

use crate::{
    ghost::{change_mask::ChangeMask, value::GhostState},
    types::Tick,
    wrapping_number::{sequence_greater_than, sequence_less_than},
};

/// One remembered snapshot: the tick it was built at, the full state it
/// described, and the change-mask that was sent with it.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub tick: Tick,
    pub state: GhostState,
    pub mask: ChangeMask,
}

/// Errors raised by snapshot history insertion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// An insert older than the newest stored tick. Entries are monotonic
    /// by tick; ties overwrite in place, but rewinds are rejected outright.
    #[error("Out-of-order history insert: tick {tick} is older than newest {newest}")]
    OutOfOrder { tick: Tick, newest: Tick },
}

/// Fixed-capacity ring of snapshots for one (ghost, connection) pair,
/// keyed by tick. Slot index is `tick % capacity`, so an insert that lands
/// on an occupied slot simply evicts the oldest entry — and a `get` for an
/// evicted tick misses rather than aliasing the newer occupant.
pub struct SnapshotHistory {
    slots: Vec<Option<HistoryEntry>>,
    newest: Option<Tick>,
}

impl SnapshotHistory {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            newest: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn newest_tick(&self) -> Option<Tick> {
        self.newest
    }

    fn slot_index(&self, tick: Tick) -> usize {
        tick as usize % self.slots.len()
    }

    /// Inserts a snapshot at `tick`. The entire slot is overwritten — state
    /// and mask both — so no stale bytes from an evicted entry survive.
    pub fn insert(
        &mut self,
        tick: Tick,
        state: GhostState,
        mask: ChangeMask,
    ) -> Result<(), HistoryError> {
        if let Some(newest) = self.newest {
            if sequence_less_than(tick, newest) {
                return Err(HistoryError::OutOfOrder { tick, newest });
            }
        }
        let index = self.slot_index(tick);
        self.slots[index] = Some(HistoryEntry { tick, state, mask });
        if self.newest.is_none() || sequence_greater_than(tick, self.newest.unwrap_or(0)) {
            self.newest = Some(tick);
        }
        Ok(())
    }

    /// Exact-tick lookup. Misses if that tick was never stored or its slot
    /// has since been reused by a newer tick.
    pub fn get(&self, tick: Tick) -> Option<&HistoryEntry> {
        let entry = self.slots[self.slot_index(tick)].as_ref()?;
        if entry.tick == tick {
            Some(entry)
        } else {
            None
        }
    }

}
