use wraith_shared::{sequence_greater_than, SnapshotHistory, Tick};

/// Where one ghost stands on one connection. Spawn and despawn actions are
/// resent every tick until the cumulative ack covers the tick they were
/// first written at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GhostChannelStatus {
    Spawning,
    Spawned,
    Despawning,
}

pub struct GhostChannel {
    pub status: GhostChannelStatus,
    /// The tick the current Spawning/Despawning action was first sent at.
    pub status_tick: Tick,
    /// Ring of the states this connection actually received, one entry per
    /// sent tick. Each entry is the overlay of what the update carried, not
    /// the server's current state, so filtered and capacity-skipped fields
    /// never poison a later baseline.
    pub history: SnapshotHistory,
}

impl GhostChannel {
    pub fn spawning(tick: Tick, history_capacity: usize) -> Self {
        Self {
            status: GhostChannelStatus::Spawning,
            status_tick: tick,
            history: SnapshotHistory::new(history_capacity),
        }
    }

    /// Folds an ack into this channel. Returns true when a Despawning
    /// channel was confirmed and can be dropped.
    pub fn process_ack(&mut self, acked: Tick) -> bool {
        let covered = !sequence_greater_than(self.status_tick, acked);
        match self.status {
            GhostChannelStatus::Spawning if covered => {
                self.status = GhostChannelStatus::Spawned;
                false
            }
            GhostChannelStatus::Despawning if covered => true,
            _ => false,
        }
    }
}
