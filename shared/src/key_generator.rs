use crate::types::GhostId;

/// Hands out ghost ids from a pool. Despawned ids go back on a free list
/// and are eligible for reuse; id 0 is never produced (it is the null
/// reference on the wire).
pub struct KeyGenerator {
    recycled: Vec<u16>,
    next: u16,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self {
            recycled: Vec::new(),
            next: 1,
        }
    }

    pub fn generate(&mut self) -> Option<GhostId> {
        if let Some(value) = self.recycled.pop() {
            return Some(GhostId::new(value));
        }
        if self.next == u16::MAX {
            // pool exhausted and nothing recycled
            return None;
        }
        let value = self.next;
        self.next += 1;
        Some(GhostId::new(value))
    }

    pub fn recycle(&mut self, key: GhostId) {
        if !key.is_null() {
            self.recycled.push(key.value());
        }
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}
