use crate::particle::Particle;

/// Fixed-capacity particle storage.
///
/// Live-or-recently-dead particles occupy the prefix `[0, active)`; the rest
/// of the allocation is unused capacity. The capacity never changes after
/// construction.
#[derive(Clone, Debug)]
pub struct ParticlePool {
    slots: Vec<Particle>,
    active: usize,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Particle::default(); capacity],
            active: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn available(&self) -> usize {
        self.slots.len() - self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    pub fn active(&self) -> &[Particle] {
        &self.slots[..self.active]
    }

    pub fn active_mut(&mut self) -> &mut [Particle] {
        &mut self.slots[..self.active]
    }

    /// Claims up to `requested` slots past the active prefix and returns them.
    ///
    /// Requests beyond the remaining capacity are dropped; the returned slice
    /// may be shorter than `requested`, possibly empty.
    pub fn spawn(&mut self, requested: usize) -> &mut [Particle] {
        let count = requested.min(self.available());
        let start = self.active;
        self.active += count;
        &mut self.slots[start..start + count]
    }

    /// Moves every live particle down over the dead ones, keeping survivor order.
    ///
    /// Returns the number of particles removed.
    pub fn compact(&mut self) -> usize {
        let mut write = 0;
        for read in 0..self.active {
            if self.slots[read].is_alive() {
                if write != read {
                    self.slots[write] = self.slots[read];
                }
                write += 1;
            }
        }
        let removed = self.active - write;
        self.active = write;
        removed
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots[..self.active] {
            slot.life = 0.0;
        }
        self.active = 0;
    }
}
