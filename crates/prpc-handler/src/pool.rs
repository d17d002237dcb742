/// Errors raised by [`IdPool`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Every id is in use.
    #[error("all {capacity} sequence ids are in use")]
    Exhausted { capacity: u32 },

    /// Released an id that was not allocated (double release).
    #[error("sequence id {0} is not allocated")]
    NotAllocated(u32),

    /// Released an id outside `[0, capacity)`.
    #[error("sequence id {id} is outside the pool (capacity {capacity})")]
    OutOfRange { id: u32, capacity: u32 },
}

/// Fixed-capacity allocator of sequence ids in `[0, capacity)`.
///
/// Freed ids are reused first; lowest ids are handed out first on a fresh
/// pool. Not synchronized: the owner guards it together with whatever
/// table must stay consistent with it.
#[derive(Debug)]
pub struct IdPool {
    free: Vec<u32>,
    in_use: Vec<bool>,
}

impl IdPool {
    pub fn new(capacity: u32) -> Self {
        Self {
            free: (0..capacity).rev().collect(),
            in_use: vec![false; capacity as usize],
        }
    }

    /// Take one free id.
    pub fn allocate(&mut self) -> Result<u32, PoolError> {
        let id = self.free.pop().ok_or(PoolError::Exhausted {
            capacity: self.capacity(),
        })?;
        self.in_use[id as usize] = true;
        Ok(id)
    }

    /// Return `id` to the free set.
    pub fn release(&mut self, id: u32) -> Result<(), PoolError> {
        let capacity = self.capacity();
        let slot = self
            .in_use
            .get_mut(id as usize)
            .ok_or(PoolError::OutOfRange { id, capacity })?;
        if !*slot {
            return Err(PoolError::NotAllocated(id));
        }
        *slot = false;
        self.free.push(id);
        Ok(())
    }

    pub fn capacity(&self) -> u32 {
        self.in_use.len() as u32
    }

    /// Number of free ids.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Number of ids currently handed out.
    pub fn in_use(&self) -> usize {
        self.in_use.len() - self.free.len()
    }

    pub fn is_allocated(&self, id: u32) -> bool {
        self.in_use.get(id as usize).copied().unwrap_or(false)
    }
}
