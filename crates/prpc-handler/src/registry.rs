use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Mutex, MutexGuard, PoisonError};

use prpc_frame::{Frame, SeqId};
use tracing::{debug, error};

use crate::error::{HandlerError, Result};
use crate::pool::IdPool;

/// What a registered request's result slot receives.
#[derive(Debug)]
pub(crate) enum Delivery {
    Frame(Frame),
    Aborted,
}

/// Outcome of routing a response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Handed to the request registered under this id.
    Delivered(u32),
    /// A response carrying `*` cannot be correlated.
    NotificationId,
    /// The id is outside the pool.
    OutOfRange(u32),
    /// Nothing is registered under this id (late, duplicate or bogus response).
    Unknown(u32),
}

struct Slot {
    generation: u64,
    tx: SyncSender<Delivery>,
}

struct Inner {
    pool: IdPool,
    table: HashMap<u32, Slot>,
    next_generation: u64,
}

/// A fresh registration: the id, its generation and the result slot.
pub(crate) struct Registration {
    pub(crate) id: u32,
    pub(crate) generation: u64,
    pub(crate) rx: Receiver<Delivery>,
}

/// Sequence-id pool and registration table behind a single lock.
///
/// Removing a registration and releasing its id always happen in the same
/// critical section, so a late response for a reclaimed id is seen as
/// [`Resolution::Unknown`] instead of resolving a newer request.
pub struct Registry {
    capacity: u32,
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                pool: IdPool::new(capacity),
                table: HashMap::new(),
                next_generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of registered, unresolved requests.
    pub fn in_flight(&self) -> usize {
        self.lock().table.len()
    }

    /// Number of free sequence ids.
    pub fn available(&self) -> usize {
        self.lock().pool.available()
    }

    /// Allocate an id and register a result slot under it.
    pub(crate) fn register(&self) -> Result<Registration> {
        let mut inner = self.lock();
        let id = inner.pool.allocate()?;
        if inner.table.contains_key(&id) {
            error!(seq_id = id, "sequence id allocated while still registered");
            release(&mut inner.pool, id);
            return Err(HandlerError::DuplicateSequenceId(id));
        }

        let generation = inner.next_generation;
        inner.next_generation = inner.next_generation.wrapping_add(1);

        let (tx, rx) = sync_channel(1);
        inner.table.insert(id, Slot { generation, tx });
        Ok(Registration { id, generation, rx })
    }

    /// Unregister `id` if it still belongs to `generation`, free the id and
    /// wake the waiter with an abort. Returns false when there was nothing
    /// to cancel.
    pub(crate) fn cancel(&self, id: u32, generation: u64) -> bool {
        let mut inner = self.lock();
        match inner.table.get(&id) {
            Some(slot) if slot.generation == generation => {}
            _ => return false,
        }
        let Some(slot) = inner.table.remove(&id) else {
            return false;
        };
        release(&mut inner.pool, id);
        drop(inner);

        let _ = slot.tx.try_send(Delivery::Aborted);
        debug!(seq_id = id, "request aborted");
        true
    }

    /// Route a response frame to the request registered under its id.
    pub fn deliver(&self, frame: Frame) -> Resolution {
        let id = match frame.seq_id {
            SeqId::Notification => return Resolution::NotificationId,
            SeqId::Id(id) if id >= self.capacity => return Resolution::OutOfRange(id),
            SeqId::Id(id) => id,
        };

        let mut inner = self.lock();
        let Some(slot) = inner.table.remove(&id) else {
            return Resolution::Unknown(id);
        };
        release(&mut inner.pool, id);
        drop(inner);

        // Capacity 1 and a single delivery per registration: never full.
        let _ = slot.tx.try_send(Delivery::Frame(frame));
        Resolution::Delivered(id)
    }

    /// Abort every outstanding request. Returns how many were aborted.
    pub fn abort_all(&self) -> usize {
        let mut inner = self.lock();
        let slots: Vec<(u32, Slot)> = inner.table.drain().collect();
        for (id, _) in &slots {
            release(&mut inner.pool, *id);
        }
        drop(inner);

        for (_, slot) in &slots {
            let _ = slot.tx.try_send(Delivery::Aborted);
        }
        slots.len()
    }
}

fn release(pool: &mut IdPool, id: u32) {
    if let Err(err) = pool.release(id) {
        error!(seq_id = id, error = %err, "sequence id release failed");
    }
}
