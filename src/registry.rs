//! Concurrency-safe effect registry
//!
//! Producers insert from any thread; the tick loop works on snapshots and
//! removes retired effects in one batch after its pass.

use core::cell::RefCell;
use std::sync::Arc;

use critical_section::Mutex;
use heapless::Vec;

use crate::bus::{BUS_LENGTH, QueueId};
use crate::effect::Effect;

/// Default number of concurrently live effects, pending reverts included
pub const DEFAULT_EFFECT_CAPACITY: usize = 4 * BUS_LENGTH;

/// Stable copy of the registry contents
pub type Snapshot<const N: usize> = Vec<Arc<Effect>, N>;

/// Deduplicated set of queue ids
#[derive(Debug, Clone, Default)]
pub struct QueueSet<const N: usize> {
    ids: Vec<QueueId, N>,
}

impl<const N: usize> QueueSet<N> {
    pub const fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Add an id; returns `false` if it was already present or the set is full
    pub fn insert(&mut self, id: QueueId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id).is_ok()
    }

    pub fn contains(&self, id: QueueId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Fixed-capacity set of live effects, in insertion order
///
/// `N` bounds the effects alive at the same time: running, pending and
/// not yet retired.
pub struct EffectRegistry<const N: usize = DEFAULT_EFFECT_CAPACITY> {
    effects: Mutex<RefCell<Vec<Arc<Effect>, N>>>,
}

impl<const N: usize> EffectRegistry<N> {
    pub const fn new() -> Self {
        Self {
            effects: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Add an effect
    ///
    /// Returns the effect back if the registry is full.
    pub fn insert(&self, effect: Arc<Effect>) -> Result<(), Arc<Effect>> {
        critical_section::with(|cs| self.effects.borrow(cs).borrow_mut().push(effect))
    }

    /// Add every effect of `batch` or none of them
    ///
    /// Returns `false` when the registry lacks room for the whole batch.
    pub fn insert_all(&self, batch: &[Arc<Effect>]) -> bool {
        critical_section::with(|cs| {
            let mut effects = self.effects.borrow(cs).borrow_mut();
            if N - effects.len() < batch.len() {
                return false;
            }
            for effect in batch {
                // Cannot fail: room was checked above
                let _ = effects.push(Arc::clone(effect));
            }
            true
        })
    }

    /// Remove one effect; returns `false` if it was not registered
    pub fn remove(&self, effect: &Arc<Effect>) -> bool {
        self.remove_all(core::slice::from_ref(effect)) == 1
    }

    /// Remove every listed effect, keeping the order of the rest
    ///
    /// Returns how many were actually removed.
    pub fn remove_all(&self, retired: &[Arc<Effect>]) -> usize {
        if retired.is_empty() {
            return 0;
        }
        critical_section::with(|cs| {
            let mut effects = self.effects.borrow(cs).borrow_mut();
            let before = effects.len();
            effects.retain(|effect| !retired.iter().any(|gone| Arc::ptr_eq(gone, effect)));
            before - effects.len()
        })
    }

    /// Copy the current contents
    ///
    /// Mutations after this call are not visible in the snapshot.
    pub fn snapshot(&self) -> Snapshot<N> {
        critical_section::with(|cs| self.effects.borrow(cs).borrow().clone())
    }

    /// Queues referenced by at least one registered effect
    pub fn queue_ids(&self) -> QueueSet<N> {
        critical_section::with(|cs| {
            let mut set = QueueSet::new();
            for effect in self.effects.borrow(cs).borrow().iter() {
                set.insert(effect.queue());
            }
            set
        })
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.effects.borrow(cs).borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for EffectRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
