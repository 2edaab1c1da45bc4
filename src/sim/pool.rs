//! Generic object pool backed by a generation-checked slot arena
//!
//! Objects are never dropped while the pool lives. `acquire` pops a free slot
//! (or grows the arena), resets the object in place and hands out a
//! [`Handle`]. `release` returns the slot to the free list and bumps its
//! generation, so a handle kept past release no longer resolves and a second
//! release of it is a no-op.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::Serialize;

/// An object that can be reinitialised for reuse
pub trait Recycle: Default {
    /// Arguments describing the object's new life
    type Spawn;

    /// Overwrite every field that influences behaviour. Must not panic for
    /// any numeric input.
    fn reset(&mut self, spawn: Self::Spawn);
}

/// Index + generation reference into a [`Pool`]
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Slot index (stable for the lifetime of the pool)
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    value: T,
    generation: u32,
    active: bool,
}

/// Result of [`Pool::advance`]
///
/// `expired` handles were already released when this is returned; they only
/// identify which objects ended this step and no longer resolve.
#[derive(Debug)]
pub struct Partition<T> {
    pub alive: Vec<Handle<T>>,
    pub expired: Vec<Handle<T>>,
}

/// Free/active counts for debug overlays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub active: usize,
    pub free: usize,
    pub total: usize,
}

/// Recycling store of same-shaped objects
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    /// Free slot indices (stack, last pushed is reused first)
    free: Vec<u32>,
    active: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            active: 0,
        }
    }
}

impl<T: Recycle> Pool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate `capacity` free objects
    pub fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            active: 0,
        };
        pool.slots.extend((0..capacity).map(|_| Slot {
            value: T::default(),
            generation: 0,
            active: false,
        }));
        // Reversed so the lowest slot is handed out first
        pool.free.extend((0..capacity as u32).rev());
        pool
    }

    /// Take a free object (or allocate one), reset it and mark it active
    pub fn acquire(&mut self, spawn: T::Spawn) -> Handle<T> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    value: T::default(),
                    generation: 0,
                    active: false,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.value.reset(spawn);
        slot.active = true;
        self.active += 1;
        Handle::new(index, slot.generation)
    }
}

impl<T> Pool<T> {
    /// Return an object to the free list. Returns false (and changes
    /// nothing) if the handle is stale or the object is already free.
    pub fn release(&mut self, handle: Handle<T>) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index()) else {
            return false;
        };
        if !slot.active || slot.generation != handle.generation {
            return false;
        }
        slot.active = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.active -= 1;
        true
    }

    /// Release every active object
    pub fn release_all(&mut self) {
        for handle in self.handles() {
            self.release(handle);
        }
    }

    pub fn is_active(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &s.value)
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &mut s.value)
    }

    /// Active handles in slot order
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.iter().map(|(h, _)| h).collect()
    }

    /// Active objects in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| (Handle::new(i as u32, s.generation), &s.value))
    }

    /// Run `step` on every active object; objects for which it returns false
    /// are released. Objects acquired by the caller after this call are not
    /// visited until the next one.
    pub fn advance<F>(&mut self, mut step: F) -> Partition<T>
    where
        F: FnMut(&mut T) -> bool,
    {
        let mut alive = Vec::with_capacity(self.active);
        let mut expired = Vec::new();

        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !slot.active {
                continue;
            }
            let handle = Handle::new(i as u32, slot.generation);
            if step(&mut slot.value) {
                alive.push(handle);
            } else {
                expired.push(handle);
            }
        }

        for &handle in &expired {
            self.release(handle);
        }

        Partition { alive, expired }
    }

    pub fn active_len(&self) -> usize {
        self.active
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Objects ever allocated (active + free)
    pub fn total_len(&self) -> usize {
        self.slots.len()
    }

    /// Whether slot `index` currently sits on the free list
    pub fn is_free_slot(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| !s.active)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            active: self.active,
            free: self.free.len(),
            total: self.slots.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Default)]
    struct Counter {
        value: u32,
        ticks: u32,
    }

    impl Recycle for Counter {
        type Spawn = u32;

        fn reset(&mut self, spawn: u32) {
            self.value = spawn;
            self.ticks = 0;
        }
    }

    fn assert_consistent(pool: &Pool<Counter>) {
        let active: Vec<usize> = pool.handles().iter().map(|h| h.index()).collect();
        for index in &active {
            assert!(!pool.free.contains(&(*index as u32)));
        }
        let mut free = pool.free.clone();
        free.sort_unstable();
        free.dedup();
        assert_eq!(free.len(), pool.free_len(), "free list holds duplicates");
        assert_eq!(active.len() + pool.free_len(), pool.total_len());
        assert_eq!(active.len(), pool.active_len());
    }

    #[test]
    fn test_acquire_reuses_released_slot() {
        let mut pool = Pool::<Counter>::with_capacity(2);
        let a = pool.acquire(1);
        assert_eq!(a.index(), 0);
        assert!(pool.release(a));
        let b = pool.acquire(2);
        assert_eq!(b.index(), 0);
        assert_ne!(a, b);
        assert_eq!(pool.get(b).map(|c| c.value), Some(2));
        assert!(pool.get(a).is_none(), "stale handle must not resolve");
    }

    #[test]
    fn test_acquire_grows_when_exhausted() {
        let mut pool = Pool::<Counter>::new();
        for i in 0..100 {
            pool.acquire(i);
        }
        assert_eq!(pool.free_len(), 0);
        assert_eq!(pool.active_len(), 100);

        let h = pool.acquire(7);
        assert_eq!(pool.total_len(), 101);
        assert_eq!(pool.get(h).map(|c| c.value), Some(7));
    }

    #[test]
    fn test_double_release_is_noop() {
        let mut pool = Pool::<Counter>::with_capacity(4);
        let h = pool.acquire(3);
        assert!(pool.release(h));
        let before = pool.stats();
        assert!(!pool.release(h));
        assert_eq!(pool.stats(), before);
        assert_consistent(&pool);
    }

    #[test]
    fn test_stale_handle_cannot_release_new_occupant() {
        let mut pool = Pool::<Counter>::new();
        let old = pool.acquire(1);
        pool.release(old);
        let new = pool.acquire(2);
        assert_eq!(old.index(), new.index());
        assert!(!pool.release(old));
        assert!(pool.is_active(new));
    }

    #[test]
    fn test_reset_clears_residue() {
        let mut pool = Pool::<Counter>::new();
        let h = pool.acquire(10);
        pool.get_mut(h).unwrap().ticks = 99;
        pool.release(h);
        let h = pool.acquire(10);
        let c = pool.get(h).unwrap();
        assert_eq!(c.value, 10);
        assert_eq!(c.ticks, 0);
    }

    #[test]
    fn test_advance_partitions_and_releases() {
        let mut pool = Pool::<Counter>::new();
        let keep = pool.acquire(5);
        let drop = pool.acquire(0);

        let part = pool.advance(|c| {
            c.ticks += 1;
            c.value > 0
        });

        assert_eq!(part.alive, vec![keep]);
        assert_eq!(part.expired, vec![drop]);
        assert!(pool.is_free_slot(drop.index()));
        assert_eq!(pool.get(keep).map(|c| c.ticks), Some(1));
        assert_consistent(&pool);
    }

    #[test]
    fn test_release_all() {
        let mut pool = Pool::<Counter>::with_capacity(3);
        for i in 0..5 {
            pool.acquire(i);
        }
        pool.release_all();
        assert_eq!(pool.active_len(), 0);
        assert_eq!(pool.free_len(), 5);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Acquire(u32),
        Release(usize),
        ReleaseStale(usize),
        Advance,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..4).prop_map(Op::Acquire),
            (0usize..64).prop_map(Op::Release),
            (0usize..64).prop_map(Op::ReleaseStale),
            Just(Op::Advance),
        ]
    }

    proptest! {
        #[test]
        fn prop_free_and_active_stay_disjoint(ops in prop::collection::vec(op(), 0..200)) {
            let mut pool = Pool::<Counter>::with_capacity(8);
            let mut held: Vec<Handle<Counter>> = Vec::new();
            let mut released: Vec<Handle<Counter>> = Vec::new();

            for op in ops {
                match op {
                    Op::Acquire(v) => held.push(pool.acquire(v)),
                    Op::Release(i) if !held.is_empty() => {
                        let h = held.swap_remove(i % held.len());
                        pool.release(h);
                        released.push(h);
                    }
                    Op::ReleaseStale(i) if !released.is_empty() => {
                        let before = pool.stats();
                        let h = released[i % released.len()];
                        prop_assert!(!pool.release(h));
                        prop_assert_eq!(pool.stats(), before);
                    }
                    Op::Advance => {
                        let part = pool.advance(|c| {
                            c.value = c.value.saturating_sub(1);
                            c.value > 0
                        });
                        held.retain(|h| !part.expired.contains(h));
                        released.extend(part.expired);
                    }
                    _ => {}
                }
                assert_consistent(&pool);
                prop_assert_eq!(pool.active_len(), held.len());
            }
        }
    }
}
