//! Prototype-keyed reuse pool for short-lived entities.
//!
//! This module provides:
//! - One free list per prototype, handed out LIFO for cache locality
//! - Growth by one instance when a free list runs dry
//! - Handles that go stale on release, so double releases are harmless
//! - Clearing of inactive instances without invalidating live ones

use ahash::AHashMap;
use danmaku_common::PrototypeId;
use tracing::{debug, warn};

/// Default number of instances created for an unknown prototype.
pub const DEFAULT_POOL_SIZE: usize = 32;

/// Lifecycle hooks for pooled values.
pub trait Poolable: Clone {
    /// Called when an instance is handed out.
    fn on_acquire(&mut self) {}

    /// Called when an instance goes back to its free list. Must drop any
    /// reference to the previous owner.
    fn on_release(&mut self);
}

/// A reusable template entity.
#[derive(Debug, Clone)]
pub struct Prototype<T> {
    id: PrototypeId,
    template: T,
}

impl<T> Prototype<T> {
    /// Create a prototype.
    #[must_use]
    pub const fn new(id: PrototypeId, template: T) -> Self {
        Self { id, template }
    }

    /// Prototype identity.
    #[must_use]
    pub const fn id(&self) -> PrototypeId {
        self.id
    }

    /// Template instances are cloned from.
    #[must_use]
    pub const fn template(&self) -> &T {
        &self.template
    }
}

/// Handle to a pooled instance, tagged with its originating prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    prototype: PrototypeId,
    slot: u32,
    serial: u64,
}

impl PoolHandle {
    /// Prototype this instance came from.
    #[must_use]
    pub const fn prototype(&self) -> PrototypeId {
        self.prototype
    }

    /// Slot index inside the prototype's storage.
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    /// `None` once the instance has been destroyed.
    value: Option<T>,
    active: bool,
    /// Serial of the acquisition currently holding this slot.
    serial: u64,
}

#[derive(Debug, Clone)]
struct PoolEntry<T> {
    template: T,
    slots: Vec<Slot<T>>,
    /// Inactive, live instances. Stack order.
    free: Vec<u32>,
    /// Slots whose instance was destroyed.
    vacant: Vec<u32>,
    active: usize,
}

impl<T: Poolable> PoolEntry<T> {
    fn new(template: T, capacity: usize) -> Self {
        Self {
            template,
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            vacant: Vec::new(),
            active: 0,
        }
    }

    /// Create one inactive instance and return its slot.
    fn allocate(&mut self) -> u32 {
        let value = Some(self.template.clone());
        if let Some(index) = self.vacant.pop() {
            self.slots[index as usize].value = value;
            index
        } else {
            self.slots.push(Slot {
                value,
                active: false,
                serial: 0,
            });
            (self.slots.len() - 1) as u32
        }
    }

    fn prefill(&mut self, count: usize) {
        for _ in 0..count {
            let index = self.allocate();
            self.free.push(index);
        }
    }

    fn live_count(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }
}

/// Counters describing pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Registered prototypes.
    pub prototypes: usize,
    /// Instances currently handed out.
    pub active: usize,
    /// Instances parked in free lists.
    pub free: usize,
    /// Instances allocated past the prefilled amount.
    pub grown: u64,
}

/// Reuse pool keyed by prototype identity.
#[derive(Debug)]
pub struct EntityPool<T> {
    entries: AHashMap<PrototypeId, PoolEntry<T>>,
    default_size: usize,
    next_serial: u64,
    grown: u64,
}

impl<T: Poolable> Default for EntityPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Poolable> EntityPool<T> {
    /// Create an empty pool using [`DEFAULT_POOL_SIZE`] for on-demand prototypes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_default_size(DEFAULT_POOL_SIZE)
    }

    /// Create an empty pool with a custom on-demand size.
    #[must_use]
    pub fn with_default_size(default_size: usize) -> Self {
        Self {
            entries: AHashMap::new(),
            default_size,
            next_serial: 1,
            grown: 0,
        }
    }

    /// Register a prototype and prefill `initial_count` inactive instances.
    ///
    /// Returns false (and logs) when the prototype is already registered.
    pub fn add_pool(&mut self, prototype: &Prototype<T>, initial_count: usize) -> bool {
        if self.entries.contains_key(&prototype.id) {
            warn!("Pool for {} already exists, ignoring", prototype.id);
            return false;
        }
        let mut entry = PoolEntry::new(prototype.template().clone(), initial_count);
        entry.prefill(initial_count);
        self.entries.insert(prototype.id, entry);
        debug!("Created pool for {} with {} instances", prototype.id, initial_count);
        true
    }

    /// Check if a prototype has a pool.
    #[must_use]
    pub fn has_pool(&self, id: PrototypeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Hand out an instance of `prototype`, growing or creating the pool as needed.
    pub fn acquire(&mut self, prototype: &Prototype<T>) -> PoolHandle {
        if !self.entries.contains_key(&prototype.id) {
            warn!(
                "No pool for {}, creating one with {} instances",
                prototype.id, self.default_size
            );
            self.add_pool(prototype, self.default_size);
        }

        let serial = self.next_serial;
        self.next_serial += 1;

        let mut grew = false;
        let entry = self
            .entries
            .entry(prototype.id)
            .or_insert_with(|| PoolEntry::new(prototype.template().clone(), 0));
        let index = entry.free.pop().unwrap_or_else(|| {
            grew = true;
            entry.allocate()
        });
        entry.active += 1;

        let slot = &mut entry.slots[index as usize];
        slot.active = true;
        slot.serial = serial;
        if let Some(value) = slot.value.as_mut() {
            value.on_acquire();
        }

        if grew {
            self.grown += 1;
            debug!("Pool for {} grew to {} instances", prototype.id, entry.live_count());
        }

        PoolHandle {
            prototype: prototype.id,
            slot: index,
            serial,
        }
    }

    /// Return an instance to its free list.
    ///
    /// Releasing a stale or already released handle is a logged no-op.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        let Some(entry) = self.entries.get_mut(&handle.prototype) else {
            warn!("Release of {:?}: pool no longer exists", handle);
            return false;
        };
        let Some(slot) = entry.slots.get_mut(handle.slot as usize) else {
            warn!("Release of {:?}: slot out of range", handle);
            return false;
        };
        if !slot.active || slot.serial != handle.serial {
            warn!("Release of {:?}: instance already inactive", handle);
            return false;
        }

        slot.active = false;
        if let Some(value) = slot.value.as_mut() {
            value.on_release();
        }
        entry.free.push(handle.slot);
        entry.active -= 1;
        true
    }

    /// Destroy the inactive instances of a prototype.
    ///
    /// With `destroy_active`, live instances are destroyed as well and the
    /// pool is removed. Otherwise a pool that still has live instances is
    /// kept. Returns the number of destroyed instances.
    pub fn clear_pool(&mut self, id: PrototypeId, destroy_active: bool) -> usize {
        let Some(entry) = self.entries.get_mut(&id) else {
            warn!("Clear of {}: no such pool", id);
            return 0;
        };

        if destroy_active || entry.active == 0 {
            let destroyed = entry.live_count();
            self.entries.remove(&id);
            debug!("Removed pool for {} ({} instances)", id, destroyed);
            return destroyed;
        }

        let destroyed = entry.free.len();
        for index in entry.free.drain(..) {
            entry.slots[index as usize].value = None;
            entry.vacant.push(index);
        }
        debug!(
            "Cleared {} inactive instances of {}, kept {} active",
            destroyed, id, entry.active
        );
        destroyed
    }

    /// Borrow an active instance.
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        let slot = self
            .entries
            .get(&handle.prototype)?
            .slots
            .get(handle.slot as usize)?;
        if slot.active && slot.serial == handle.serial {
            slot.value.as_ref()
        } else {
            None
        }
    }

    /// Mutably borrow an active instance.
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        let slot = self
            .entries
            .get_mut(&handle.prototype)?
            .slots
            .get_mut(handle.slot as usize)?;
        if slot.active && slot.serial == handle.serial {
            slot.value.as_mut()
        } else {
            None
        }
    }

    /// Check if a handle refers to a live, active instance.
    #[must_use]
    pub fn is_active(&self, handle: PoolHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Active instances of one prototype.
    #[must_use]
    pub fn active_count(&self, id: PrototypeId) -> usize {
        self.entries.get(&id).map_or(0, |e| e.active)
    }

    /// Parked instances of one prototype.
    #[must_use]
    pub fn free_count(&self, id: PrototypeId) -> usize {
        self.entries.get(&id).map_or(0, |e| e.free.len())
    }

    /// Active instances across all prototypes.
    #[must_use]
    pub fn total_active(&self) -> usize {
        self.entries.values().map(|e| e.active).sum()
    }

    /// Usage counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            prototypes: self.entries.len(),
            active: self.total_active(),
            free: self.entries.values().map(|e| e.free.len()).sum(),
            grown: self.grown,
        }
    }

    /// Iterate active instances.
    pub fn iter_active(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.entries.iter().flat_map(|(&prototype, entry)| {
            entry.slots.iter().enumerate().filter_map(move |(i, slot)| {
                let value = slot.value.as_ref().filter(|_| slot.active)?;
                let handle = PoolHandle {
                    prototype,
                    slot: i as u32,
                    serial: slot.serial,
                };
                Some((handle, value))
            })
        })
    }

    /// Iterate active instances mutably.
    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (PoolHandle, &mut T)> {
        self.entries.iter_mut().flat_map(|(&prototype, entry)| {
            entry
                .slots
                .iter_mut()
                .enumerate()
                .filter_map(move |(i, slot)| {
                    if !slot.active {
                        return None;
                    }
                    let serial = slot.serial;
                    let value = slot.value.as_mut()?;
                    let handle = PoolHandle {
                        prototype,
                        slot: i as u32,
                        serial,
                    };
                    Some((handle, value))
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Shot {
        owner: Option<u64>,
        acquired: u32,
        released: u32,
    }

    impl Poolable for Shot {
        fn on_acquire(&mut self) {
            self.acquired += 1;
        }

        fn on_release(&mut self) {
            self.owner = None;
            self.released += 1;
        }
    }

    fn proto(id: u32) -> Prototype<Shot> {
        Prototype::new(PrototypeId::new(id), Shot::default())
    }

    #[test]
    fn test_add_pool_prefills() {
        let mut pool = EntityPool::new();
        assert!(pool.add_pool(&proto(1), 4));
        assert_eq!(pool.free_count(PrototypeId::new(1)), 4);
        assert_eq!(pool.active_count(PrototypeId::new(1)), 0);

        assert!(!pool.add_pool(&proto(1), 10));
        assert_eq!(pool.free_count(PrototypeId::new(1)), 4);
    }

    #[test]
    fn test_round_trip_reuses_instance() {
        let mut pool = EntityPool::new();
        let p = proto(1);
        pool.add_pool(&p, 2);

        let first = pool.acquire(&p);
        assert!(pool.release(first));
        let second = pool.acquire(&p);

        assert_eq!(first.slot(), second.slot());
        assert_ne!(first, second);
        assert_eq!(pool.get(second).map(|s| s.acquired), Some(2));
        assert_eq!(pool.stats().grown, 0);
    }

    #[test]
    fn test_grows_past_prefill() {
        let mut pool = EntityPool::new();
        let p = proto(1);
        pool.add_pool(&p, 2);

        let handles: Vec<_> = (0..5).map(|_| pool.acquire(&p)).collect();
        assert_eq!(pool.active_count(p.id()), 5);
        assert_eq!(pool.stats().grown, 3);
        assert!(handles.iter().all(|h| pool.is_active(*h)));
    }

    #[test]
    fn test_acquire_unknown_creates_pool() {
        let mut pool = EntityPool::with_default_size(8);
        let p = proto(9);
        let handle = pool.acquire(&p);

        assert!(pool.has_pool(p.id()));
        assert_eq!(handle.prototype(), p.id());
        assert_eq!(pool.free_count(p.id()), 7);
    }

    #[test]
    fn test_double_release_is_noop() {
        let mut pool = EntityPool::new();
        let p = proto(1);
        pool.add_pool(&p, 1);

        let handle = pool.acquire(&p);
        assert!(pool.release(handle));
        assert!(!pool.release(handle));
        assert_eq!(pool.free_count(p.id()), 1);

        // A stale handle must not release the slot's next occupant.
        let next = pool.acquire(&p);
        assert!(!pool.release(handle));
        assert!(pool.is_active(next));
    }

    #[test]
    fn test_release_clears_owner() {
        let mut pool = EntityPool::new();
        let p = proto(1);
        let handle = pool.acquire(&p);
        if let Some(shot) = pool.get_mut(handle) {
            shot.owner = Some(42);
        }
        pool.release(handle);

        let again = pool.acquire(&p);
        let shot = pool.get(again).cloned().unwrap_or_default();
        assert_eq!(shot.owner, None);
        assert_eq!(shot.released, 1);
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut pool = EntityPool::new();
        let p = proto(1);
        pool.add_pool(&p, 0);
        let a = pool.acquire(&p);
        let b = pool.acquire(&p);
        pool.release(a);
        pool.release(b);

        assert_eq!(pool.acquire(&p).slot(), b.slot());
        assert_eq!(pool.acquire(&p).slot(), a.slot());
    }

    #[test]
    fn test_clear_pool_keeps_active() {
        let mut pool = EntityPool::new();
        let p = proto(1);
        pool.add_pool(&p, 4);
        let live = pool.acquire(&p);

        assert_eq!(pool.clear_pool(p.id(), false), 3);
        assert!(pool.has_pool(p.id()));
        assert!(pool.is_active(live));
        assert_eq!(pool.free_count(p.id()), 0);

        // Destroyed slots are refilled on demand.
        let other = pool.acquire(&p);
        assert!(pool.is_active(other));
        assert!(pool.release(live));
    }

    #[test]
    fn test_clear_pool_removes_idle_pool() {
        let mut pool = EntityPool::new();
        let p = proto(1);
        pool.add_pool(&p, 4);
        assert_eq!(pool.clear_pool(p.id(), false), 4);
        assert!(!pool.has_pool(p.id()));
    }

    #[test]
    fn test_clear_pool_destroy_active() {
        let mut pool = EntityPool::new();
        let p = proto(1);
        pool.add_pool(&p, 2);
        let live = pool.acquire(&p);

        assert_eq!(pool.clear_pool(p.id(), true), 2);
        assert!(!pool.has_pool(p.id()));
        assert!(!pool.is_active(live));
        assert!(!pool.release(live));
    }

    #[test]
    fn test_clear_unknown_pool() {
        let mut pool: EntityPool<Shot> = EntityPool::new();
        assert_eq!(pool.clear_pool(PrototypeId::new(3), false), 0);
    }

    #[test]
    fn test_iter_active() {
        let mut pool = EntityPool::new();
        let a = proto(1);
        let b = proto(2);
        let h1 = pool.acquire(&a);
        let h2 = pool.acquire(&b);
        let h3 = pool.acquire(&b);
        pool.release(h3);

        for (_, shot) in pool.iter_active_mut() {
            shot.owner = Some(7);
        }
        let mut seen: Vec<_> = pool.iter_active().map(|(h, _)| h).collect();
        seen.sort_by_key(|h| h.prototype());
        assert_eq!(seen, vec![h1, h2]);
        assert_eq!(pool.get(h2).and_then(|s| s.owner), Some(7));
    }
}
