//! Shared pool of reusable event instances.
//!
//! Creating an engine instance is comparatively expensive, so every species
//! gets a queue of instances created up front. Emitters check instances out
//! with [`InstancePool::acquire`] and hand them back with
//! [`InstancePool::release`]; queues are FIFO so instances rotate evenly.
//!
//! Ownership is tracked per handle: an instance is either queued in the pool
//! or checked out by exactly one emitter. Releasing a handle that is not
//! checked out is logged and ignored, which makes stale or duplicated returns
//! harmless.
//!
//! An empty queue never blocks and never hands out an invalid handle: a fresh
//! instance is created on demand and joins the pool when it is released.

use crate::engine::AudioEngine;
use crate::error::{BirdsongError, Result};
use crate::playback::{EventDescriptor, InstanceHandle, StopMode};
use crate::scene::{SpeciesCatalog, SpeciesId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, OnceLock};

/// Snapshot of one species' pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Instances waiting in the queue
    pub queued: usize,
    /// Instances currently owned by emitters
    pub checked_out: usize,
    /// Instances created on demand because the queue was empty
    pub fallbacks_created: usize,
    /// Times an acquire found the queue empty
    pub exhaustions: usize,
}

struct SpeciesPool {
    event: EventDescriptor,
    queue: VecDeque<InstanceHandle>,
    checked_out: HashSet<InstanceHandle>,
    fallbacks_created: usize,
    exhaustions: usize,
}

struct PoolInner {
    species: HashMap<SpeciesId, SpeciesPool>,
    /// Species tag of every handle the pool is responsible for
    owners: HashMap<InstanceHandle, SpeciesId>,
    torn_down: bool,
}

/// Per-species queues of engine instances, shared by all emitters.
pub struct InstancePool {
    engine: Arc<dyn AudioEngine>,
    pool_size: usize,
    inner: Mutex<PoolInner>,
}

impl InstancePool {
    /// Creates `pool_size` instances for every species in the catalog.
    ///
    /// A species whose instances cannot be created is logged and keeps a
    /// shorter queue; it does not prevent the other species from pooling.
    pub fn new(engine: Arc<dyn AudioEngine>, catalog: &SpeciesCatalog, pool_size: usize) -> Self {
        let mut species = HashMap::new();
        let mut owners = HashMap::new();

        for entry in catalog.iter() {
            let mut queue = VecDeque::with_capacity(pool_size);
            for _ in 0..pool_size {
                match engine.create_instance(&entry.event) {
                    Ok(handle) => {
                        owners.insert(handle, entry.id.clone());
                        queue.push_back(handle);
                    }
                    Err(e) => {
                        log::error!(
                            "Failed to pre-create instance for species {}: {}",
                            entry.id,
                            e
                        );
                        break;
                    }
                }
            }
            log::debug!(
                "Pool for species {} holds {} instances",
                entry.id,
                queue.len()
            );
            species.insert(
                entry.id.clone(),
                SpeciesPool {
                    event: entry.event.clone(),
                    queue,
                    checked_out: HashSet::new(),
                    fallbacks_created: 0,
                    exhaustions: 0,
                },
            );
        }

        log::info!(
            "Instance pool initialized: {} species, {} instances",
            species.len(),
            owners.len()
        );

        Self {
            engine,
            pool_size,
            inner: Mutex::new(PoolInner {
                species,
                owners,
                torn_down: false,
            }),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Checks out an instance of `species`.
    ///
    /// Pops the oldest queued instance, or creates a new one if the queue is
    /// empty. Unknown species and a torn-down pool are errors the caller is
    /// expected to log and survive.
    pub fn acquire(&self, species: &SpeciesId) -> Result<InstanceHandle> {
        let event = {
            let mut inner = self.inner.lock();
            if inner.torn_down {
                log::error!("Acquire for species {} after pool teardown", species);
                return Err(BirdsongError::PoolTornDown);
            }
            let Some(pool) = inner.species.get_mut(species) else {
                log::error!("Acquire for unknown species: {}", species);
                return Err(BirdsongError::UnknownSpecies(species.to_string()));
            };

            if let Some(handle) = pool.queue.pop_front() {
                pool.checked_out.insert(handle);
                return Ok(handle);
            }

            pool.exhaustions += 1;
            if pool.exhaustions > 1 {
                log::warn!(
                    "Sound pool for species {} is empty again ({} times), creating an instance on demand",
                    species,
                    pool.exhaustions
                );
            } else {
                log::debug!(
                    "Sound pool for species {} is empty, creating an instance on demand",
                    species
                );
            }
            pool.event.clone()
        };

        // The engine is called without holding the pool lock.
        let handle = self.engine.create_instance(&event).map_err(|e| {
            log::error!(
                "On-demand instance creation failed for species {}: {}",
                species,
                e
            );
            e
        })?;

        let mut inner = self.inner.lock();
        if inner.torn_down {
            drop(inner);
            if let Err(e) = self.engine.release(handle) {
                log::warn!("Failed to release {} created during teardown: {}", handle, e);
            }
            return Err(BirdsongError::PoolTornDown);
        }
        inner.owners.insert(handle, species.clone());
        if let Some(pool) = inner.species.get_mut(species) {
            pool.fallbacks_created += 1;
            pool.checked_out.insert(handle);
        }
        Ok(handle)
    }

    /// Returns a checked-out instance to the back of its species' queue.
    ///
    /// The caller must have stopped the instance and detached its completion
    /// callback. If `species` disagrees with the species the instance was
    /// created for, the instance goes back to its own queue.
    pub fn release(&self, species: &SpeciesId, handle: InstanceHandle) {
        let mut inner = self.inner.lock();
        if inner.torn_down {
            log::debug!("{} returned after teardown, already released", handle);
            return;
        }

        let Some(owner) = inner.owners.get(&handle).cloned() else {
            log::warn!("Release of {} which the pool does not own", handle);
            return;
        };
        if &owner != species {
            log::error!(
                "{} returned as species {} but belongs to {}",
                handle,
                species,
                owner
            );
        }

        let Some(pool) = inner.species.get_mut(&owner) else {
            log::error!("No pool for species {} of {}", owner, handle);
            return;
        };
        if !pool.checked_out.remove(&handle) {
            log::warn!("{} released twice to species {}", handle, owner);
            return;
        }
        pool.queue.push_back(handle);
    }

    /// Forgets a checked-out instance the engine no longer considers valid.
    ///
    /// The handle is not queued again and is not released at teardown.
    pub fn discard(&self, handle: InstanceHandle) {
        let mut inner = self.inner.lock();
        let Some(owner) = inner.owners.remove(&handle) else {
            return;
        };
        if let Some(pool) = inner.species.get_mut(&owner) {
            pool.checked_out.remove(&handle);
            pool.queue.retain(|queued| *queued != handle);
        }
        log::warn!("Discarded invalid {} of species {}", handle, owner);
    }

    /// Releases every instance the pool is responsible for, queued or checked
    /// out, back to the engine.
    ///
    /// Returns the number of instances released. Calling it again releases
    /// nothing; the pool rejects acquires afterwards.
    pub fn teardown(&self) -> usize {
        let (queued, checked_out) = {
            let mut inner = self.inner.lock();
            if inner.torn_down {
                return 0;
            }
            inner.torn_down = true;
            inner.owners.clear();

            let mut queued = Vec::new();
            let mut checked_out = Vec::new();
            for pool in inner.species.values_mut() {
                queued.extend(pool.queue.drain(..));
                checked_out.extend(pool.checked_out.drain());
            }
            (queued, checked_out)
        };

        for &handle in &checked_out {
            if let Err(e) = self.engine.set_completion_callback(handle, None) {
                log::debug!("Could not detach {} at teardown: {}", handle, e);
            }
            if let Err(e) = self.engine.stop(handle, StopMode::Immediate) {
                log::debug!("Could not stop {} at teardown: {}", handle, e);
            }
        }

        let mut released = 0;
        for handle in queued.into_iter().chain(checked_out) {
            match self.engine.release(handle) {
                Ok(()) => released += 1,
                Err(e) => log::warn!("Failed to release {} at teardown: {}", handle, e),
            }
        }
        log::info!("Instance pool torn down, {} instances released", released);
        released
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.lock().torn_down
    }

    /// Species tag of a handle the pool is responsible for
    pub fn species_of(&self, handle: InstanceHandle) -> Option<SpeciesId> {
        self.inner.lock().owners.get(&handle).cloned()
    }

    pub fn stats(&self, species: &SpeciesId) -> Option<PoolStats> {
        self.inner.lock().species.get(species).map(|pool| PoolStats {
            queued: pool.queue.len(),
            checked_out: pool.checked_out.len(),
            fallbacks_created: pool.fallbacks_created,
            exhaustions: pool.exhaustions,
        })
    }
}

impl Drop for InstancePool {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Holder that lets exactly one pool be installed.
///
/// The first install wins. Later installs are rejected before a second pool
/// is built, so no instances are created for it.
///
/// ```
/// use birdsong_core::pool::PoolSlot;
///
/// static POOL: PoolSlot = PoolSlot::new();
/// assert!(POOL.get().is_none());
/// ```
pub struct PoolSlot {
    cell: OnceLock<Arc<InstancePool>>,
}

impl PoolSlot {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Builds and installs the pool if none is installed yet.
    pub fn install_with<F>(&self, build: F) -> Result<Arc<InstancePool>>
    where
        F: FnOnce() -> InstancePool,
    {
        if self.cell.get().is_some() {
            log::warn!("Instance pool already initialized, ignoring re-initialization");
            return Err(BirdsongError::PoolAlreadyInitialized);
        }

        let pool = Arc::new(build());
        match self.cell.set(pool.clone()) {
            Ok(()) => Ok(pool),
            Err(_) => {
                log::warn!("Instance pool initialized concurrently, discarding the second pool");
                Err(BirdsongError::PoolAlreadyInitialized)
            }
        }
    }

    pub fn get(&self) -> Option<Arc<InstancePool>> {
        self.cell.get().cloned()
    }
}

impl Default for PoolSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedEngine;
    use std::thread;

    fn dove() -> SpeciesId {
        SpeciesId::new("EaredDove")
    }

    fn thrush() -> SpeciesId {
        SpeciesId::new("GreatThrush")
    }

    fn catalog() -> SpeciesCatalog {
        let mut catalog = SpeciesCatalog::new();
        catalog.insert(dove(), EventDescriptor::new("event:/Birds/EaredDove"), 3);
        catalog.insert(thrush(), EventDescriptor::new("event:/Birds/GreatThrush"), 2);
        catalog
    }

    fn setup(pool_size: usize) -> (Arc<SimulatedEngine>, InstancePool) {
        let engine = Arc::new(SimulatedEngine::new());
        let pool = InstancePool::new(engine.clone(), &catalog(), pool_size);
        (engine, pool)
    }

    #[test]
    fn test_eager_creation() {
        let (engine, pool) = setup(4);
        assert_eq!(engine.created_count(), 8);
        assert_eq!(pool.stats(&dove()).unwrap().queued, 4);
        assert_eq!(pool.stats(&thrush()).unwrap().queued, 4);
    }

    #[test]
    fn test_fifo_reuse() {
        let (_engine, pool) = setup(2);
        let first = pool.acquire(&dove()).unwrap();
        let second = pool.acquire(&dove()).unwrap();
        pool.release(&dove(), first);
        pool.release(&dove(), second);

        assert_eq!(pool.acquire(&dove()).unwrap(), first);
        assert_eq!(pool.acquire(&dove()).unwrap(), second);
    }

    #[test]
    fn test_instances_keep_their_species() {
        let (engine, pool) = setup(1);
        let handle = pool.acquire(&dove()).unwrap();
        assert_eq!(
            engine.event_of(handle).unwrap().path(),
            "event:/Birds/EaredDove"
        );

        // Returned under the wrong species, it still lands in its own queue
        pool.release(&thrush(), handle);
        assert_eq!(pool.stats(&dove()).unwrap().queued, 1);
        assert_eq!(pool.stats(&thrush()).unwrap().queued, 1);
        assert_eq!(pool.species_of(handle), Some(dove()));
    }

    #[test]
    fn test_exhaustion_falls_back_to_creation() {
        let engine = Arc::new(SimulatedEngine::new());
        let pool = Arc::new(InstancePool::new(engine.clone(), &catalog(), 2));

        let workers: Vec<_> = (0..3)
            .map(|_| {
                let pool = pool.clone();
                thread::spawn(move || pool.acquire(&dove()).unwrap())
            })
            .collect();
        let mut handles: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
        handles.sort();
        handles.dedup();

        assert_eq!(handles.len(), 3);
        let stats = pool.stats(&dove()).unwrap();
        assert_eq!(stats.checked_out, 3);
        assert_eq!(stats.fallbacks_created, 1);
        assert_eq!(stats.exhaustions, 1);
        assert!(stats.checked_out <= pool.pool_size() + stats.fallbacks_created);
        assert_eq!(engine.created_count(), 5);
    }

    #[test]
    fn test_fallback_instance_joins_the_pool() {
        let (_engine, pool) = setup(0);
        let handle = pool.acquire(&dove()).unwrap();
        pool.release(&dove(), handle);
        assert_eq!(pool.stats(&dove()).unwrap().queued, 1);
        assert_eq!(pool.acquire(&dove()).unwrap(), handle);
    }

    #[test]
    fn test_failed_fallback_is_an_error() {
        let engine = Arc::new(
            SimulatedEngine::new().with_failing_event(EventDescriptor::new("event:/Birds/EaredDove")),
        );
        let pool = InstancePool::new(engine, &catalog(), 2);
        assert_eq!(pool.stats(&dove()).unwrap().queued, 0);
        assert!(matches!(pool.acquire(&dove()), Err(BirdsongError::Engine(_))));
        // The other species is unaffected
        assert!(pool.acquire(&thrush()).is_ok());
    }

    #[test]
    fn test_unknown_species() {
        let (_engine, pool) = setup(1);
        assert!(matches!(
            pool.acquire(&SpeciesId::new("Dodo")),
            Err(BirdsongError::UnknownSpecies(_))
        ));
    }

    #[test]
    fn test_double_release_is_ignored() {
        let (_engine, pool) = setup(1);
        let handle = pool.acquire(&dove()).unwrap();
        pool.release(&dove(), handle);
        pool.release(&dove(), handle);
        assert_eq!(pool.stats(&dove()).unwrap().queued, 1);

        // A handle the pool never handed out is ignored too
        pool.release(&dove(), InstanceHandle::new(9999));
        assert_eq!(pool.stats(&dove()).unwrap().queued, 1);
    }

    #[test]
    fn test_teardown_releases_everything_once() {
        let (engine, pool) = setup(2);
        let held = pool.acquire(&dove()).unwrap();
        engine.start(held).unwrap();

        assert_eq!(pool.teardown(), 4);
        assert_eq!(engine.live_instances(), 0);
        assert_eq!(engine.released_count(), 4);

        assert_eq!(pool.teardown(), 0);
        pool.release(&dove(), held);
        assert_eq!(engine.released_count(), 4);
        assert!(matches!(pool.acquire(&dove()), Err(BirdsongError::PoolTornDown)));
    }

    #[test]
    fn test_drop_tears_down() {
        let engine = Arc::new(SimulatedEngine::new());
        {
            let _pool = InstancePool::new(engine.clone(), &catalog(), 3);
            assert_eq!(engine.live_instances(), 6);
        }
        assert_eq!(engine.live_instances(), 0);
    }

    #[test]
    fn test_discard_forgets_invalid_handle() {
        let (engine, pool) = setup(1);
        let handle = pool.acquire(&dove()).unwrap();
        engine.invalidate(handle);
        pool.discard(handle);

        assert_eq!(pool.stats(&dove()).unwrap().checked_out, 0);
        assert_eq!(pool.species_of(handle), None);
        assert_eq!(pool.teardown(), 1);
    }

    #[test]
    fn test_slot_rejects_second_install() {
        let engine = Arc::new(SimulatedEngine::new());
        let slot = PoolSlot::new();

        let first = slot
            .install_with(|| InstancePool::new(engine.clone(), &catalog(), 1))
            .unwrap();
        let second = slot.install_with(|| InstancePool::new(engine.clone(), &catalog(), 1));

        assert!(matches!(second, Err(BirdsongError::PoolAlreadyInitialized)));
        assert!(Arc::ptr_eq(&first, &slot.get().unwrap()));
        // The rejected pool was never built
        assert_eq!(engine.created_count(), 2);
    }
}
