//! Routing of engine completion callbacks back to their emitters.
//!
//! The engine reports a stopped instance on its own thread. The callback built
//! by [`CompletionRouter::callback`] only looks up which emitter owns the
//! handle, removes that route under the lock and posts a [`CompletionNotice`]
//! on a channel. The scheduler drains the channel on its own tick, so emitter
//! state is only ever mutated from the scheduling thread.
//!
//! Every registration carries a lease number. A notice whose lease no longer
//! matches the emitter's current instance is stale (the handle was detached,
//! returned, or handed out again) and is dropped by the receiver.

use crate::engine::CompletionCallback;
use crate::playback::InstanceHandle;
use crate::scheduler::EmitterId;
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Message posted when a routed instance stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionNotice {
    pub emitter: EmitterId,
    pub handle: InstanceHandle,
    pub lease: u64,
}

#[derive(Debug, Clone, Copy)]
struct Route {
    emitter: EmitterId,
    lease: u64,
}

/// Thread-safe handle → emitter lookup plus the hand-off channel.
pub struct CompletionRouter {
    routes: Arc<Mutex<HashMap<InstanceHandle, Route>>>,
    receiver: Receiver<CompletionNotice>,
    callback: CompletionCallback,
    next_lease: AtomicU64,
}

impl CompletionRouter {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        let routes = Arc::new(Mutex::new(HashMap::new()));
        let callback = Self::build_callback(routes.clone(), sender);
        Self {
            routes,
            receiver,
            callback,
            next_lease: AtomicU64::new(1),
        }
    }

    /// Routes the next stop of `handle` to `emitter` and returns the lease.
    pub fn register(&self, handle: InstanceHandle, emitter: EmitterId) -> u64 {
        let lease = self.next_lease.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = self
            .routes
            .lock()
            .insert(handle, Route { emitter, lease })
        {
            log::warn!(
                "{} re-registered while still routed to emitter {}",
                handle,
                previous.emitter
            );
        }
        lease
    }

    /// Removes the route for `handle`. Returns false if there was none.
    pub fn unregister(&self, handle: InstanceHandle) -> bool {
        self.routes.lock().remove(&handle).is_some()
    }

    pub fn is_routed(&self, handle: InstanceHandle) -> bool {
        self.routes.lock().contains_key(&handle)
    }

    /// The callback handed to the engine for every routed instance.
    ///
    /// It is safe to invoke from any thread and never touches scheduler state.
    pub fn callback(&self) -> CompletionCallback {
        self.callback.clone()
    }

    fn build_callback(
        routes: Arc<Mutex<HashMap<InstanceHandle, Route>>>,
        sender: Sender<CompletionNotice>,
    ) -> CompletionCallback {
        Arc::new(move |handle| {
            let route = routes.lock().remove(&handle);
            match route {
                Some(route) => {
                    let notice = CompletionNotice {
                        emitter: route.emitter,
                        handle,
                        lease: route.lease,
                    };
                    if let Err(e) = sender.send(notice) {
                        log::error!("Failed to post completion of {}: {}", handle, e);
                    }
                }
                None => log::debug!("Completion of unrouted {}", handle),
            }
        })
    }

    /// Takes every notice posted since the last drain.
    pub fn drain(&self) -> Vec<CompletionNotice> {
        self.receiver.try_iter().collect()
    }
}

impl Default for CompletionRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_callback_posts_notice_once() {
        let router = CompletionRouter::new();
        let handle = InstanceHandle::new(7);
        let lease = router.register(handle, EmitterId::new(3));
        let callback = router.callback();

        callback(handle);
        callback(handle);

        assert_eq!(
            router.drain(),
            vec![CompletionNotice {
                emitter: EmitterId::new(3),
                handle,
                lease,
            }]
        );
        assert!(!router.is_routed(handle));
    }

    #[test]
    fn test_unregistered_handle_is_silent() {
        let router = CompletionRouter::new();
        let handle = InstanceHandle::new(1);
        router.register(handle, EmitterId::new(0));
        assert!(router.unregister(handle));
        assert!(!router.unregister(handle));

        router.callback()(handle);
        assert!(router.drain().is_empty());
    }

    #[test]
    fn test_leases_are_unique() {
        let router = CompletionRouter::new();
        let handle = InstanceHandle::new(1);
        let first = router.register(handle, EmitterId::new(0));
        router.unregister(handle);
        let second = router.register(handle, EmitterId::new(0));
        assert_ne!(first, second);
    }

    #[test]
    fn test_notices_cross_threads() {
        let router = CompletionRouter::new();
        for raw in 0..16 {
            router.register(InstanceHandle::new(raw), EmitterId::new(raw as usize % 4));
        }

        let callback = router.callback();
        let engine_thread = thread::spawn(move || {
            for raw in 0..16 {
                callback(InstanceHandle::new(raw));
            }
        });
        engine_thread.join().unwrap();

        let notices = router.drain();
        assert_eq!(notices.len(), 16);
        assert!(notices.iter().all(|n| n.emitter.index() == n.handle.raw() as usize % 4));
    }
}
