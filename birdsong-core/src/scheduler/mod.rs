//! Per-emitter playback scheduling.
//!
//! Each [`Emitter`] runs one logical timeline: it picks a species from its
//! zone, plays that species' clips one at a time through pooled instances,
//! and decides at the end of every clip set whether to fall silent, switch
//! species, or play the set again. All waits are timers advanced by the
//! world's tick; nothing here blocks or spawns threads.
//!
//! The scheduler only ever runs on the ticking thread. Engine completion
//! callbacks reach it as [`CompletionNotice`](crate::completion::CompletionNotice)s
//! drained at the start of each tick.

mod emitter;
mod outcome;
mod timers;


pub use emitter::{Emitter, EmitterState};
pub use outcome::SetOutcome;

use crate::completion::CompletionRouter;
use crate::engine::AudioEngine;
use crate::events::AmbienceEvent;
use crate::pool::InstancePool;
use crate::scene::SpeciesCatalog;

/// Index of an emitter within its world.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmitterId(usize);

impl EmitterId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for EmitterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EmitterId({})", self.0)
    }
}

/// Shared services an emitter uses while it runs.
pub struct SchedulerContext<'a> {
    pub engine: &'a dyn AudioEngine,
    pub pool: &'a InstancePool,
    pub species: &'a SpeciesCatalog,
    pub router: &'a CompletionRouter,
    pub events: &'a mut Vec<AmbienceEvent>,
}
