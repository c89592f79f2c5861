//! # Birdsong Core
//!
//! Ambient bird-sound scheduling for 3D game worlds.
//!
//! Zones list the species that may sing in them. Emitters placed in a zone pick
//! species and clip timings at random, and play them through a shared pool of
//! reusable audio-engine event instances so no instance is created or destroyed
//! in the middle of a session.
//!
//! ## Quick Start
//!
//! ```
//! use birdsong_core::*;
//! use birdsong_core::engine::SimulatedEngine;
//! use birdsong_core::scene::SceneTables;
//! use std::sync::Arc;
//!
//! static POOL: PoolSlot = PoolSlot::new();
//!
//! // Species, zones and emitters usually come from a JSON scene file
//! let tables = SceneTables::from_json_str(r#"{
//!     "species": [
//!         { "name": "CoolBird", "event": "event:/Birds/CoolBird", "total_clips": 3 },
//!         { "name": "ChirpyBird", "event": "event:/Birds/ChirpyBird", "total_clips": 2 }
//!     ],
//!     "zones": [{ "name": "SchoolArea", "species": ["CoolBird", "ChirpyBird"] }],
//!     "emitters": [{ "zone": "SchoolArea", "position": [3.0, 1.0, -6.0] }]
//! }"#)?;
//!
//! // Any AudioEngine implementation works; the simulated one needs no device
//! let engine = Arc::new(SimulatedEngine::new().with_default_clip_length(2.0));
//! let mut world = AmbienceWorld::new(AmbienceWorldDesc::new().seed(42), engine.clone(), &tables, &POOL)?;
//! world.start();
//!
//! // Drive the world from the frame loop
//! for _ in 0..100 {
//!     engine.advance(0.1);
//!     world.tick(0.1);
//!     for event in world.poll_events() {
//!         if let AmbienceEvent::ClipStarted { species, clip, total_clips, .. } = event {
//!             println!("{} clip {}/{}", species, clip, total_clips);
//!         }
//!     }
//! }
//!
//! // The player walked up to the tree
//! world.player_interaction(EmitterId::new(0), 5.0, 10.0)?;
//!
//! world.teardown();
//! # Ok::<(), BirdsongError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`AmbienceWorld`]**: Composition root; owns catalogs, pool and emitters and is ticked by the game
//! - **[`InstancePool`]**: Per-species FIFO queues of reusable engine instances
//! - **[`SpeciesCatalog`]** / **[`ZoneCatalog`]**: Read-only lookup tables built once at startup
//! - **[`Emitter`]**: The per-emitter playback state machine
//! - **[`AudioEngine`]**: Trait over the audio middleware
//! - **[`AmbienceEvent`]**: Observable record of scheduler transitions
//!
//! ## Architecture
//!
//! Birdsong runs on two threads:
//!
//! 1. **Tick Thread**: Owns `AmbienceWorld`, advances every emitter's timers and applies completions
//! 2. **Engine Thread**: Reports stopped instances through completion callbacks
//!
//! Completion callbacks never touch emitter state. They look the handle up in a
//! locked reverse map and post a notice on a channel that the world drains at
//! the start of its next tick.

pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod math;
pub mod playback;
pub mod pool;
pub mod scene;
pub mod scheduler;
pub mod world;

pub use config::{AmbienceWorldDesc, EmitterConfig, SecondsRange};
pub use engine::{AudioEngine, CompletionCallback};
pub use error::BirdsongError;
pub use events::AmbienceEvent;
pub use playback::{EventDescriptor, InstanceHandle, PlaybackState, StopMode};
pub use pool::{InstancePool, PoolSlot, PoolStats};
pub use scene::{SpeciesCatalog, SpeciesId, ZoneCatalog, ZoneId};
pub use scheduler::{Emitter, EmitterId, EmitterState, SetOutcome};
pub use world::AmbienceWorld;
