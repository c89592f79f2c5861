use crate::completion::CompletionRouter;
use crate::config::{AmbienceWorldDesc, EmitterConfig};
use crate::engine::AudioEngine;
use crate::error::{BirdsongError, Result};
use crate::events::AmbienceEvent;
use crate::math::Vec3;
use crate::pool::{InstancePool, PoolSlot};
use crate::scene::{SceneTables, SpeciesCatalog, ZoneCatalog};
use crate::scheduler::{Emitter, EmitterId, SchedulerContext};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

/// Composition root that owns the catalogs, the shared pool and every emitter.
///
/// `AmbienceWorld` is driven from one thread, typically the game's frame loop,
/// through [`tick`](Self::tick). The audio engine may report finished
/// instances from its own thread at any time; those reports are queued by the
/// [`CompletionRouter`] and applied at the start of the next tick.
///
/// # Architecture
///
/// - **Tick thread**: Owns the `AmbienceWorld`, advances emitter timers, routes
///   interactions and applies completion notices
/// - **Engine thread**: Invokes completion callbacks, which only post notices
///
/// # Example
///
/// ```
/// use birdsong_core::config::AmbienceWorldDesc;
/// use birdsong_core::engine::SimulatedEngine;
/// use birdsong_core::pool::PoolSlot;
/// use birdsong_core::scene::SceneTables;
/// use birdsong_core::world::AmbienceWorld;
/// use std::sync::Arc;
///
/// static POOL: PoolSlot = PoolSlot::new();
///
/// let tables = SceneTables::from_json_str(r#"{
///     "species": [{ "name": "EaredDove", "event": "event:/Birds/EaredDove", "total_clips": 2 }],
///     "zones": [{ "name": "Park", "species": ["EaredDove"] }],
///     "emitters": [{ "zone": "Park", "initial_species": "EaredDove" }]
/// }"#)?;
/// let engine = Arc::new(SimulatedEngine::new());
/// let mut world = AmbienceWorld::new(AmbienceWorldDesc::new().seed(7), engine, &tables, &POOL)?;
///
/// world.start();
/// world.tick(0.1);
/// assert_eq!(world.emitters().len(), 1);
/// world.teardown();
/// # Ok::<(), birdsong_core::BirdsongError>(())
/// ```
pub struct AmbienceWorld {
    desc: AmbienceWorldDesc,
    engine: Arc<dyn AudioEngine>,
    species: SpeciesCatalog,
    zones: ZoneCatalog,
    pool: Arc<InstancePool>,
    router: CompletionRouter,
    emitters: Vec<Emitter>,
    events: Vec<AmbienceEvent>,
    started: bool,
    torn_down: bool,
}

impl AmbienceWorld {
    /// Builds the catalogs, installs the pool into `slot` and creates one
    /// emitter per emitter definition in `tables`.
    ///
    /// # Errors
    ///
    /// Returns [`BirdsongError::Configuration`] for an invalid descriptor or
    /// emitter, and [`BirdsongError::PoolAlreadyInitialized`] if `slot` already
    /// holds a pool.
    pub fn new(
        desc: AmbienceWorldDesc,
        engine: Arc<dyn AudioEngine>,
        tables: &SceneTables,
        slot: &PoolSlot,
    ) -> Result<Self> {
        desc.validate()?;
        for config in &tables.emitters {
            config.validate()?;
        }

        let species = SpeciesCatalog::build(
            engine.as_ref(),
            &tables.species,
            &desc.clip_count_parameter,
        );
        let zones = ZoneCatalog::from_defs(&tables.zones);
        for (zone, missing) in zones.missing_species(&species) {
            log::warn!("Zone {} lists unknown species {}", zone, missing);
        }

        let pool = slot.install_with(|| {
            InstancePool::new(engine.clone(), &species, desc.pool_size)
        })?;

        let mut world = Self {
            desc,
            engine,
            species,
            zones,
            pool,
            router: CompletionRouter::new(),
            emitters: Vec::with_capacity(tables.emitters.len()),
            events: Vec::new(),
            started: false,
            torn_down: false,
        };
        for config in &tables.emitters {
            world.add_emitter(config.clone())?;
        }

        log::info!(
            "Ambience world created: {} species, {} zones, {} emitters",
            world.species.len(),
            world.zones.len(),
            world.emitters.len()
        );
        Ok(world)
    }

    /// Adds an emitter. If the world is already running, the emitter starts
    /// right away.
    pub fn add_emitter(&mut self, config: EmitterConfig) -> Result<EmitterId> {
        if self.torn_down {
            return Err(BirdsongError::PoolTornDown);
        }
        config.validate()?;
        if !self.zones.contains(&config.zone) {
            log::warn!("Emitter assigned to unknown zone {}", config.zone);
        }

        let id = EmitterId::new(self.emitters.len());
        let rng = match self.desc.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ id.index() as u64),
            None => StdRng::from_entropy(),
        };
        self.emitters.push(Emitter::new(
            id,
            config,
            &self.zones,
            rng,
            self.desc.poll_interval,
        ));

        if self.started {
            let mut ctx = SchedulerContext {
                engine: self.engine.as_ref(),
                pool: self.pool.as_ref(),
                species: &self.species,
                router: &self.router,
                events: &mut self.events,
            };
            if let Some(emitter) = self.emitters.last_mut() {
                emitter.start(&mut ctx);
            }
        }
        Ok(id)
    }

    /// Puts every emitter into its initial state. Calling it again does nothing.
    pub fn start(&mut self) {
        if self.started || self.torn_down {
            return;
        }
        self.started = true;

        let mut ctx = SchedulerContext {
            engine: self.engine.as_ref(),
            pool: self.pool.as_ref(),
            species: &self.species,
            router: &self.router,
            events: &mut self.events,
        };
        for emitter in &mut self.emitters {
            emitter.start(&mut ctx);
        }
        log::info!("Ambience world started with {} emitters", self.emitters.len());
    }

    /// Advances the world by `dt` seconds.
    ///
    /// Completion notices posted since the last tick are applied first, then
    /// every emitter runs its due timers.
    pub fn tick(&mut self, dt: f32) {
        if self.torn_down {
            log::debug!("Tick after teardown ignored");
            return;
        }

        let notices = self.router.drain();
        let mut ctx = SchedulerContext {
            engine: self.engine.as_ref(),
            pool: self.pool.as_ref(),
            species: &self.species,
            router: &self.router,
            events: &mut self.events,
        };
        for notice in notices {
            match self.emitters.get_mut(notice.emitter.index()) {
                Some(emitter) => {
                    emitter.on_completion(notice, &mut ctx);
                }
                None => log::error!(
                    "Completion of {} routed to unknown emitter {}",
                    notice.handle,
                    notice.emitter
                ),
            }
        }

        if !self.started {
            return;
        }
        for emitter in &mut self.emitters {
            emitter.tick(dt, &mut ctx);
        }
    }

    /// Interrupts an emitter, e.g. when the player touches or startles it.
    ///
    /// # Arguments
    ///
    /// * `emitter` - The emitter to interrupt
    /// * `min_stop` - Shortest pause before playback resumes, in seconds
    /// * `max_stop` - Longest pause before playback resumes, in seconds
    ///
    /// # Returns
    ///
    /// `true` if the emitter was interrupted, `false` if its state ignores
    /// interactions
    ///
    /// # Errors
    ///
    /// Returns [`BirdsongError::UnknownEmitter`] if the id is out of range.
    pub fn player_interaction(
        &mut self,
        emitter: EmitterId,
        min_stop: f32,
        max_stop: f32,
    ) -> Result<bool> {
        let target = self
            .emitters
            .get_mut(emitter.index())
            .ok_or(BirdsongError::UnknownEmitter(emitter.index()))?;
        let mut ctx = SchedulerContext {
            engine: self.engine.as_ref(),
            pool: self.pool.as_ref(),
            species: &self.species,
            router: &self.router,
            events: &mut self.events,
        };
        Ok(target.player_interaction(min_stop, max_stop, &mut ctx))
    }

    /// Moves an emitter; the next instance it starts uses the new position.
    pub fn set_emitter_position(&mut self, emitter: EmitterId, position: Vec3) -> Result<()> {
        self.emitters
            .get_mut(emitter.index())
            .ok_or(BirdsongError::UnknownEmitter(emitter.index()))?
            .set_position(position);
        Ok(())
    }

    /// Whether the emitter's instance is currently playing in the engine.
    pub fn is_currently_playing(&self, emitter: EmitterId) -> Result<bool> {
        self.emitter(emitter)
            .map(|emitter| emitter.is_currently_playing(self.engine.as_ref()))
            .ok_or(BirdsongError::UnknownEmitter(emitter.index()))
    }

    pub fn emitter(&self, id: EmitterId) -> Option<&Emitter> {
        self.emitters.get(id.index())
    }

    pub fn emitters(&self) -> &[Emitter] {
        &self.emitters
    }

    /// Takes every event recorded since the last call.
    pub fn poll_events(&mut self) -> Vec<AmbienceEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pool(&self) -> &Arc<InstancePool> {
        &self.pool
    }

    pub fn species_catalog(&self) -> &SpeciesCatalog {
        &self.species
    }

    pub fn zone_catalog(&self) -> &ZoneCatalog {
        &self.zones
    }

    pub fn desc(&self) -> &AmbienceWorldDesc {
        &self.desc
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Shuts every emitter down and releases every pooled instance.
    ///
    /// Returns the number of instances released to the engine; a second call
    /// releases nothing.
    pub fn teardown(&mut self) -> usize {
        if self.torn_down {
            return 0;
        }
        self.torn_down = true;

        let mut ctx = SchedulerContext {
            engine: self.engine.as_ref(),
            pool: self.pool.as_ref(),
            species: &self.species,
            router: &self.router,
            events: &mut self.events,
        };
        for emitter in &mut self.emitters {
            emitter.shutdown(&mut ctx);
        }

        let stale = self.router.drain().len();
        if stale > 0 {
            log::debug!("Dropped {} completion notices at teardown", stale);
        }
        let released = self.pool.teardown();
        log::info!("Ambience world torn down");
        released
    }
}

impl Drop for AmbienceWorld {
    fn drop(&mut self) {
        self.teardown();
    }
}
