use anyhow::{Context, Result, bail};
use birdsong_core::engine::SimulatedEngine;
use birdsong_core::pool::PoolSlot;
use birdsong_core::scene::SceneTables;
use birdsong_core::{AmbienceEvent, AmbienceWorld, AmbienceWorldDesc, EmitterId};
use clap::Parser;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const DEFAULT_SCENE: &str = "birdsong-demo/asset/scene.json";

static POOL: PoolSlot = PoolSlot::new();

const FRAME_SECONDS: f32 = 0.05;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Runs a bird ambience scene against the simulated engine")]
pub struct Options {
    /// Scene file with species, zones and emitters
    #[arg(value_name = "SCENE", default_value = DEFAULT_SCENE)]
    pub scene: String,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 60.0)]
    pub seconds: f32,

    /// Seed for every emitter's random choices
    #[arg(long, default_value_t = 2024, conflicts_with = "entropy")]
    pub seed: u64,

    /// Seed emitters from OS entropy instead of --seed
    #[arg(long, default_value_t = false)]
    pub entropy: bool,

    /// Sleep between frames so the scene runs at wall-clock speed
    #[arg(long, default_value_t = false)]
    pub realtime: bool,

    /// Log scheduler transitions and pool activity
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

impl Options {
    fn world_seed(&self) -> Option<u64> {
        (!self.entropy).then_some(self.seed)
    }
}

/// Bakes a clip length and clip count into every species event.
///
/// Species without a declared count keep no baked value, so the catalog logs
/// the miss and treats them as empty.
fn simulated_engine(tables: &SceneTables) -> SimulatedEngine {
    let mut engine = SimulatedEngine::new().with_fade_out(0.3);
    for (i, species) in tables.species.iter().enumerate() {
        let clip_length = 1.5 + (i % 4) as f32 * 0.75;
        engine = engine.with_clip_length(species.event.clone(), clip_length);
        if let Some(total) = species.total_clips {
            engine = engine.with_parameter(species.event.clone(), "TotalClips", total as f32);
        }
    }
    engine
}

/// Advances the engine on its own thread in lockstep with the world, so
/// completion callbacks arrive from a thread other than the ticking one.
fn spawn_engine_thread(
    engine: Arc<SimulatedEngine>,
    frames: Receiver<f32>,
    done: Sender<usize>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for dt in frames {
            let stopped = engine.advance(dt);
            if done.send(stopped).is_err() {
                break;
            }
        }
        log::debug!("Engine thread finished");
    })
}

fn log_event(event: &AmbienceEvent) {
    match event {
        AmbienceEvent::CycleStarted {
            emitter,
            species,
            total_clips,
        } => log::info!("[{}] new cycle: {} ({} clips)", emitter, species, total_clips),
        AmbienceEvent::ClipStarted {
            emitter,
            species,
            clip,
            total_clips,
            ..
        } => log::info!("[{}] {} clip {}/{}", emitter, species, clip, total_clips),
        AmbienceEvent::SetCompleted {
            emitter, outcome, ..
        } => log::info!("[{}] clip set done: {:?}", emitter, outcome),
        AmbienceEvent::InteractionStopped { emitter, resume_in } => {
            log::info!("[{}] interrupted, resuming in {:.1}s", emitter, resume_in)
        }
        event if event.is_error() => log::warn!("{:?}", event),
        event => log::debug!("{:?}", event),
    }
}

pub fn run_scene(options: &Options) -> Result<()> {
    log::info!("Loading scene: {}", options.scene);
    let tables = SceneTables::from_path(&options.scene)
        .with_context(|| format!("Failed to load scene {}", options.scene))?;

    let engine = Arc::new(simulated_engine(&tables));
    let mut desc = AmbienceWorldDesc::new().pool_size(3);
    if let Some(seed) = options.world_seed() {
        desc = desc.seed(seed);
    }
    let mut world = AmbienceWorld::new(desc, engine.clone(), &tables, &POOL)?;

    let (frame_tx, frame_rx) = bounded(1);
    let (done_tx, done_rx) = bounded(1);
    let engine_thread = spawn_engine_thread(engine.clone(), frame_rx, done_tx);

    world.start();
    for event in world.poll_events() {
        log_event(&event);
    }

    let frames = (options.seconds / FRAME_SECONDS).round() as usize;
    let interaction_every = (15.0 / FRAME_SECONDS) as usize;
    for frame in 1..=frames {
        frame_tx.send(FRAME_SECONDS)?;
        done_rx.recv()?;
        world.tick(FRAME_SECONDS);

        if frame % interaction_every == 0 && !world.emitters().is_empty() {
            let target = EmitterId::new((frame / interaction_every) % world.emitters().len());
            log::info!("Player interacts with emitter {}", target);
            world.player_interaction(target, 3.0, 6.0)?;
        }

        for event in world.poll_events() {
            log_event(&event);
        }

        if options.realtime {
            thread::sleep(Duration::from_secs_f32(FRAME_SECONDS));
        }
    }

    drop(frame_tx);
    if engine_thread.join().is_err() {
        bail!("Engine thread panicked");
    }

    for entry in world.species_catalog().iter() {
        if let Some(stats) = world.pool().stats(&entry.id) {
            log::info!(
                "Pool {}: {} queued, {} checked out, {} created on demand",
                entry.id,
                stats.queued,
                stats.checked_out,
                stats.fallbacks_created
            );
        }
    }

    let released = world.teardown();
    log::info!(
        "Scene finished after {:.1}s, {} instances released, {} still live in the engine",
        options.seconds,
        released,
        engine.live_instances()
    );
    Ok(())
}
