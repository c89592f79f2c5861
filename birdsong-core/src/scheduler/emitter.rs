use super::outcome::SetOutcome;
use super::timers::TimerSlot;
use super::{EmitterId, SchedulerContext};
use crate::completion::CompletionNotice;
use crate::config::{EmitterConfig, SecondsRange};
use crate::engine::AudioEngine;
use crate::events::AmbienceEvent;
use crate::math::{SpatialAttributes, Vec3};
use crate::playback::{InstanceHandle, StopMode};
use crate::scene::{SpeciesId, ZoneCatalog};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::time::Duration;

/// Where an emitter is in its playback cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmitterState {
    /// Not started, shut down, or no eligible species
    Idle,
    /// Silent start before the first eligibility poll
    InitialSilence,
    /// No cycle in progress; the poll starts one once the emitter is eligible
    WaitingEligible,
    /// An instance was started and has not reported completion
    Playing,
    /// Between two clips of a cycle
    InterDelay,
    /// Silence after a finished clip set, before a fresh species pick
    Silence,
    /// Stopped by a player interaction, waiting to resume
    StoppedByInteraction,
}

/// Successor scheduled by the cycle timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleStep {
    /// Play the current species again
    Play,
    /// Pick a fresh species right away
    Switch,
    /// Pick a fresh species once the silence has elapsed
    AfterSilence,
    EndInitialSilence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Ineligibility,
    Step,
    Resume,
    Poll,
}

#[derive(Debug, Clone)]
struct ActiveInstance {
    handle: InstanceHandle,
    species: SpeciesId,
    lease: u64,
}

/// One in-world source running the playback state machine for its zone.
///
/// The emitter owns at most one engine instance at a time. Every wait in the
/// cycle is a [`TimerSlot`] on the emitter's own clock, advanced by
/// [`tick`](Self::tick); arming a slot replaces its previous successor, so
/// stopping or restarting a cycle never leaves a stale continuation behind.
pub struct Emitter {
    id: EmitterId,
    config: EmitterConfig,
    species: Vec<SpeciesId>,
    state: EmitterState,
    eligible: bool,
    current_species: Option<SpeciesId>,
    clips_played: u32,
    clips_total: u32,
    active: Option<ActiveInstance>,
    rng: StdRng,
    now: f64,
    tick: u64,
    poll_interval: f32,
    poll: TimerSlot<()>,
    ineligibility: TimerSlot<()>,
    step: TimerSlot<CycleStep>,
    resume: TimerSlot<()>,
}

impl Emitter {
    /// Creates an idle emitter. The zone's species are resolved once here.
    pub fn new(
        id: EmitterId,
        config: EmitterConfig,
        zones: &ZoneCatalog,
        rng: StdRng,
        poll_interval: Duration,
    ) -> Self {
        let species = zones.species_for_zone(&config.zone).to_vec();
        Self {
            id,
            config,
            species,
            state: EmitterState::Idle,
            eligible: true,
            current_species: None,
            clips_played: 0,
            clips_total: 0,
            active: None,
            rng,
            now: 0.0,
            tick: 0,
            poll_interval: poll_interval.as_secs_f32(),
            poll: TimerSlot::new(),
            ineligibility: TimerSlot::new(),
            step: TimerSlot::new(),
            resume: TimerSlot::new(),
        }
    }

    pub fn id(&self) -> EmitterId {
        self.id
    }

    pub fn state(&self) -> EmitterState {
        self.state
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub fn is_eligible(&self) -> bool {
        self.eligible
    }

    pub fn eligible_species(&self) -> &[SpeciesId] {
        &self.species
    }

    pub fn current_species(&self) -> Option<&SpeciesId> {
        self.current_species.as_ref()
    }

    pub fn clips_played(&self) -> u32 {
        self.clips_played
    }

    pub fn clips_total(&self) -> u32 {
        self.clips_total
    }

    /// Handle of the instance the emitter currently owns
    pub fn active_handle(&self) -> Option<InstanceHandle> {
        self.active.as_ref().map(|active| active.handle)
    }

    pub fn position(&self) -> Vec3 {
        self.config.position
    }

    /// Moves the emitter. Takes effect for the next instance it starts.
    pub fn set_position(&mut self, position: Vec3) {
        self.config.position = position;
    }

    /// Seconds on the emitter's clock
    pub fn elapsed(&self) -> f64 {
        self.now
    }

    /// Whether the owned instance is reported as playing by the engine.
    pub fn is_currently_playing(&self, engine: &dyn AudioEngine) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        match engine.playback_state(active.handle) {
            Ok(state) => state.is_playing(),
            Err(_) => false,
        }
    }

    /// Enters the initial state: the configured initial species if it is
    /// eligible here, otherwise an initial silence or a wait for eligibility.
    pub fn start(&mut self, ctx: &mut SchedulerContext<'_>) {
        if self.state != EmitterState::Idle {
            log::debug!("Emitter {} already started", self.id);
            return;
        }
        if self.species.is_empty() {
            log::warn!(
                "Emitter {} has no eligible species in zone {}, staying idle",
                self.id,
                self.config.zone
            );
            return;
        }

        self.poll.arm(self.now, self.tick, 0.0, ());

        let initial = self
            .config
            .initial_species
            .clone()
            .filter(|species| self.species.contains(species));
        if let (Some(configured), None) = (&self.config.initial_species, &initial) {
            log::warn!(
                "Initial species {} of emitter {} is not eligible in zone {}",
                configured,
                self.id,
                self.config.zone
            );
        }

        if let Some(species) = initial {
            self.begin_cycle(species, ctx);
        } else if self.rng.r#gen::<f32>() < self.config.silence_chance {
            let silence = self.config.silence.sample(&mut self.rng);
            log::debug!("Emitter {} starts with {:.2}s of silence", self.id, silence);
            self.step
                .arm(self.now, self.tick, silence, CycleStep::EndInitialSilence);
            self.set_state(EmitterState::InitialSilence, ctx);
        } else {
            self.set_state(EmitterState::WaitingEligible, ctx);
        }
    }

    /// Advances the emitter clock by `dt` seconds and runs every timer that
    /// came due, earliest first.
    pub fn tick(&mut self, dt: f32, ctx: &mut SchedulerContext<'_>) {
        self.now += f64::from(dt.max(0.0));
        self.tick += 1;

        while let Some(kind) = self.next_due() {
            match kind {
                TimerKind::Ineligibility => {
                    self.ineligibility.take();
                    log::debug!("Emitter {} is no longer eligible", self.id);
                    self.eligible = false;
                }
                TimerKind::Step => {
                    if let Some(step) = self.step.take() {
                        self.run_step(step, ctx);
                    }
                }
                TimerKind::Resume => {
                    self.resume.take();
                    self.resume_after_interaction(ctx);
                }
                TimerKind::Poll => {
                    self.poll.take();
                    self.on_poll(ctx);
                }
            }
        }
    }

    fn next_due(&self) -> Option<TimerKind> {
        let candidates = [
            (TimerKind::Ineligibility, self.ineligibility.due_at(self.now, self.tick)),
            (TimerKind::Step, self.step.due_at(self.now, self.tick)),
            (TimerKind::Resume, self.resume.due_at(self.now, self.tick)),
            (TimerKind::Poll, self.poll.due_at(self.now, self.tick)),
        ];

        let mut earliest: Option<(TimerKind, f64)> = None;
        for (kind, due) in candidates {
            let Some(due) = due else { continue };
            match earliest {
                Some((_, best)) if best <= due => {}
                _ => earliest = Some((kind, due)),
            }
        }
        earliest.map(|(kind, _)| kind)
    }

    fn run_step(&mut self, step: CycleStep, ctx: &mut SchedulerContext<'_>) {
        match step {
            CycleStep::Play => self.play_current(ctx),
            CycleStep::Switch | CycleStep::AfterSilence => self.fresh_cycle(ctx),
            CycleStep::EndInitialSilence => {
                log::debug!("Emitter {} initial silence over", self.id);
                self.set_state(EmitterState::WaitingEligible, ctx);
            }
        }
    }

    /// Starts a fresh cycle if the emitter is eligible and silent between
    /// clips, between sets, or after an aborted cycle.
    ///
    /// The fresh cycle replaces whatever successor the step timer held.
    fn on_poll(&mut self, ctx: &mut SchedulerContext<'_>) {
        self.poll
            .arm(self.now, self.tick, self.poll_interval, ());
        if !self.eligible || self.is_currently_playing(ctx.engine) {
            return;
        }
        if matches!(
            self.state,
            EmitterState::WaitingEligible | EmitterState::InterDelay | EmitterState::Silence
        ) {
            log::debug!("Emitter {} is eligible while {:?}", self.id, self.state);
            self.fresh_cycle(ctx);
        }
    }

    fn fresh_cycle(&mut self, ctx: &mut SchedulerContext<'_>) {
        let Some(species) = self.species.choose(&mut self.rng).cloned() else {
            log::warn!("Emitter {} has no species to pick from", self.id);
            self.set_state(EmitterState::Idle, ctx);
            return;
        };
        self.begin_cycle(species, ctx);
    }

    fn begin_cycle(&mut self, species: SpeciesId, ctx: &mut SchedulerContext<'_>) {
        let throttle = self.config.delay.sample(&mut self.rng);
        self.ineligibility.arm(self.now, self.tick, throttle, ());

        self.clips_total = ctx.species.total_clips(&species);
        self.clips_played = 0;
        log::info!(
            "Emitter {} starts a cycle of {} ({} clips)",
            self.id,
            species,
            self.clips_total
        );
        ctx.events.push(AmbienceEvent::CycleStarted {
            emitter: self.id,
            species: species.clone(),
            total_clips: self.clips_total,
        });
        self.current_species = Some(species);
        self.play_current(ctx);
    }

    /// Plays the next clip of the current species.
    fn play_current(&mut self, ctx: &mut SchedulerContext<'_>) {
        let Some(species) = self.current_species.clone() else {
            self.abort_cycle("no species selected".to_string(), ctx);
            return;
        };
        if ctx.species.try_event_for_species(&species).is_none() {
            self.abort_cycle(format!("no event for species {}", species), ctx);
            return;
        }

        if let Some(active) = self.active.clone() {
            match ctx.engine.playback_state(active.handle) {
                Ok(state) if state.is_playing() => {
                    let retry_in = self.config.delay.sample(&mut self.rng);
                    log::debug!(
                        "Emitter {} still playing {}, retrying in {:.2}s",
                        self.id,
                        active.handle,
                        retry_in
                    );
                    self.step
                        .arm(self.now, self.tick, retry_in, CycleStep::Play);
                    ctx.events.push(AmbienceEvent::PlaybackDeferred {
                        emitter: self.id,
                        handle: active.handle,
                        retry_in,
                    });
                    return;
                }
                Ok(_) => self.return_active(StopMode::AllowFadeOut, ctx),
                Err(e) => {
                    log::error!("Emitter {} lost {}: {}", self.id, active.handle, e);
                    self.discard_active(ctx);
                }
            }
        }

        let handle = match ctx.pool.acquire(&species) {
            Ok(handle) => handle,
            Err(e) => {
                self.abort_cycle(format!("could not get instance of {}: {}", species, e), ctx);
                return;
            }
        };

        let lease = ctx.router.register(handle, self.id);
        let attributes = SpatialAttributes::from_position(self.config.position);
        let started = ctx
            .engine
            .set_3d_attributes(handle, attributes)
            .and_then(|()| {
                ctx.engine
                    .set_completion_callback(handle, Some(ctx.router.callback()))
            })
            .and_then(|()| ctx.engine.start(handle));
        if let Err(e) = started {
            log::error!("Emitter {} failed to start {}: {}", self.id, handle, e);
            ctx.router.unregister(handle);
            if ctx.engine.is_valid(handle) {
                if let Err(e) = ctx.engine.set_completion_callback(handle, None) {
                    log::debug!("Could not detach {}: {}", handle, e);
                }
                ctx.pool.release(&species, handle);
            } else {
                ctx.pool.discard(handle);
            }
            self.abort_cycle(format!("could not start instance of {}", species), ctx);
            return;
        }

        self.active = Some(ActiveInstance {
            handle,
            species: species.clone(),
            lease,
        });
        self.clips_played += 1;
        log::debug!(
            "Emitter {} plays {} clip {}/{} on {}",
            self.id,
            species,
            self.clips_played,
            self.clips_total,
            handle
        );
        ctx.events.push(AmbienceEvent::ClipStarted {
            emitter: self.id,
            species: species.clone(),
            handle,
            clip: self.clips_played,
            total_clips: self.clips_total,
        });
        self.set_state(EmitterState::Playing, ctx);

        if self.clips_played >= self.clips_total {
            self.finish_set(species, ctx);
        } else {
            let wait = self.config.delay.sample(&mut self.rng);
            self.step.arm(self.now, self.tick, wait, CycleStep::Play);
        }
    }

    /// Decides what follows a finished clip set with one draw.
    fn finish_set(&mut self, species: SpeciesId, ctx: &mut SchedulerContext<'_>) {
        let outcome = SetOutcome::roll(
            &mut self.rng,
            self.config.silence_chance,
            self.config.switch_species_chance,
        );
        log::debug!(
            "Emitter {} finished the clip set of {}: {:?}",
            self.id,
            species,
            outcome
        );
        ctx.events.push(AmbienceEvent::SetCompleted {
            emitter: self.id,
            species,
            outcome,
        });

        match outcome {
            SetOutcome::Silence => {
                let silence = self.config.silence.sample(&mut self.rng);
                self.step
                    .arm(self.now, self.tick, silence, CycleStep::AfterSilence);
            }
            SetOutcome::SwitchSpecies => {
                self.step.arm(self.now, self.tick, 0.0, CycleStep::Switch);
            }
            SetOutcome::Continue => {
                self.clips_played = 0;
                let wait = self.config.delay.sample(&mut self.rng);
                self.step.arm(self.now, self.tick, wait, CycleStep::Play);
            }
        }
    }

    /// Ends the current cycle after a failure and falls back to the poll.
    fn abort_cycle(&mut self, reason: String, ctx: &mut SchedulerContext<'_>) {
        log::warn!("Emitter {} ends its cycle: {}", self.id, reason);
        self.step.cancel();
        self.ineligibility.cancel();
        if self.active.is_none() {
            self.eligible = true;
        }
        if !self.poll.is_armed() {
            self.poll
                .arm(self.now, self.tick, self.poll_interval, ());
        }
        ctx.events.push(AmbienceEvent::CycleAborted {
            emitter: self.id,
            reason,
        });
        self.set_state(EmitterState::WaitingEligible, ctx);
    }

    /// Handles a completion notice drained from the router.
    ///
    /// Returns false if the notice is stale and was ignored.
    pub fn on_completion(
        &mut self,
        notice: CompletionNotice,
        ctx: &mut SchedulerContext<'_>,
    ) -> bool {
        let current = matches!(
            &self.active,
            Some(active) if active.handle == notice.handle && active.lease == notice.lease
        );
        if !current {
            log::debug!(
                "Emitter {} ignores stale completion of {}",
                self.id,
                notice.handle
            );
            return false;
        }

        self.eligible = true;
        if let Some(active) = self.active.take() {
            if let Err(e) = ctx.engine.set_completion_callback(active.handle, None) {
                log::debug!("Could not detach {}: {}", active.handle, e);
            }
            ctx.pool.release(&active.species, active.handle);
        }
        log::debug!("Emitter {} finished {}", self.id, notice.handle);
        ctx.events.push(AmbienceEvent::InstanceCompleted {
            emitter: self.id,
            handle: notice.handle,
        });

        if self.state == EmitterState::Playing {
            let next = match self.step.action() {
                Some(CycleStep::Play) | Some(CycleStep::Switch) => EmitterState::InterDelay,
                Some(CycleStep::AfterSilence) => EmitterState::Silence,
                Some(CycleStep::EndInitialSilence) | None => EmitterState::WaitingEligible,
            };
            self.set_state(next, ctx);
        }
        true
    }

    /// Stops the current clip with a fade and resumes after a wait sampled
    /// from `[min_stop, max_stop]`.
    ///
    /// Acts while a cycle is running or already interrupted; any other state
    /// ignores the interaction, as does a non-finite stop range.
    pub fn player_interaction(
        &mut self,
        min_stop: f32,
        max_stop: f32,
        ctx: &mut SchedulerContext<'_>,
    ) -> bool {
        if !min_stop.is_finite() || !max_stop.is_finite() {
            log::warn!(
                "Emitter {} ignores interaction with stop range [{}, {}]",
                self.id,
                min_stop,
                max_stop
            );
            return false;
        }
        if !matches!(
            self.state,
            EmitterState::Playing | EmitterState::InterDelay | EmitterState::StoppedByInteraction
        ) {
            log::debug!(
                "Emitter {} ignores interaction while {:?}",
                self.id,
                self.state
            );
            return false;
        }

        if let Some(active) = &self.active {
            if let Err(e) = ctx.engine.stop(active.handle, StopMode::AllowFadeOut) {
                log::error!("Emitter {} could not stop {}: {}", self.id, active.handle, e);
            }
        }

        let resume_in = SecondsRange::new(min_stop, max_stop)
            .sample(&mut self.rng)
            .max(0.0);
        self.step.cancel();
        self.resume.arm(self.now, self.tick, resume_in, ());
        log::debug!("Emitter {} interrupted, resuming in {:.2}s", self.id, resume_in);
        ctx.events.push(AmbienceEvent::InteractionStopped {
            emitter: self.id,
            resume_in,
        });
        self.set_state(EmitterState::StoppedByInteraction, ctx);
        true
    }

    fn resume_after_interaction(&mut self, ctx: &mut SchedulerContext<'_>) {
        let same_species = self.current_species.is_some() && self.clips_played < self.clips_total;
        ctx.events.push(AmbienceEvent::PlaybackResumed {
            emitter: self.id,
            same_species,
        });
        self.set_state(EmitterState::InterDelay, ctx);
        if same_species {
            self.play_current(ctx);
        } else {
            self.fresh_cycle(ctx);
        }
    }

    /// Cancels every timer and returns the owned instance to the pool.
    pub fn shutdown(&mut self, ctx: &mut SchedulerContext<'_>) {
        self.poll.cancel();
        self.ineligibility.cancel();
        self.step.cancel();
        self.resume.cancel();
        self.return_active(StopMode::Immediate, ctx);
        self.set_state(EmitterState::Idle, ctx);
    }

    /// Detaches, stops and releases the owned instance.
    fn return_active(&mut self, mode: StopMode, ctx: &mut SchedulerContext<'_>) {
        let Some(active) = self.active.take() else {
            return;
        };
        ctx.router.unregister(active.handle);
        if let Err(e) = ctx.engine.set_completion_callback(active.handle, None) {
            log::error!("Emitter {} lost {}: {}", self.id, active.handle, e);
            ctx.pool.discard(active.handle);
            ctx.events.push(AmbienceEvent::InvalidHandle {
                emitter: self.id,
                handle: active.handle,
            });
            return;
        }
        if let Err(e) = ctx.engine.stop(active.handle, mode) {
            log::error!("Emitter {} could not stop {}: {}", self.id, active.handle, e);
        }
        ctx.pool.release(&active.species, active.handle);
    }

    fn discard_active(&mut self, ctx: &mut SchedulerContext<'_>) {
        if let Some(active) = self.active.take() {
            ctx.router.unregister(active.handle);
            ctx.pool.discard(active.handle);
            ctx.events.push(AmbienceEvent::InvalidHandle {
                emitter: self.id,
                handle: active.handle,
            });
        }
    }

    fn set_state(&mut self, to: EmitterState, ctx: &mut SchedulerContext<'_>) {
        if self.state == to {
            return;
        }
        log::debug!("Emitter {}: {:?} -> {:?}", self.id, self.state, to);
        ctx.events.push(AmbienceEvent::StateChanged {
            emitter: self.id,
            from: self.state,
            to,
        });
        self.state = to;
    }
}
