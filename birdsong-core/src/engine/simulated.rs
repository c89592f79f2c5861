use super::{AudioEngine, CompletionCallback};
use crate::error::{BirdsongError, Result};
use crate::math::SpatialAttributes;
use crate::playback::{EventDescriptor, InstanceHandle, PlaybackState, StopMode};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Deterministic in-process audio engine.
///
/// Instances "play" for a configurable clip length and stop when the engine is
/// advanced past it. Completion callbacks fire from whichever thread calls
/// [`advance`](Self::advance), [`stop`](AudioEngine::stop) or
/// [`complete_now`](Self::complete_now), which lets tests drive the
/// cross-thread hand-off explicitly.
///
/// # Example
///
/// ```
/// use birdsong_core::engine::{AudioEngine, SimulatedEngine};
/// use birdsong_core::playback::{EventDescriptor, PlaybackState};
///
/// let dove = EventDescriptor::new("event:/Birds/EaredDove");
/// let engine = SimulatedEngine::new()
///     .with_clip_length(dove.clone(), 2.0)
///     .with_parameter(dove.clone(), "TotalClips", 4.0);
///
/// let handle = engine.create_instance(&dove)?;
/// engine.start(handle)?;
/// engine.advance(2.5);
/// assert_eq!(engine.playback_state(handle)?, PlaybackState::Stopped);
/// # Ok::<(), birdsong_core::BirdsongError>(())
/// ```
pub struct SimulatedEngine {
    state: Mutex<SimState>,
}

struct SimState {
    next_handle: u64,
    instances: BTreeMap<InstanceHandle, SimInstance>,
    clip_lengths: HashMap<EventDescriptor, f32>,
    default_clip_length: f32,
    fade_out: f32,
    parameters: HashMap<(EventDescriptor, String), f32>,
    failing_events: HashSet<EventDescriptor>,
    created: usize,
    released: usize,
}

struct SimInstance {
    event: EventDescriptor,
    state: PlaybackState,
    remaining: f32,
    attributes: SpatialAttributes,
    callback: Option<CompletionCallback>,
    starts: u32,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                next_handle: 1,
                instances: BTreeMap::new(),
                clip_lengths: HashMap::new(),
                default_clip_length: 1.0,
                fade_out: 0.0,
                parameters: HashMap::new(),
                failing_events: HashSet::new(),
                created: 0,
                released: 0,
            }),
        }
    }

    /// Sets how long one clip of `event` plays, in seconds.
    pub fn with_clip_length(self, event: EventDescriptor, seconds: f32) -> Self {
        self.state.lock().clip_lengths.insert(event, seconds);
        self
    }

    /// Clip length for events without an explicit one.
    pub fn with_default_clip_length(self, seconds: f32) -> Self {
        self.state.lock().default_clip_length = seconds;
        self
    }

    /// Fade-out applied by [`StopMode::AllowFadeOut`]. Zero stops at once.
    pub fn with_fade_out(self, seconds: f32) -> Self {
        self.state.lock().fade_out = seconds;
        self
    }

    /// Bakes a parameter value into `event`.
    pub fn with_parameter(self, event: EventDescriptor, name: &str, value: f32) -> Self {
        self.state
            .lock()
            .parameters
            .insert((event, name.to_string()), value);
        self
    }

    /// Makes every `create_instance` call for `event` fail.
    pub fn with_failing_event(self, event: EventDescriptor) -> Self {
        self.state.lock().failing_events.insert(event);
        self
    }

    /// Advances every playing or fading instance by `dt` seconds and fires the
    /// completion callbacks of those that stopped, in handle order.
    ///
    /// Returns the number of instances that stopped.
    pub fn advance(&self, dt: f32) -> usize {
        let mut fired = Vec::new();
        {
            let mut state = self.state.lock();
            for (handle, instance) in state.instances.iter_mut() {
                let running = matches!(
                    instance.state,
                    PlaybackState::Playing | PlaybackState::Starting | PlaybackState::Stopping
                );
                if !running {
                    continue;
                }
                instance.remaining -= dt;
                if instance.remaining <= 0.0 {
                    instance.state = PlaybackState::Stopped;
                    instance.remaining = 0.0;
                    fired.push((*handle, instance.callback.clone()));
                }
            }
        }

        let count = fired.len();
        for (handle, callback) in fired {
            log::debug!("Simulated engine: {} stopped", handle);
            if let Some(callback) = callback {
                callback(handle);
            }
        }
        count
    }

    /// Stops `handle` as if its clip had just ended.
    pub fn complete_now(&self, handle: InstanceHandle) -> Result<()> {
        let callback = {
            let mut state = self.state.lock();
            let instance = state
                .instances
                .get_mut(&handle)
                .ok_or(BirdsongError::InvalidHandle(handle))?;
            if instance.state == PlaybackState::Stopped {
                return Ok(());
            }
            instance.state = PlaybackState::Stopped;
            instance.remaining = 0.0;
            instance.callback.clone()
        };
        if let Some(callback) = callback {
            callback(handle);
        }
        Ok(())
    }

    /// Forgets `handle` without going through `release`, like an engine that
    /// reclaimed the instance on its own.
    pub fn invalidate(&self, handle: InstanceHandle) {
        self.state.lock().instances.remove(&handle);
    }

    pub fn live_instances(&self) -> usize {
        self.state.lock().instances.len()
    }

    pub fn playing_instances(&self) -> usize {
        self.state
            .lock()
            .instances
            .values()
            .filter(|instance| instance.state.is_playing())
            .count()
    }

    pub fn created_count(&self) -> usize {
        self.state.lock().created
    }

    pub fn released_count(&self) -> usize {
        self.state.lock().released
    }

    pub fn event_of(&self, handle: InstanceHandle) -> Option<EventDescriptor> {
        self.state
            .lock()
            .instances
            .get(&handle)
            .map(|instance| instance.event.clone())
    }

    pub fn attributes_of(&self, handle: InstanceHandle) -> Option<SpatialAttributes> {
        self.state
            .lock()
            .instances
            .get(&handle)
            .map(|instance| instance.attributes)
    }

    pub fn start_count(&self, handle: InstanceHandle) -> u32 {
        self.state
            .lock()
            .instances
            .get(&handle)
            .map_or(0, |instance| instance.starts)
    }

    pub fn has_callback(&self, handle: InstanceHandle) -> bool {
        self.state
            .lock()
            .instances
            .get(&handle)
            .is_some_and(|instance| instance.callback.is_some())
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for SimulatedEngine {
    fn create_instance(&self, event: &EventDescriptor) -> Result<InstanceHandle> {
        let mut state = self.state.lock();
        if state.failing_events.contains(event) {
            return Err(BirdsongError::Engine(format!(
                "Event {} could not be instantiated",
                event
            )));
        }

        let handle = InstanceHandle::new(state.next_handle);
        state.next_handle += 1;
        state.created += 1;
        state.instances.insert(
            handle,
            SimInstance {
                event: event.clone(),
                state: PlaybackState::Stopped,
                remaining: 0.0,
                attributes: SpatialAttributes::default(),
                callback: None,
                starts: 0,
            },
        );
        Ok(handle)
    }

    fn start(&self, handle: InstanceHandle) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let instance = state
            .instances
            .get_mut(&handle)
            .ok_or(BirdsongError::InvalidHandle(handle))?;
        let length = state
            .clip_lengths
            .get(&instance.event)
            .copied()
            .unwrap_or(state.default_clip_length);

        instance.state = PlaybackState::Playing;
        instance.remaining = length;
        instance.starts += 1;
        Ok(())
    }

    fn stop(&self, handle: InstanceHandle, mode: StopMode) -> Result<()> {
        let callback = {
            let mut state = self.state.lock();
            let fade_out = state.fade_out;
            let instance = state
                .instances
                .get_mut(&handle)
                .ok_or(BirdsongError::InvalidHandle(handle))?;

            match (instance.state, mode) {
                (PlaybackState::Stopped, _) => return Ok(()),
                (PlaybackState::Stopping, StopMode::AllowFadeOut) => return Ok(()),
                (_, StopMode::AllowFadeOut) if fade_out > 0.0 => {
                    instance.state = PlaybackState::Stopping;
                    instance.remaining = fade_out;
                    return Ok(());
                }
                _ => {
                    instance.state = PlaybackState::Stopped;
                    instance.remaining = 0.0;
                    instance.callback.clone()
                }
            }
        };

        if let Some(callback) = callback {
            callback(handle);
        }
        Ok(())
    }

    fn release(&self, handle: InstanceHandle) -> Result<()> {
        let mut state = self.state.lock();
        state
            .instances
            .remove(&handle)
            .ok_or(BirdsongError::InvalidHandle(handle))?;
        state.released += 1;
        Ok(())
    }

    fn playback_state(&self, handle: InstanceHandle) -> Result<PlaybackState> {
        self.state
            .lock()
            .instances
            .get(&handle)
            .map(|instance| instance.state)
            .ok_or(BirdsongError::InvalidHandle(handle))
    }

    fn set_3d_attributes(
        &self,
        handle: InstanceHandle,
        attributes: SpatialAttributes,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let instance = state
            .instances
            .get_mut(&handle)
            .ok_or(BirdsongError::InvalidHandle(handle))?;
        instance.attributes = attributes;
        Ok(())
    }

    fn set_completion_callback(
        &self,
        handle: InstanceHandle,
        callback: Option<CompletionCallback>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let instance = state
            .instances
            .get_mut(&handle)
            .ok_or(BirdsongError::InvalidHandle(handle))?;
        instance.callback = callback;
        Ok(())
    }

    fn query_baked_parameter(&self, event: &EventDescriptor, name: &str) -> Result<f32> {
        self.state
            .lock()
            .parameters
            .get(&(event.clone(), name.to_string()))
            .copied()
            .ok_or_else(|| {
                BirdsongError::Engine(format!("Event {} has no parameter {}", event, name))
            })
    }

    fn is_valid(&self, handle: InstanceHandle) -> bool {
        self.state.lock().instances.contains_key(&handle)
    }
}
