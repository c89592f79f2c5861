//! Playback handles and state.
//!
//! This module provides the small value types shared between the scheduler,
//! the pool and the audio engine:
//! - [`InstanceHandle`]: identity of one engine-side event instance
//! - [`EventDescriptor`]: the playable event an instance is created from
//! - [`PlaybackState`]: what the engine reports for an instance
//! - [`StopMode`]: how an instance should be stopped

use serde::{Deserialize, Serialize};

/// Lightweight, type-safe handle for engine event instances.
///
/// Handles are stable for the lifetime of the instance and are used as map keys
/// by the pool and the completion router.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceHandle(u64);

impl InstanceHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InstanceHandle({})", self.0)
    }
}

/// Reference to a playable event in the audio engine's asset bank,
/// e.g. `event:/Birds/EaredDove`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventDescriptor(String);

impl EventDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Playback state of an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Audible
    Playing,
    /// Held at a sustain point
    Sustaining,
    /// Start requested, not yet audible
    Starting,
    /// Fading out after a stop request
    Stopping,
    /// Silent; the instance may be started again
    Stopped,
}

impl PlaybackState {
    /// Returns true for every state in which starting another instance on the
    /// same emitter would overlap audibly.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing | Self::Sustaining | Self::Starting)
    }
}

/// How an instance should be stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMode {
    /// Let the event run its fade-out before stopping
    #[default]
    AllowFadeOut,
    /// Cut immediately
    Immediate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playing_states() {
        assert!(PlaybackState::Playing.is_playing());
        assert!(PlaybackState::Starting.is_playing());
        assert!(PlaybackState::Sustaining.is_playing());
        assert!(!PlaybackState::Stopping.is_playing());
        assert!(!PlaybackState::Stopped.is_playing());
    }

    #[test]
    fn test_descriptor_serde_is_transparent() {
        let desc: EventDescriptor = serde_json::from_str("\"event:/Birds/EaredDove\"").unwrap();
        assert_eq!(desc.path(), "event:/Birds/EaredDove");
        assert_eq!(serde_json::to_string(&desc).unwrap(), "\"event:/Birds/EaredDove\"");
    }
}
