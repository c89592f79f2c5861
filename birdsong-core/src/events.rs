//! Event types for Birdsong

use crate::playback::InstanceHandle;
use crate::scene::SpeciesId;
use crate::scheduler::{EmitterId, EmitterState, SetOutcome};

/// Observable scheduler transitions, collected by the world and drained with
/// [`AmbienceWorld::poll_events`](crate::world::AmbienceWorld::poll_events).
#[derive(Debug, Clone, PartialEq)]
pub enum AmbienceEvent {
    StateChanged {
        emitter: EmitterId,
        from: EmitterState,
        to: EmitterState,
    },
    CycleStarted {
        emitter: EmitterId,
        species: SpeciesId,
        total_clips: u32,
    },
    ClipStarted {
        emitter: EmitterId,
        species: SpeciesId,
        handle: InstanceHandle,
        clip: u32,
        total_clips: u32,
    },
    /// The emitter's previous instance was still playing; the next clip waits.
    PlaybackDeferred {
        emitter: EmitterId,
        handle: InstanceHandle,
        retry_in: f32,
    },
    SetCompleted {
        emitter: EmitterId,
        species: SpeciesId,
        outcome: SetOutcome,
    },
    InstanceCompleted {
        emitter: EmitterId,
        handle: InstanceHandle,
    },
    InteractionStopped {
        emitter: EmitterId,
        resume_in: f32,
    },
    PlaybackResumed {
        emitter: EmitterId,
        same_species: bool,
    },
    CycleAborted {
        emitter: EmitterId,
        reason: String,
    },
    InvalidHandle {
        emitter: EmitterId,
        handle: InstanceHandle,
    },
}

impl AmbienceEvent {
    pub fn emitter(&self) -> EmitterId {
        match self {
            Self::StateChanged { emitter, .. }
            | Self::CycleStarted { emitter, .. }
            | Self::ClipStarted { emitter, .. }
            | Self::PlaybackDeferred { emitter, .. }
            | Self::SetCompleted { emitter, .. }
            | Self::InstanceCompleted { emitter, .. }
            | Self::InteractionStopped { emitter, .. }
            | Self::PlaybackResumed { emitter, .. }
            | Self::CycleAborted { emitter, .. }
            | Self::InvalidHandle { emitter, .. } => *emitter,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::CycleAborted { .. } | Self::InvalidHandle { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitter_and_error_classification() {
        let aborted = AmbienceEvent::CycleAborted {
            emitter: EmitterId::new(2),
            reason: "no event".to_string(),
        };
        let started = AmbienceEvent::CycleStarted {
            emitter: EmitterId::new(5),
            species: SpeciesId::new("CoolBird"),
            total_clips: 3,
        };

        assert_eq!(aborted.emitter(), EmitterId::new(2));
        assert!(aborted.is_error());
        assert_eq!(started.emitter(), EmitterId::new(5));
        assert!(!started.is_error());
    }
}
