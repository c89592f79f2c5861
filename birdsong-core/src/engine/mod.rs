//! Audio engine seam.
//!
//! Birdsong never renders audio itself. Everything it needs from the audio
//! middleware is expressed by the [`AudioEngine`] trait: creating event
//! instances, starting and stopping them, positioning them, and being told when
//! they stop. Integrations implement the trait over their middleware of choice;
//! [`SimulatedEngine`] is a deterministic in-process implementation used by the
//! tests and the demo.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`. Completion callbacks may be invoked
//! from any thread, including an engine-internal one, and must not be assumed
//! to run on the thread that ticks the scheduler.

mod simulated;

pub use simulated::SimulatedEngine;

use crate::error::Result;
use crate::math::SpatialAttributes;
use crate::playback::{EventDescriptor, InstanceHandle, PlaybackState, StopMode};
use std::sync::Arc;

/// Callback invoked by the engine when an instance stops, for any reason.
///
/// The callback receives the handle of the instance that stopped. It runs on
/// the engine's thread and must only hand work off, never block.
pub type CompletionCallback = Arc<dyn Fn(InstanceHandle) + Send + Sync>;

/// Operations Birdsong consumes from the audio middleware.
///
/// Every operation on a handle reports [`BirdsongError::InvalidHandle`](crate::BirdsongError::InvalidHandle)
/// once the engine no longer knows the handle; callers treat that as a no-op
/// plus a log line, never as fatal.
pub trait AudioEngine: Send + Sync {
    /// Creates a new, stopped instance of `event`.
    fn create_instance(&self, event: &EventDescriptor) -> Result<InstanceHandle>;

    /// Starts (or restarts) an instance from the beginning.
    fn start(&self, handle: InstanceHandle) -> Result<()>;

    /// Stops an instance. Stopping an already stopped instance is a no-op.
    fn stop(&self, handle: InstanceHandle, mode: StopMode) -> Result<()>;

    /// Frees an instance. The handle is invalid afterwards.
    fn release(&self, handle: InstanceHandle) -> Result<()>;

    fn playback_state(&self, handle: InstanceHandle) -> Result<PlaybackState>;

    fn set_3d_attributes(&self, handle: InstanceHandle, attributes: SpatialAttributes)
    -> Result<()>;

    /// Attaches (`Some`) or detaches (`None`) the stop notification of an instance.
    fn set_completion_callback(
        &self,
        handle: InstanceHandle,
        callback: Option<CompletionCallback>,
    ) -> Result<()>;

    /// Reads a parameter baked into the event asset, e.g. its clip count.
    fn query_baked_parameter(&self, event: &EventDescriptor, name: &str) -> Result<f32>;

    fn is_valid(&self, handle: InstanceHandle) -> bool;
}
