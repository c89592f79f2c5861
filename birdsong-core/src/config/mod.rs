//! Configuration for Birdsong

mod emitter_config;
mod world_desc;

pub use emitter_config::{EmitterConfig, SecondsRange};
pub use world_desc::AmbienceWorldDesc;
