//! Error types for Birdsong

use crate::playback::InstanceHandle;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BirdsongError {
    #[error("Unknown species: {0}")]
    UnknownSpecies(String),

    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    #[error("Unknown emitter: {0}")]
    UnknownEmitter(usize),

    #[error("Invalid instance handle: {0}")]
    InvalidHandle(InstanceHandle),

    #[error("Instance pool is already initialized")]
    PoolAlreadyInitialized,

    #[error("Instance pool has been torn down")]
    PoolTornDown,

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BirdsongError>;
