use crate::error::{BirdsongError, Result};
use std::time::Duration;

/// Configuration descriptor for an ambience world
#[derive(Debug, Clone)]
pub struct AmbienceWorldDesc {
    /// Instances created eagerly per species when the pool is built
    pub pool_size: usize,
    /// Cadence of the per-emitter eligibility poll
    pub poll_interval: Duration,
    /// Seed for every emitter's random source. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Name of the parameter baked into each species event that holds its clip count
    pub clip_count_parameter: String,
}

impl Default for AmbienceWorldDesc {
    fn default() -> Self {
        Self {
            pool_size: 10,
            poll_interval: Duration::from_millis(500),
            seed: None,
            clip_count_parameter: "TotalClips".to_string(),
        }
    }
}

impl AmbienceWorldDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn clip_count_parameter(mut self, name: impl Into<String>) -> Self {
        self.clip_count_parameter = name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(BirdsongError::Configuration(
                "Poll interval must be greater than zero".into(),
            ));
        }
        if self.clip_count_parameter.is_empty() {
            return Err(BirdsongError::Configuration(
                "Clip count parameter name must not be empty".into(),
            ));
        }
        Ok(())
    }
}
