use crate::error::{BirdsongError, Result};
use crate::math::Vec3;
use crate::scene::{SpeciesId, ZoneId};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Closed interval of seconds that waits are sampled from uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondsRange {
    pub min: f32,
    pub max: f32,
}

impl SecondsRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Samples a duration in `[min, max]`. A degenerate range yields `min`,
    /// and a non-finite `min` yields zero.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if !self.min.is_finite() {
            0.0
        } else if self.max <= self.min || !(self.max - self.min).is_finite() {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(BirdsongError::Configuration(format!(
                "{} range must be finite",
                name
            )));
        }
        if self.min < 0.0 {
            return Err(BirdsongError::Configuration(format!(
                "{} range must not be negative",
                name
            )));
        }
        if self.min > self.max {
            return Err(BirdsongError::Configuration(format!(
                "{} range minimum {} exceeds maximum {}",
                name, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Per-emitter scheduling configuration.
///
/// Defaults favour sparse ambience: up to 30 s between clips, and a coin flip
/// at the end of every clip set between a long silence and switching species.
///
/// # Example
///
/// ```
/// use birdsong_core::config::EmitterConfig;
/// use birdsong_core::math::Vec3;
/// use birdsong_core::scene::{SpeciesId, ZoneId};
///
/// let config = EmitterConfig::new(ZoneId::new("Park"))
///     .at(Vec3::new(12.0, 3.0, -4.0))
///     .delay(2.0, 8.0)
///     .silence_chance(0.25)
///     .initial_species(SpeciesId::new("EaredDove"));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Zone the emitter draws its eligible species from
    pub zone: ZoneId,
    /// World position applied to every instance the emitter starts
    pub position: Vec3,
    /// Wait between clips of one species, and before retrying a busy emitter
    pub delay: SecondsRange,
    /// Length of silences, initial and between clip sets
    pub silence: SecondsRange,
    /// Probability of a silence when a clip set ends (and at startup)
    pub silence_chance: f32,
    /// Probability of switching species when a clip set ends
    pub switch_species_chance: f32,
    /// Species played first, if it is eligible in the zone
    pub initial_species: Option<SpeciesId>,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            zone: ZoneId::default(),
            position: Vec3::ZERO,
            delay: SecondsRange::new(0.0, 30.0),
            silence: SecondsRange::new(30.0, 180.0),
            silence_chance: 0.5,
            switch_species_chance: 0.5,
            initial_species: None,
        }
    }
}

impl EmitterConfig {
    pub fn new(zone: ZoneId) -> Self {
        Self {
            zone,
            ..Default::default()
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn delay(mut self, min: f32, max: f32) -> Self {
        self.delay = SecondsRange::new(min, max);
        self
    }

    pub fn silence(mut self, min: f32, max: f32) -> Self {
        self.silence = SecondsRange::new(min, max);
        self
    }

    pub fn silence_chance(mut self, chance: f32) -> Self {
        self.silence_chance = chance;
        self
    }

    pub fn switch_species_chance(mut self, chance: f32) -> Self {
        self.switch_species_chance = chance;
        self
    }

    pub fn initial_species(mut self, species: SpeciesId) -> Self {
        self.initial_species = Some(species);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.zone.as_str().is_empty() {
            return Err(BirdsongError::Configuration(
                "Emitter has no zone assigned".into(),
            ));
        }
        self.delay.validate("Delay")?;
        self.silence.validate("Silence")?;

        for (name, chance) in [
            ("Silence chance", self.silence_chance),
            ("Switch species chance", self.switch_species_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(BirdsongError::Configuration(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, chance
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_range_sample_stays_inside() {
        let range = SecondsRange::new(2.0, 5.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let value = range.sample(&mut rng);
            assert!((2.0..=5.0).contains(&value));
        }
    }

    #[test]
    fn test_degenerate_range_yields_min() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(SecondsRange::new(3.0, 3.0).sample(&mut rng), 3.0);
        assert_eq!(SecondsRange::new(0.0, 0.0).sample(&mut rng), 0.0);
    }

    #[test]
    fn test_non_finite_range_does_not_sample() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(SecondsRange::new(2.0, f32::INFINITY).sample(&mut rng), 2.0);
        assert_eq!(SecondsRange::new(1.0, f32::NAN).sample(&mut rng), 1.0);
        assert_eq!(SecondsRange::new(f32::NAN, f32::NAN).sample(&mut rng), 0.0);
        assert_eq!(SecondsRange::new(f32::NEG_INFINITY, 4.0).sample(&mut rng), 0.0);
        assert_eq!(SecondsRange::new(-f32::MAX, f32::MAX).sample(&mut rng), -f32::MAX);
    }

    #[test]
    fn test_validation() {
        assert!(EmitterConfig::new(ZoneId::new("Park")).validate().is_ok());
        assert!(EmitterConfig::default().validate().is_err());
        assert!(
            EmitterConfig::new(ZoneId::new("Park"))
                .delay(5.0, 1.0)
                .validate()
                .is_err()
        );
        assert!(
            EmitterConfig::new(ZoneId::new("Park"))
                .silence(-1.0, 1.0)
                .validate()
                .is_err()
        );
        assert!(
            EmitterConfig::new(ZoneId::new("Park"))
                .silence_chance(1.5)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: EmitterConfig =
            serde_json::from_str(r#"{ "zone": "Park", "position": [1.0, 0.0, 2.0] }"#).unwrap();
        assert_eq!(config.zone, ZoneId::new("Park"));
        assert_eq!(config.position, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(config.delay, SecondsRange::new(0.0, 30.0));
        assert_eq!(config.silence_chance, 0.5);
        assert_eq!(config.initial_species, None);
    }
}
