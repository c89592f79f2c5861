use rand::Rng;

/// What an emitter does once it has played every clip of its species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOutcome {
    /// Fall silent for a sampled silence, then start a fresh cycle
    Silence,
    /// Start a fresh cycle with a newly picked species right away
    SwitchSpecies,
    /// Play the same species' clip set again after a sampled delay
    Continue,
}

impl SetOutcome {
    /// Maps one draw in `[0, 1)` onto the three bands, in order: silence
    /// below `silence_chance`, switch below `silence_chance +
    /// switch_species_chance`, continue otherwise.
    pub fn from_roll(roll: f32, silence_chance: f32, switch_species_chance: f32) -> Self {
        if roll < silence_chance {
            Self::Silence
        } else if roll < silence_chance + switch_species_chance {
            Self::SwitchSpecies
        } else {
            Self::Continue
        }
    }

    /// Draws once from `rng` and maps the draw with [`from_roll`](Self::from_roll).
    pub fn roll<R: Rng + ?Sized>(
        rng: &mut R,
        silence_chance: f32,
        switch_species_chance: f32,
    ) -> Self {
        Self::from_roll(rng.r#gen::<f32>(), silence_chance, switch_species_chance)
    }
}
