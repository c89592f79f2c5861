//! Serialized scene description.

use super::species::SpeciesId;
use super::zone::ZoneId;
use crate::config::EmitterConfig;
use crate::error::Result;
use crate::playback::EventDescriptor;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A species as written in the scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDef {
    pub name: SpeciesId,
    pub event: EventDescriptor,
    /// Used only when the engine cannot report the event's baked clip count
    #[serde(default)]
    pub total_clips: Option<u32>,
}

/// A zone as written in the scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDef {
    pub name: ZoneId,
    #[serde(default)]
    pub species: Vec<SpeciesId>,
}

/// Everything an ambience world is built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneTables {
    #[serde(default)]
    pub species: Vec<SpeciesDef>,
    #[serde(default)]
    pub zones: Vec<ZoneDef>,
    #[serde(default)]
    pub emitters: Vec<EmitterConfig>,
}

impl SceneTables {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BirdsongError;

    const SCENE: &str = r#"{
        "species": [
            { "name": "EaredDove", "event": "event:/Birds/EaredDove", "total_clips": 3 },
            { "name": "GreatThrush", "event": "event:/Birds/GreatThrush" }
        ],
        "zones": [
            { "name": "Park", "species": ["EaredDove", "GreatThrush"] }
        ],
        "emitters": [
            { "zone": "Park", "position": [4.0, 1.5, -2.0], "initial_species": "EaredDove" }
        ]
    }"#;

    #[test]
    fn test_parse_scene() {
        let tables = SceneTables::from_json_str(SCENE).unwrap();
        assert_eq!(tables.species.len(), 2);
        assert_eq!(tables.species[0].total_clips, Some(3));
        assert_eq!(tables.species[1].total_clips, None);
        assert_eq!(tables.zones[0].species.len(), 2);
        assert_eq!(tables.emitters.len(), 1);
        assert_eq!(
            tables.emitters[0].initial_species,
            Some(SpeciesId::new("EaredDove"))
        );
    }

    #[test]
    fn test_json_round_trip_preserves_tables() {
        let tables = SceneTables::from_json_str(SCENE).unwrap();
        let json = tables.to_json_string().unwrap();
        assert_eq!(SceneTables::from_json_str(&json).unwrap(), tables);
    }

    #[test]
    fn test_malformed_scene_is_a_catalog_error() {
        let err = SceneTables::from_json_str("{ \"zones\": 3 }").unwrap_err();
        assert!(matches!(err, BirdsongError::Catalog(_)));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = SceneTables::from_path("does/not/exist.json").unwrap_err();
        assert!(matches!(err, BirdsongError::Io(_)));
    }
}
