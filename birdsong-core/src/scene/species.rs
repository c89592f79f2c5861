//! Species identifiers and the species catalog.

use super::tables::SpeciesDef;
use crate::engine::AudioEngine;
use crate::playback::EventDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of a species, e.g. `EaredDove` or `HouseSparrow_Calm`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesId(String);

impl SpeciesId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One catalog row: the event a species plays and how many clips it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesEntry {
    pub id: SpeciesId,
    pub event: EventDescriptor,
    /// Clips in the event's playlist. The event sequences the clips itself;
    /// the scheduler only counts them.
    pub total_clips: u32,
}

/// Read-only lookup from species to event and clip count.
#[derive(Debug, Clone, Default)]
pub struct SpeciesCatalog {
    entries: Vec<SpeciesEntry>,
    index: HashMap<SpeciesId, usize>,
}

impl SpeciesCatalog {
    /// Creates a new empty catalog
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Builds the catalog from definitions, querying the clip count baked into
    /// every event once.
    ///
    /// The baked value wins. If the engine cannot report it, the definition's
    /// declared `total_clips` is used, and failing that the species gets zero
    /// clips.
    pub fn build(engine: &dyn AudioEngine, defs: &[SpeciesDef], clip_parameter: &str) -> Self {
        let mut catalog = Self::new();
        for def in defs {
            let total_clips = match engine.query_baked_parameter(&def.event, clip_parameter) {
                Ok(value) => value.round().max(0.0) as u32,
                Err(e) => match def.total_clips {
                    Some(declared) => {
                        log::warn!(
                            "Could not query {} for species {} ({}), using declared {}",
                            clip_parameter,
                            def.name,
                            e,
                            declared
                        );
                        declared
                    }
                    None => {
                        log::warn!(
                            "Could not query {} for species {} ({}), species has no clips",
                            clip_parameter,
                            def.name,
                            e
                        );
                        0
                    }
                },
            };
            catalog.insert(def.name.clone(), def.event.clone(), total_clips);
        }
        log::info!("Species catalog built with {} species", catalog.len());
        catalog
    }

    /// Adds a species, replacing an existing entry with the same id.
    pub fn insert(&mut self, id: SpeciesId, event: EventDescriptor, total_clips: u32) {
        let entry = SpeciesEntry {
            id: id.clone(),
            event,
            total_clips,
        };
        match self.index.get(&id) {
            Some(&slot) => {
                log::warn!("Species {} defined twice, keeping the last definition", id);
                self.entries[slot] = entry;
            }
            None => {
                self.index.insert(id, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, id: &SpeciesId) -> Option<&SpeciesEntry> {
        self.index.get(id).map(|&slot| &self.entries[slot])
    }

    /// Returns the event for `id`, logging a miss.
    pub fn try_event_for_species(&self, id: &SpeciesId) -> Option<&EventDescriptor> {
        let event = self.get(id).map(|entry| &entry.event);
        if event.is_none() {
            log::warn!("Could not find event for species: {}", id);
        }
        event
    }

    /// Returns the clip count for `id`; unknown species have zero clips.
    pub fn total_clips(&self, id: &SpeciesId) -> u32 {
        match self.get(id) {
            Some(entry) => entry.total_clips,
            None => {
                log::warn!("Could not find species: {}", id);
                0
            }
        }
    }

    pub fn contains(&self, id: &SpeciesId) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the number of species in the catalog
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in definition order
    pub fn iter(&self) -> impl Iterator<Item = &SpeciesEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedEngine;

    fn def(name: &str, total_clips: Option<u32>) -> SpeciesDef {
        SpeciesDef {
            name: SpeciesId::new(name),
            event: EventDescriptor::new(format!("event:/Birds/{}", name)),
            total_clips,
        }
    }

    #[test]
    fn test_build_queries_baked_clip_count() {
        let engine = SimulatedEngine::new()
            .with_parameter(EventDescriptor::new("event:/Birds/EaredDove"), "TotalClips", 2.6)
            .with_parameter(EventDescriptor::new("event:/Birds/CoolBird"), "TotalClips", 5.0);
        let catalog = SpeciesCatalog::build(
            &engine,
            &[def("EaredDove", Some(9)), def("CoolBird", None)],
            "TotalClips",
        );

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.total_clips(&SpeciesId::new("EaredDove")), 3);
        assert_eq!(catalog.total_clips(&SpeciesId::new("CoolBird")), 5);
    }

    #[test]
    fn test_build_falls_back_to_declared_count() {
        let engine = SimulatedEngine::new();
        let catalog = SpeciesCatalog::build(
            &engine,
            &[def("GreatThrush", Some(4)), def("NighttimeBug", None)],
            "TotalClips",
        );

        assert_eq!(catalog.total_clips(&SpeciesId::new("GreatThrush")), 4);
        assert_eq!(catalog.total_clips(&SpeciesId::new("NighttimeBug")), 0);
    }

    #[test]
    fn test_lookup_miss_is_not_fatal() {
        let catalog = SpeciesCatalog::new();
        let unknown = SpeciesId::new("Dodo");
        assert!(catalog.try_event_for_species(&unknown).is_none());
        assert_eq!(catalog.total_clips(&unknown), 0);
    }

    #[test]
    fn test_insert_replaces_duplicate() {
        let mut catalog = SpeciesCatalog::new();
        let id = SpeciesId::new("NormalBird");
        catalog.insert(id.clone(), EventDescriptor::new("event:/a"), 1);
        catalog.insert(id.clone(), EventDescriptor::new("event:/b"), 2);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(&id).unwrap().event.path(), "event:/b");
        assert_eq!(catalog.total_clips(&id), 2);
    }
}
