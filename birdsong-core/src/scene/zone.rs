//! Zone identifiers and the zone catalog.

use super::species::{SpeciesCatalog, SpeciesId};
use super::tables::ZoneDef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of a zone, e.g. `Park` or `CityArea`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only lookup from zone to the species allowed in it.
#[derive(Debug, Clone, Default)]
pub struct ZoneCatalog {
    zones: HashMap<ZoneId, Vec<SpeciesId>>,
}

impl ZoneCatalog {
    pub fn new() -> Self {
        Self {
            zones: HashMap::new(),
        }
    }

    pub fn from_defs(defs: &[ZoneDef]) -> Self {
        let mut catalog = Self::new();
        for def in defs {
            catalog.insert(def.name.clone(), def.species.clone());
        }
        catalog
    }

    /// Sets the species of a zone. Duplicate species are dropped, keeping the
    /// first occurrence so uniform picks stay uniform.
    pub fn insert(&mut self, zone: ZoneId, species: Vec<SpeciesId>) {
        let mut unique: Vec<SpeciesId> = Vec::with_capacity(species.len());
        for id in species {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if self.zones.insert(zone.clone(), unique).is_some() {
            log::warn!("Zone {} defined twice, keeping the last definition", zone);
        }
    }

    /// Returns the species eligible in `zone`; an unknown zone has none.
    pub fn species_for_zone(&self, zone: &ZoneId) -> &[SpeciesId] {
        match self.zones.get(zone) {
            Some(species) => species.as_slice(),
            None => {
                log::warn!("Could not find zone: {}", zone);
                &[]
            }
        }
    }

    pub fn contains(&self, zone: &ZoneId) -> bool {
        self.zones.contains_key(zone)
    }

    /// Lists every (zone, species) pair whose species the catalog does not know.
    pub fn missing_species(&self, species: &SpeciesCatalog) -> Vec<(ZoneId, SpeciesId)> {
        let mut missing: Vec<_> = self
            .zones
            .iter()
            .flat_map(|(zone, ids)| {
                ids.iter()
                    .filter(|id| !species.contains(id))
                    .map(move |id| (zone.clone(), id.clone()))
            })
            .collect();
        missing.sort();
        missing
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ZoneId, &[SpeciesId])> {
        self.zones.iter().map(|(zone, ids)| (zone, ids.as_slice()))
    }
}
