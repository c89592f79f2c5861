//! Static scene tables: which species exist and where they may sing.
//!
//! Both catalogs are built once, before any emitter runs, and are read-only
//! afterwards. Lookups never fail hard: an unknown species has no event and
//! zero clips, an unknown zone has no species, and every miss is logged.
//!
//! # Workflow
//!
//! 1. Describe species, zones and emitters in [`SceneTables`] (usually JSON)
//! 2. Build a [`SpeciesCatalog`], querying each event's baked clip count once
//! 3. Build a [`ZoneCatalog`] from the zone definitions
//!
//! # Example
//!
//! ```
//! use birdsong_core::engine::SimulatedEngine;
//! use birdsong_core::playback::EventDescriptor;
//! use birdsong_core::scene::{SceneTables, SpeciesCatalog, SpeciesId, ZoneCatalog, ZoneId};
//!
//! let tables = SceneTables::from_json_str(r#"{
//!     "species": [{ "name": "EaredDove", "event": "event:/Birds/EaredDove" }],
//!     "zones": [{ "name": "Park", "species": ["EaredDove"] }]
//! }"#)?;
//!
//! let engine = SimulatedEngine::new()
//!     .with_parameter(EventDescriptor::new("event:/Birds/EaredDove"), "TotalClips", 4.0);
//! let species = SpeciesCatalog::build(&engine, &tables.species, "TotalClips");
//! let zones = ZoneCatalog::from_defs(&tables.zones);
//!
//! assert_eq!(species.total_clips(&SpeciesId::new("EaredDove")), 4);
//! assert_eq!(zones.species_for_zone(&ZoneId::new("Park")).len(), 1);
//! # Ok::<(), birdsong_core::BirdsongError>(())
//! ```

pub mod species;
pub mod tables;
pub mod zone;

pub use species::{SpeciesCatalog, SpeciesEntry, SpeciesId};
pub use tables::{SceneTables, SpeciesDef, ZoneDef};
pub use zone::{ZoneCatalog, ZoneId};
