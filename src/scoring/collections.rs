//! Hits collections and per-event deposits
//!
//! Collections are registered by name once, after the geometry is built, and
//! referenced by numeric id while events run.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::geometry::ArrayGeometry;

pub use crate::geometry::{CRYSTAL_COLLECTION, SHIELD_COLLECTION};

/// Copy number to summed deposit (engine energy unit, MeV)
pub type DepositMap = BTreeMap<u32, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionId(pub usize);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionRegistry {
    names: Vec<String>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collections the geometry attached scorers for
    pub fn from_geometry(geometry: &ArrayGeometry) -> Self {
        let mut registry = Self::new();
        for name in geometry.collections() {
            registry.register(name);
        }
        registry
    }

    /// Register `name`, returning the existing id when already known
    pub fn register(&mut self, name: &str) -> CollectionId {
        match self.names.iter().position(|n| n == name) {
            Some(i) => CollectionId(i),
            None => {
                self.names.push(name.to_string());
                CollectionId(self.names.len() - 1)
            }
        }
    }

    pub fn id(&self, name: &str) -> Result<CollectionId> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(CollectionId)
            .ok_or_else(|| Error::MissingCollection(name.to_string()))
    }

}

/// Deposits of one event, per collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventHits {
    pub event_id: u64,
    maps: BTreeMap<CollectionId, DepositMap>,
}

impl EventHits {
    pub fn new(event_id: u64) -> Self {
        Self {
            event_id,
            maps: BTreeMap::new(),
        }
    }

    /// Add a deposit, summing with earlier deposits in the same volume
    pub fn deposit(&mut self, collection: CollectionId, copy_number: u32, energy: f64) {
        *self
            .maps
            .entry(collection)
            .or_default()
            .entry(copy_number)
            .or_insert(0.0) += energy;
    }

    /// Make sure `collection` exists for this event, even without deposits
    pub fn open(&mut self, collection: CollectionId) {
        self.maps.entry(collection).or_default();
    }

    pub fn get(&self, collection: CollectionId) -> Option<&DepositMap> {
        self.maps.get(&collection)
    }
}
