//! Points of interest and the set of location names roads connect

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::geometry::WorldPoint;

use super::topology::PRIORITY_TABLE;

/// A placed location roads can lead to
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub name: String,
    pub position: WorldPoint,
    /// Roads stop at this distance from the position
    pub exterior_radius: f32,
}

impl PointOfInterest {
    pub fn new(name: impl Into<String>, position: WorldPoint, exterior_radius: f32) -> Self {
        Self {
            name: name.into(),
            position,
            exterior_radius,
        }
    }
}

/// Host-side location placement.
///
/// Locations are only valid once the host has finished placing them;
/// [`LocationSource::locations`] must not be called before
/// [`LocationSource::is_ready`] returns true.
pub trait LocationSource {
    fn is_ready(&self) -> bool;

    fn locations(&self) -> Vec<PointOfInterest>;
}

/// A fixed list of locations, ready from the start.
#[derive(Clone, Debug, Default)]
pub struct StaticLocations {
    pub locations: Vec<PointOfInterest>,
}

impl StaticLocations {
    pub fn new(locations: Vec<PointOfInterest>) -> Self {
        Self { locations }
    }
}

impl LocationSource for StaticLocations {
    fn is_ready(&self) -> bool {
        true
    }

    fn locations(&self) -> Vec<PointOfInterest> {
        self.locations.clone()
    }
}

/// Names of the locations a generation pass connects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocationRegistry {
    names: BTreeSet<String>,
}

impl LocationRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every name in the priority table plus `custom`.
    pub fn with_defaults<S: AsRef<str>>(custom: &[S]) -> Self {
        let mut registry = Self::empty();
        for (name, _) in PRIORITY_TABLE {
            registry.add(*name);
        }
        for name in custom {
            registry.add(name.as_ref());
        }
        registry
    }

    /// Returns false if the name was already registered.
    pub fn add(&mut self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }

    /// Returns false if the name was not registered.
    pub fn remove(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
