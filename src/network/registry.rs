//! A named-entity registry holding one component table.
use crate::id::{HasID, IDLike};
use anyhow::{Result, bail};
use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// A component which lives in a [`ComponentMap`]
pub trait Component: HasID<Self::ID> {
    /// The type of the component's ID
    type ID: IDLike;

    /// The name of the component type, as used in messages (e.g. `StorageUnit`)
    const KIND: &'static str;
}

/// A component table, keyed by component name.
///
/// Entries are kept in insertion order. Inserting a component whose name is already taken is an
/// error; use [`ComponentMap::upsert`] when overwriting is intended.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentMap<T: Component>(IndexMap<T::ID, T>);

impl<T: Component> Default for ComponentMap<T> {
    fn default() -> Self {
        Self(IndexMap::new())
    }
}

impl<T: Component> ComponentMap<T> {
    /// Create a new, empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new component, failing if the name is already in use
    pub fn try_insert(&mut self, component: T) -> Result<()> {
        let id = component.get_id().clone();
        if self.0.contains_key(&id) {
            bail!("{} '{}' already exists", T::KIND, id);
        }

        self.0.insert(id, component);
        Ok(())
    }

    /// Insert a component, replacing (and returning) any existing entry of the same name
    pub fn upsert(&mut self, component: T) -> Option<T> {
        let id = component.get_id().clone();
        self.0.insert(id, component)
    }

    /// Remove a component, preserving the order of the others
    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.0.shift_remove(id)
    }

    /// Look up a component by name
    pub fn get(&self, id: &str) -> Option<&T> {
        self.0.get(id)
    }

    /// Look up a component by name for modification
    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.0.get_mut(id)
    }

    /// Whether a component of the given name exists
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Position of a component in insertion order
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.0.get_index_of(id)
    }

    /// Iterate over component names
    pub fn ids(&self) -> impl Iterator<Item = &T::ID> {
        self.0.keys()
    }

    /// Iterate over components
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.values()
    }

    /// Iterate over components for modification
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.0.values_mut()
    }

    /// Number of components in the table
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Component> FromIterator<T> for ComponentMap<T> {
    /// Collect components into a table. Later duplicates overwrite earlier ones.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut map = Self::new();
        for component in iter {
            map.upsert(component);
        }
        map
    }
}

impl<T: Component + Serialize> Serialize for ComponentMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.values())
    }
}

impl<'de, T: Component + Deserialize<'de>> Deserialize<'de> for ComponentMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let components = Vec::<T>::deserialize(deserializer)?;
        let mut map = Self::new();
        for component in components {
            map.try_insert(component)
                .map_err(serde::de::Error::custom)?;
        }
        Ok(map)
    }
}
