//! Per-snapshot time series attached to components.
use super::registry::{Component, ComponentMap};
use crate::id::IDLike;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// One time-series attribute for a set of components (e.g. `loads-p_set`).
///
/// Each column holds one value per snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = ""))]
pub struct SeriesTable<ID: IDLike>(IndexMap<ID, Vec<f64>>);

impl<ID: IDLike> Default for SeriesTable<ID> {
    fn default() -> Self {
        Self(IndexMap::new())
    }
}

impl<ID: IDLike> SeriesTable<ID> {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The series for a component, if any
    pub fn get(&self, id: &str) -> Option<&[f64]> {
        self.0.get(id).map(Vec::as_slice)
    }

    /// Whether a component has a series in this table
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Insert or replace the series for a component
    pub fn insert(&mut self, id: ID, values: Vec<f64>) -> Option<Vec<f64>> {
        self.0.insert(id, values)
    }

    /// Remove the series for a component
    pub fn remove(&mut self, id: &str) -> Option<Vec<f64>> {
        self.0.shift_remove(id)
    }

    /// Iterate over `(component, series)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&ID, &Vec<f64>)> {
        self.0.iter()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no columns
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Multiply the series for one component by a factor. Returns false if there is no series.
    pub fn scale(&mut self, id: &str, factor: f64) -> bool {
        let Some(values) = self.0.get_mut(id) else {
            return false;
        };
        for value in values.iter_mut() {
            *value *= factor;
        }
        true
    }

    /// The sum over all snapshots for one component
    pub fn total(&self, id: &str) -> Option<f64> {
        self.get(id).map(|values| values.iter().sum())
    }

    /// Keep only the first `len` snapshots of every series
    pub fn truncate(&mut self, len: usize) {
        for values in self.0.values_mut() {
            values.truncate(len);
        }
    }

    /// Check that every series refers to a known component and has one value per snapshot
    pub fn validate<T>(
        &self,
        name: &str,
        components: &ComponentMap<T>,
        snapshots: usize,
    ) -> Result<()>
    where
        T: Component<ID = ID>,
    {
        for (id, values) in &self.0 {
            ensure!(
                components.contains(<ID as Borrow<str>>::borrow(id)),
                "Series {name} refers to unknown {} '{id}'",
                T::KIND
            );
            ensure!(
                values.len() == snapshots,
                "Series {name} for '{id}' has {} values but there are {snapshots} snapshots",
                values.len()
            );
            ensure!(
                values.iter().all(|value| value.is_finite()),
                "Series {name} for '{id}' contains non-finite values"
            );
        }

        Ok(())
    }
}

impl<ID: IDLike> FromIterator<(ID, Vec<f64>)> for SeriesTable<ID> {
    fn from_iter<I: IntoIterator<Item = (ID, Vec<f64>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
