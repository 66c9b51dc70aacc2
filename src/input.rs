//! Common routines for handling input data.
use crate::network::Network;
use crate::network::registry::{Component, ComponentMap};
use anyhow::{Context, Result, bail};
use serde::de::{DeserializeOwned, Deserializer, Visitor};
use std::fmt;
use std::fs;
use std::path::Path;

pub mod container;
pub mod csv_folder;

/// Read a series of type `T`s from a CSV file.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = read_csv_internal(file_path)
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Read a series of type `T`s from a CSV file, returning an empty `Vec` if the file is absent
pub fn read_csv_optional<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    if !file_path.exists() {
        return Ok(Vec::new());
    }

    read_csv(file_path)
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(file_path)?;
    let mut vec = Vec::new();
    for result in reader.deserialize() {
        vec.push(result?);
    }

    Ok(vec)
}

/// Read a component table from a CSV file, if present.
///
/// Component names must be unique within the file.
pub fn read_components<T>(file_path: &Path) -> Result<ComponentMap<T>>
where
    T: Component + DeserializeOwned,
{
    let mut map = ComponentMap::new();
    for component in read_csv_optional::<T>(file_path)? {
        map.try_insert(component)
            .with_context(|| input_err_msg(file_path))?;
    }

    Ok(map)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

struct BoolVisitor;

impl Visitor<'_> for BoolVisitor {
    type Value = bool;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a boolean (true/false, True/False or 1/0)")
    }

    fn visit_bool<E: serde::de::Error>(self, value: bool) -> Result<bool, E> {
        Ok(value)
    }

    fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<bool, E> {
        match value {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::custom(format!("Invalid boolean value: {value}"))),
        }
    }

    fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<bool, E> {
        match value {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(E::custom(format!("Invalid boolean value: {value}"))),
        }
    }

    fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<bool, E> {
        match value.trim() {
            "" | "0" | "false" | "False" | "FALSE" => Ok(false),
            "1" | "true" | "True" | "TRUE" => Ok(true),
            other => Err(E::custom(format!("Invalid boolean value: {other}"))),
        }
    }
}

/// Read a boolean, accepting the spellings used by pandas-written CSV files (`True`/`False`)
pub fn deserialise_bool<'de, D>(deserialiser: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    deserialiser.deserialize_any(BoolVisitor)
}

struct LimitVisitor;

impl Visitor<'_> for LimitVisitor {
    type Value = f64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number, `inf` or an empty value")
    }

    fn visit_f64<E: serde::de::Error>(self, value: f64) -> Result<f64, E> {
        Ok(value)
    }

    fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<f64, E> {
        Ok(value as f64)
    }

    fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<f64, E> {
        Ok(value as f64)
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<f64, E> {
        Ok(f64::INFINITY)
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<f64, E> {
        Ok(f64::INFINITY)
    }

    fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<f64, E> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(f64::INFINITY);
        }
        value
            .parse()
            .map_err(|_| E::custom(format!("Invalid number: {value}")))
    }
}

/// Read an upper capacity limit, where a missing value (or JSON `null`) means unlimited
pub fn deserialise_limit<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    deserialiser.deserialize_any(LimitVisitor)
}

/// Load a grid model from a container file or a CSV folder and check its consistency.
///
/// # Arguments
///
/// * `path` - Path to a container file or a folder of CSV tables
///
/// # Returns
///
/// The loaded model or an error.
pub fn load_network(path: &Path) -> Result<Network> {
    let network = if path.is_file() {
        container::read_container(path)?
    } else if path.is_dir() {
        csv_folder::read_csv_folder(path)?
    } else {
        bail!("Model not found: {}", path.display());
    };

    network
        .validate()
        .with_context(|| format!("Invalid model: {}", path.display()))?;

    Ok(network)
}
