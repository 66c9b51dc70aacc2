//! Common functionality for store2hydro.
#![warn(missing_docs)]
use std::path::PathBuf;

/// Define a function returning the default value of a configuration parameter
macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

pub mod cli;
pub mod finance;
pub mod id;
pub mod input;
pub mod log;
pub mod network;
pub mod output;
pub mod pipeline;
pub mod scenario;
pub mod settings;
pub mod solver;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory in which program-wide configuration files (e.g. settings) are stored
pub fn get_store2hydro_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config folder on this platform; fall back on the working directory
        return PathBuf::from(".store2hydro");
    };

    config_dir.push("store2hydro");
    config_dir
}
