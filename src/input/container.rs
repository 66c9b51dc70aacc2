//! Code for reading and writing models as a single self-describing JSON container.
use super::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

/// Read a model from a container file
pub fn read_container(file_path: &Path) -> Result<Network> {
    let file = File::open(file_path).with_context(|| input_err_msg(file_path))?;
    let network =
        serde_json::from_reader(BufReader::new(file)).with_context(|| input_err_msg(file_path))?;

    Ok(network)
}

/// Write a model to a container file
pub fn write_container(network: &Network, file_path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(file_path)?);
    serde_json::to_writer(&mut writer, network)?;
    writer.flush()?;

    Ok(())
}
