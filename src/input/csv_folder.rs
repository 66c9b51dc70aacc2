//! Code for reading and writing models as folders of CSV tables.
//!
//! The layout follows PyPSA's CSV folder format: one file per component table (e.g.
//! `generators.csv`) and one file per time-series attribute, named `<table>-<attribute>.csv`, with
//! a `snapshot` column followed by one column per component.
use super::*;
use crate::id::IDLike;
use crate::network::series::SeriesTable;
use crate::network::Snapshot;
use anyhow::ensure;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::iter;

const NETWORK_FILE_NAME: &str = "network.csv";
const SNAPSHOTS_FILE_NAME: &str = "snapshots.csv";
const BUSES_FILE_NAME: &str = "buses.csv";
const CARRIERS_FILE_NAME: &str = "carriers.csv";
const GENERATORS_FILE_NAME: &str = "generators.csv";
const STORAGE_UNITS_FILE_NAME: &str = "storage_units.csv";
const LINKS_FILE_NAME: &str = "links.csv";
const LINES_FILE_NAME: &str = "lines.csv";
const LOADS_FILE_NAME: &str = "loads.csv";
const GLOBAL_CONSTRAINTS_FILE_NAME: &str = "global_constraints.csv";

/// The column holding snapshot labels in time-series files
const SNAPSHOT_COLUMN: &str = "snapshot";

/// Model-level attributes
#[derive(Serialize, Deserialize)]
struct NetworkRecord {
    name: String,
    objective: Option<f64>,
}

/// A row of the snapshots file
#[derive(Serialize, Deserialize)]
struct SnapshotRecord {
    snapshot: String,
    #[serde(default, alias = "objective")]
    weighting: Option<f64>,
}

/// Get the file name for a time-series attribute
fn series_file_name(table: &str, attribute: &str) -> String {
    format!("{table}-{attribute}.csv")
}

/// Read a model from a folder of CSV files.
///
/// `snapshots.csv` and `buses.csv` are required; all other tables are optional.
pub fn read_csv_folder(dir: &Path) -> Result<Network> {
    let name = read_csv_optional::<NetworkRecord>(&dir.join(NETWORK_FILE_NAME))?
        .into_iter()
        .next();
    let snapshots = read_snapshots(&dir.join(SNAPSHOTS_FILE_NAME))?;
    let buses_path = dir.join(BUSES_FILE_NAME);
    ensure!(buses_path.is_file(), "Missing required file {}", buses_path.display());

    let mut network = Network {
        name: name.as_ref().map(|n| n.name.clone()).unwrap_or_default(),
        objective: name.and_then(|n| n.objective),
        buses: read_components(&buses_path)?,
        carriers: read_components(&dir.join(CARRIERS_FILE_NAME))?,
        generators: read_components(&dir.join(GENERATORS_FILE_NAME))?,
        storage_units: read_components(&dir.join(STORAGE_UNITS_FILE_NAME))?,
        links: read_components(&dir.join(LINKS_FILE_NAME))?,
        lines: read_components(&dir.join(LINES_FILE_NAME))?,
        loads: read_components(&dir.join(LOADS_FILE_NAME))?,
        global_constraints: read_components(&dir.join(GLOBAL_CONSTRAINTS_FILE_NAME))?,
        ..Network::default()
    };

    network.loads_t.p_set = read_series_file(dir, "loads", "p_set", &snapshots)?;
    network.generators_t.p_max_pu = read_series_file(dir, "generators", "p_max_pu", &snapshots)?;
    network.generators_t.p = read_series_file(dir, "generators", "p", &snapshots)?;
    network.storage_units_t.inflow = read_series_file(dir, "storage_units", "inflow", &snapshots)?;
    network.storage_units_t.p = read_series_file(dir, "storage_units", "p", &snapshots)?;
    network.storage_units_t.state_of_charge =
        read_series_file(dir, "storage_units", "state_of_charge", &snapshots)?;
    network.storage_units_t.spill = read_series_file(dir, "storage_units", "spill", &snapshots)?;
    network.links_t.p0 = read_series_file(dir, "links", "p0", &snapshots)?;
    network.links_t.p1 = read_series_file(dir, "links", "p1", &snapshots)?;
    network.lines_t.p0 = read_series_file(dir, "lines", "p0", &snapshots)?;
    network.buses_t.marginal_price =
        read_series_file(dir, "buses", "marginal_price", &snapshots)?;
    network.snapshots = snapshots;

    Ok(network)
}

/// Read the snapshot index
fn read_snapshots(file_path: &Path) -> Result<Vec<Snapshot>> {
    let snapshots = read_csv::<SnapshotRecord>(file_path)?
        .into_iter()
        .map(|record| Snapshot {
            snapshot: record.snapshot,
            weighting: record.weighting.unwrap_or(1.0),
        })
        .collect_vec();
    ensure!(
        snapshots.iter().map(|s| &s.snapshot).all_unique(),
        "Duplicate snapshot labels in {}",
        file_path.display()
    );

    Ok(snapshots)
}

/// Read the time-series table for an attribute from the model folder, if present
fn read_series_file<ID: IDLike>(
    dir: &Path,
    table: &str,
    attribute: &str,
    snapshots: &[Snapshot],
) -> Result<SeriesTable<ID>> {
    read_series(&dir.join(series_file_name(table, attribute)), snapshots)
}

/// Read a time-series table, if present
fn read_series<ID: IDLike>(file_path: &Path, snapshots: &[Snapshot]) -> Result<SeriesTable<ID>> {
    if !file_path.exists() {
        return Ok(SeriesTable::new());
    }

    read_series_internal(file_path, snapshots).with_context(|| input_err_msg(file_path))
}

fn read_series_internal<ID: IDLike>(
    file_path: &Path,
    snapshots: &[Snapshot],
) -> Result<SeriesTable<ID>> {
    let mut reader = csv::Reader::from_path(file_path)?;
    let headers = reader.headers()?.clone();
    let mut columns = headers.iter();
    ensure!(
        columns.next() == Some(SNAPSHOT_COLUMN),
        "First column must be '{SNAPSHOT_COLUMN}'"
    );
    let ids = columns.collect_vec();
    ensure!(ids.iter().all_unique(), "Duplicate column names");

    let mut values = vec![Vec::with_capacity(snapshots.len()); ids.len()];
    let mut rows = 0;
    for record in reader.records() {
        let record = record?;
        let label = record.get(0).unwrap_or_default();
        let snapshot = snapshots
            .get(rows)
            .with_context(|| format!("More rows than snapshots ({})", snapshots.len()))?;
        ensure!(
            label == snapshot.snapshot,
            "Found snapshot '{label}' where '{}' was expected",
            snapshot.snapshot
        );

        for (column, field) in values.iter_mut().zip(record.iter().skip(1)) {
            let value = field
                .trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid value '{field}' for snapshot '{label}'"))?;
            column.push(value);
        }
        rows += 1;
    }
    ensure!(
        rows == snapshots.len(),
        "Found {rows} rows but there are {} snapshots",
        snapshots.len()
    );

    Ok(ids.into_iter().map(ID::from).zip(values).collect())
}

/// Write records to a CSV file
fn write_csv<T, I>(file_path: &Path, records: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(file_path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write a component table, unless it is empty
fn write_components<T>(file_path: &Path, components: &ComponentMap<T>) -> Result<()>
where
    T: Component + Serialize,
{
    if components.is_empty() {
        return Ok(());
    }

    write_csv(file_path, components.iter())
}

/// Write a time-series table, unless it is empty
fn write_series<ID: IDLike>(
    file_path: &Path,
    snapshots: &[Snapshot],
    table: &SeriesTable<ID>,
) -> Result<()> {
    if table.is_empty() {
        return Ok(());
    }

    let mut writer = csv::Writer::from_path(file_path)?;
    let header = iter::once(SNAPSHOT_COLUMN.to_string())
        .chain(table.iter().map(|(id, _)| id.to_string()));
    writer.write_record(header)?;
    for (t, snapshot) in snapshots.iter().enumerate() {
        let row = iter::once(snapshot.snapshot.clone())
            .chain(table.iter().map(|(_, values)| values[t].to_string()));
        writer.write_record(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write a model to a folder of CSV files in the layout read by [`read_csv_folder`].
///
/// Empty tables are omitted.
pub fn write_csv_folder(network: &Network, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    write_csv(
        &dir.join(NETWORK_FILE_NAME),
        iter::once(NetworkRecord {
            name: network.name.clone(),
            objective: network.objective,
        }),
    )?;
    write_csv(
        &dir.join(SNAPSHOTS_FILE_NAME),
        network.snapshots.iter().map(|s| SnapshotRecord {
            snapshot: s.snapshot.clone(),
            weighting: Some(s.weighting),
        }),
    )?;
    write_csv(&dir.join(BUSES_FILE_NAME), network.buses.iter())?;
    write_components(&dir.join(CARRIERS_FILE_NAME), &network.carriers)?;
    write_components(&dir.join(GENERATORS_FILE_NAME), &network.generators)?;
    write_components(&dir.join(STORAGE_UNITS_FILE_NAME), &network.storage_units)?;
    write_components(&dir.join(LINKS_FILE_NAME), &network.links)?;
    write_components(&dir.join(LINES_FILE_NAME), &network.lines)?;
    write_components(&dir.join(LOADS_FILE_NAME), &network.loads)?;
    write_components(
        &dir.join(GLOBAL_CONSTRAINTS_FILE_NAME),
        &network.global_constraints,
    )?;

    let snapshots = &network.snapshots;
    let path = |table, attribute| dir.join(series_file_name(table, attribute));
    write_series(&path("loads", "p_set"), snapshots, &network.loads_t.p_set)?;
    write_series(
        &path("generators", "p_max_pu"),
        snapshots,
        &network.generators_t.p_max_pu,
    )?;
    write_series(&path("generators", "p"), snapshots, &network.generators_t.p)?;
    write_series(
        &path("storage_units", "inflow"),
        snapshots,
        &network.storage_units_t.inflow,
    )?;
    write_series(&path("storage_units", "p"), snapshots, &network.storage_units_t.p)?;
    write_series(
        &path("storage_units", "state_of_charge"),
        snapshots,
        &network.storage_units_t.state_of_charge,
    )?;
    write_series(
        &path("storage_units", "spill"),
        snapshots,
        &network.storage_units_t.spill,
    )?;
    write_series(&path("links", "p0"), snapshots, &network.links_t.p0)?;
    write_series(&path("links", "p1"), snapshots, &network.links_t.p1)?;
    write_series(&path("lines", "p0"), snapshots, &network.lines_t.p0)?;
    write_series(
        &path("buses", "marginal_price"),
        snapshots,
        &network.buses_t.marginal_price,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, network};
    use crate::network::component::LoadID;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn snapshots(n: usize) -> Vec<Snapshot> {
        (0..n)
            .map(|t| Snapshot {
                snapshot: format!("t{t}"),
                weighting: 1.0,
            })
            .collect()
    }

    fn write_file(path: &Path, contents: &str) {
        let mut file = File::create(path).unwrap();
        write!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_read_series() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("loads-p_set.csv");
        write_file(&file_path, "snapshot,L1,L2\nt0,1,2\nt1,3,4.5\n");

        let table: SeriesTable<LoadID> = read_series(&file_path, &snapshots(2)).unwrap();
        assert_eq!(table.get("L1").unwrap(), [1.0, 3.0]);
        assert_eq!(table.get("L2").unwrap(), [2.0, 4.5]);
    }

    #[rstest]
    #[case("snapshot,L1\nt0,1\nt9,2\n", "Found snapshot 't9' where 't1' was expected")]
    #[case("snapshot,L1\nt0,1\n", "Found 1 rows but there are 2 snapshots")]
    #[case("time,L1\nt0,1\nt1,2\n", "First column must be 'snapshot'")]
    #[case("snapshot,L1,L1\nt0,1,1\nt1,2,2\n", "Duplicate column names")]
    #[case("snapshot,L1\nt0,x\nt1,2\n", "Invalid value 'x' for snapshot 't0'")]
    fn test_read_series_bad(#[case] contents: &str, #[case] msg: &str) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("loads-p_set.csv");
        write_file(&file_path, contents);

        let result = read_series_internal::<LoadID>(&file_path, &snapshots(2));
        assert_error!(result, msg);
    }

    #[test]
    fn test_read_snapshots_default_weighting() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SNAPSHOTS_FILE_NAME);
        write_file(&file_path, "snapshot\n2013-01-01 00:00:00\n2013-01-01 01:00:00\n");

        let snapshots = read_snapshots(&file_path).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].weighting, 1.0);
    }

    #[test]
    fn test_missing_buses() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join(SNAPSHOTS_FILE_NAME), "snapshot\nt0\n");
        assert!(read_csv_folder(dir.path()).is_err());
    }

    #[rstest]
    fn test_write_then_read(network: Network) {
        let dir = tempdir().unwrap();
        write_csv_folder(&network, dir.path()).unwrap();
        assert!(dir.path().join("generators-p_max_pu.csv").is_file());
        assert!(!dir.path().join("lines.csv").exists());

        let loaded = read_csv_folder(dir.path()).unwrap();
        assert_eq!(loaded, network);
    }
}
