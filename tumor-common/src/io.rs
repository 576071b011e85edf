use crate::snapshot::{LatticeSnapshot, SeriesRecord};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Column headers of the results CSV.
pub const SERIES_HEADERS: [&str; 4] = ["Step", "Tumor Cells", "Necrotic Cells", "Growth Rate"];

/// On-disk encodings for a `LatticeSnapshot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Bincode,
    MessagePack,
}

impl SnapshotFormat {
    /// Parses the `output.format` config value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(SnapshotFormat::Json),
            "bincode" => Some(SnapshotFormat::Bincode),
            "messagepack" | "msgpack" => Some(SnapshotFormat::MessagePack),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(SnapshotFormat::Json),
            "bin" => Some(SnapshotFormat::Bincode),
            "msgpack" => Some(SnapshotFormat::MessagePack),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::Bincode => "bin",
            SnapshotFormat::MessagePack => "msgpack",
        }
    }
}

/// Writes `snapshot` to `path` in the given format.
pub fn write_snapshot(path: &Path, snapshot: &LatticeSnapshot, format: SnapshotFormat) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create snapshot file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        SnapshotFormat::Json => serde_json::to_writer(&mut writer, snapshot)
            .context("Failed to serialize snapshot to JSON")?,
        SnapshotFormat::Bincode => bincode::serialize_into(&mut writer, snapshot)
            .context("Failed to serialize snapshot to bincode")?,
        SnapshotFormat::MessagePack => rmp_serde::encode::write(&mut writer, snapshot)
            .context("Failed to serialize snapshot to MessagePack")?,
    }
    writer.flush()?;
    Ok(())
}

/// Reads a snapshot, picking the decoder from the file extension.
pub fn read_snapshot(path: &Path) -> Result<LatticeSnapshot> {
    let format = SnapshotFormat::from_path(path)
        .with_context(|| format!("Cannot tell snapshot format of '{}' (expected .json, .bin or .msgpack)", path.display()))?;
    let file = File::open(path)
        .with_context(|| format!("Failed to open snapshot file '{}'", path.display()))?;
    let reader = BufReader::new(file);
    let snapshot: LatticeSnapshot = match format {
        SnapshotFormat::Json => serde_json::from_reader(reader).context("Invalid JSON snapshot")?,
        SnapshotFormat::Bincode => bincode::deserialize_from(reader).context("Invalid bincode snapshot")?,
        SnapshotFormat::MessagePack => rmp_serde::from_read(reader).context("Invalid MessagePack snapshot")?,
    };

    let expected = snapshot.width as usize * snapshot.height as usize;
    if snapshot.cells.len() != expected {
        anyhow::bail!(
            "Snapshot '{}' holds {} cells, expected {}x{}.",
            path.display(),
            snapshot.cells.len(),
            snapshot.width,
            snapshot.height
        );
    }
    Ok(snapshot)
}

/// Writes series rows as CSV. The header row is written even when there are no rows.
pub fn write_series_csv<I>(path: &Path, rows: I) -> Result<usize>
where
    I: IntoIterator<Item = SeriesRecord>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create CSV file '{}'", path.display()))?;
    writer.write_record(SERIES_HEADERS)?;
    let mut written = 0;
    for row in rows {
        writer.serialize(row)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Loads series rows written by `write_series_csv`.
pub fn read_series_csv(path: &Path) -> Result<Vec<SeriesRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file '{}'", path.display()))?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: SeriesRecord = result.with_context(|| format!("Malformed row in '{}'", path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim_params::SimulationParameters;
    use tempfile::tempdir;

    fn snapshot() -> LatticeSnapshot {
        LatticeSnapshot {
            step: Some(12),
            width: 3,
            height: 2,
            cells: vec![0, 1, 2, 1, 0, 0],
            scale_factor: 1e9 / 29.0,
            params: SimulationParameters {
                growth_rate: 0.006,
                drug_gain: 0.1,
                drug_reference_concentration: 0.5,
                treatment_gain: 1.0,
                elimination_rate: Some(0.2),
            },
        }
    }

    #[test]
    fn snapshot_survives_every_format() {
        let dir = tempdir().unwrap();
        for format in [SnapshotFormat::Json, SnapshotFormat::Bincode, SnapshotFormat::MessagePack] {
            let path = dir.path().join(format!("final.{}", format.extension()));
            write_snapshot(&path, &snapshot(), format).unwrap();
            let back = read_snapshot(&path).unwrap();
            assert_eq!(back.cells, snapshot().cells);
            assert_eq!(back.step, Some(12));
            assert_eq!(back.params, snapshot().params);
        }
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("final.txt");
        std::fs::write(&path, "{}").unwrap();
        assert!(read_snapshot(&path).is_err());
    }

    #[test]
    fn truncated_cells_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let mut bad = snapshot();
        bad.cells.pop();
        write_snapshot(&path, &bad, SnapshotFormat::Json).unwrap();
        assert!(read_snapshot(&path).is_err());
    }

    #[test]
    fn series_csv_keeps_headers_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("series.csv");
        let rows = vec![
            SeriesRecord { step: 0, tumor_cells: 1e9, necrotic_cells: 0.0, growth_rate: 0.0 },
            SeriesRecord { step: 1, tumor_cells: 1.1e9, necrotic_cells: 2e7, growth_rate: 0.1 },
        ];
        assert_eq!(write_series_csv(&path, rows.clone()).unwrap(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Step,Tumor Cells,Necrotic Cells,Growth Rate"));
        assert_eq!(read_series_csv(&path).unwrap(), rows);
    }

    #[test]
    fn empty_series_still_has_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        assert_eq!(write_series_csv(&path, Vec::new()).unwrap(), 0);
        assert!(read_series_csv(&path).unwrap().is_empty());
    }

    #[test]
    fn format_names() {
        assert_eq!(SnapshotFormat::from_name("MessagePack"), Some(SnapshotFormat::MessagePack));
        assert_eq!(SnapshotFormat::from_name("yaml"), None);
        assert_eq!(SnapshotFormat::from_path(Path::new("a.bin")), Some(SnapshotFormat::Bincode));
    }
}
