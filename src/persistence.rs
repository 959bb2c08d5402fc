//! Persistence for vector indexes and grid-search reports.
//!
//! Indexes support both JSON (human-readable) and bincode (efficient binary)
//! formats, chosen by file extension. Reports are always JSON.

use crate::error::{Result, VectorboardError};
use crate::table::GridReport;
use crate::vector_store::VectorIndex;
use std::fs;
use std::path::Path;

/// Default filename for a saved report.
pub const DEFAULT_REPORT_FILENAME: &str = "vectorboard_report.json";

/// Save format for indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// JSON format (human-readable, larger).
    Json,
    /// Bincode format (binary, compact).
    Bincode,
}

impl SaveFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("bin") | Some("bincode") => SaveFormat::Bincode,
            _ => SaveFormat::Json,
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| VectorboardError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Save a vector index, format chosen by extension.
pub fn save_index(index: &VectorIndex, path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let data = match SaveFormat::from_path(path) {
        SaveFormat::Json => serde_json::to_vec(index)
            .map_err(|e| VectorboardError::Serialization(e.to_string()))?,
        SaveFormat::Bincode => bincode::encode_to_vec(index, bincode::config::standard())
            .map_err(|e| VectorboardError::Serialization(e.to_string()))?,
    };

    fs::write(path, &data).map_err(|e| VectorboardError::io(path, e))
}

/// Load a vector index saved by [`save_index`].
pub fn load_index(path: &Path) -> Result<VectorIndex> {
    if !path.exists() {
        return Err(VectorboardError::IndexNotFound(path.to_path_buf()));
    }

    let data = fs::read(path).map_err(|e| VectorboardError::io(path, e))?;

    match SaveFormat::from_path(path) {
        SaveFormat::Json => serde_json::from_slice(&data)
            .map_err(|e| VectorboardError::Serialization(e.to_string())),
        SaveFormat::Bincode => {
            let (index, _): (VectorIndex, usize) =
                bincode::decode_from_slice(&data, bincode::config::standard())
                    .map_err(|e| VectorboardError::Serialization(e.to_string()))?;
            Ok(index)
        }
    }
}

/// Save a report as pretty-printed JSON.
pub fn save_report(report: &GridReport, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| VectorboardError::Serialization(e.to_string()))?;
    fs::write(path, json).map_err(|e| VectorboardError::io(path, e))
}

/// Load a report saved by [`save_report`].
pub fn load_report(path: &Path) -> Result<GridReport> {
    let content = fs::read_to_string(path).map_err(|e| VectorboardError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| VectorboardError::Serialization(e.to_string()))
}

/// Get the size of a file in bytes.
pub fn file_size(path: &Path) -> Result<u64> {
    let metadata = fs::metadata(path).map_err(|e| VectorboardError::io(path, e))?;
    Ok(metadata.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Chunk, DocumentMetadata};
    use crate::table::{InfoTable, ResultsTable};
    use crate::vector_store::DistanceMetric;
    use tempfile::TempDir;

    fn create_test_index() -> VectorIndex {
        let mut index = VectorIndex::new(DistanceMetric::Cosine);
        index.push(
            Chunk {
                content: "Recycling rose in 2022.".to_string(),
                metadata: DocumentMetadata {
                    source: "report.pdf".to_string(),
                    page: Some(4),
                },
                chunk_index: 0,
            },
            vec![0.5, 0.5, 0.0],
        );
        index
    }

    #[test]
    fn test_save_and_load_index_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");

        save_index(&create_test_index(), &path).unwrap();
        let loaded = load_index(&path).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.entries()[0].chunk.metadata.page, Some(4));
    }

    #[test]
    fn test_save_and_load_index_bincode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/index.bin");

        save_index(&create_test_index(), &path).unwrap();
        let loaded = load_index(&path).unwrap();

        assert_eq!(loaded.entries()[0].embedding, vec![0.5, 0.5, 0.0]);
        assert!(file_size(&path).unwrap() > 0);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(SaveFormat::from_path(Path::new("i.json")), SaveFormat::Json);
        assert_eq!(SaveFormat::from_path(Path::new("i.bin")), SaveFormat::Bincode);
        assert_eq!(SaveFormat::from_path(Path::new("i.bincode")), SaveFormat::Bincode);
        assert_eq!(SaveFormat::from_path(Path::new("i")), SaveFormat::Json);
    }

    #[test]
    fn test_load_nonexistent_index() {
        let result = load_index(Path::new("/nonexistent/index.bin"));
        assert!(matches!(result, Err(VectorboardError::IndexNotFound(_))));
    }

    #[test]
    fn test_report_round_trip_keeps_tables() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_REPORT_FILENAME);

        let mut info = InfoTable::new(vec!["chunk_size".to_string()]);
        info.add_row("Experiment_1", vec!["500".to_string()]);
        info.set_timings("Experiment_1", 2.5, 1.0);
        let mut results = ResultsTable::new(vec!["q1".to_string()]);
        results.add_column("Experiment_1", vec!["a1".to_string()]).unwrap();

        save_report(&GridReport { info, results }, &path).unwrap();
        let loaded = load_report(&path).unwrap();

        assert_eq!(loaded.info.rows()[0].run_time, Some(2.5));
        assert_eq!(loaded.results.cell(0, 0), Some("a1"));
    }
}
