//! Output sinks
//!
//! Tables are encoded to CSV bytes in memory first, so a sink only receives
//! finished tables. [`CsvDirSink`] stages every table before replacing any
//! output file; a failure while staging leaves the previous outputs intact.

use crate::error::ComputeError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A named, fully encoded output table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTable {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Encode rows as CSV with a header row taken from the field names
pub fn encode_csv<T: Serialize>(name: &str, rows: &[T]) -> Result<EncodedTable, ComputeError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ComputeError::Io(e.into_error()))?;
    Ok(EncodedTable {
        name: name.to_string(),
        bytes,
    })
}

/// Destination for output tables
pub trait TableSink {
    fn write_table(&mut self, table: &EncodedTable) -> Result<(), ComputeError>;

    fn write_all(&mut self, tables: &[EncodedTable]) -> Result<(), ComputeError> {
        for table in tables {
            self.write_table(table)?;
        }
        Ok(())
    }
}

/// Writes `<dir>/<name>.csv`, replacing each file by rename
#[derive(Debug, Clone)]
pub struct CsvDirSink {
    dir: PathBuf,
}

impl CsvDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", name))
    }

    fn staging_path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!(".{}.csv.tmp", name))
    }

    fn discard(staged: &[(PathBuf, PathBuf)]) {
        for (tmp, _) in staged {
            let _ = fs::remove_file(tmp);
        }
    }
}

impl TableSink for CsvDirSink {
    fn write_table(&mut self, table: &EncodedTable) -> Result<(), ComputeError> {
        self.write_all(std::slice::from_ref(table))
    }

    /// Stage all tables, then rename them into place
    ///
    /// Nothing is replaced unless every table was staged. Only a failing
    /// rename can leave a mix of old and new files.
    fn write_all(&mut self, tables: &[EncodedTable]) -> Result<(), ComputeError> {
        fs::create_dir_all(&self.dir)?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(tables.len());
        for table in tables {
            let tmp = self.staging_path_for(&table.name);
            if let Err(e) = fs::write(&tmp, &table.bytes) {
                Self::discard(&staged);
                return Err(e.into());
            }
            staged.push((tmp, self.path_for(&table.name)));
        }

        for (i, (tmp, path)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, path) {
                Self::discard(&staged[i..]);
                return Err(e.into());
            }
        }
        Ok(())
    }
}

/// Keeps tables in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    tables: BTreeMap<String, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl TableSink for MemorySink {
    fn write_table(&mut self, table: &EncodedTable) -> Result<(), ComputeError> {
        self.tables.insert(table.name.clone(), table.bytes.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WeightRow;
    use chrono::NaiveDate;

    fn rows() -> Vec<WeightRow> {
        vec![
            WeightRow {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                body_mass: Some(176.5),
            },
            WeightRow {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                body_mass: None,
            },
        ]
    }

    #[test]
    fn test_encode_csv() {
        let table = encode_csv("weight_data", &rows()).unwrap();
        let text = String::from_utf8(table.bytes).unwrap();
        assert_eq!(text, "date,body_mass\n2024-01-01,176.5\n2024-01-02,\n");
    }

    #[test]
    fn test_csv_dir_sink_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvDirSink::new(dir.path().join("out"));
        let table = encode_csv("weight_data", &rows()).unwrap();
        sink.write_all(&[table.clone()]).unwrap();

        let written = std::fs::read(sink.path_for("weight_data")).unwrap();
        assert_eq!(written, table.bytes);
        let leftovers: Vec<_> = std::fs::read_dir(sink.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_staging_keeps_previous_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvDirSink::new(dir.path());
        std::fs::write(sink.path_for("a"), b"old").unwrap();
        // a directory in the way of the second table's staging file
        std::fs::create_dir(sink.staging_path_for("b")).unwrap();

        let tables = vec![
            encode_csv("a", &rows()).unwrap(),
            encode_csv("b", &rows()).unwrap(),
        ];
        assert!(matches!(sink.write_all(&tables), Err(ComputeError::Io(_))));

        assert_eq!(std::fs::read(sink.path_for("a")).unwrap(), b"old");
        assert!(!sink.staging_path_for("a").exists());
        assert!(!sink.path_for("b").exists());
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.write_table(&encode_csv("a", &rows()).unwrap()).unwrap();
        assert!(sink.get("a").is_some());
        assert_eq!(sink.names().collect::<Vec<_>>(), vec!["a"]);
    }
}
