//! Record streams: the boundary trait plus the two stock implementations
//! (in-memory rows and header-line CSV files).

use crate::error::{Result, ScopeError};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

/// One raw data-source record: field name to raw text value.
pub type Record = FnvHashMap<String, String>;

/// Where a sensor's records come from. Serialized keyed by variant name, the
/// only enum representation both the JSON and binary project formats accept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DataSourceConfig {
    /// Comma-separated file whose first line names the fields.
    File {
        /// Path to the file.
        path: String,
    },
    /// Records held inline, row-major, parallel to `fields`.
    Inline {
        /// Field names, in column order.
        fields: Vec<String>,
        /// Raw rows; each must carry one value per field.
        rows: Vec<Vec<String>>,
    },
}

/// A replayable sequence of records.
///
/// Streams are finite; sensors turn them into infinite cyclic sequences by
/// rewinding once when `next_record` returns `None`.
pub trait RecordStream {
    /// The next record, or `None` at end of stream.
    fn next_record(&mut self) -> Result<Option<Record>>;

    /// Restarts the stream from the first record.
    fn rewind(&mut self) -> Result<()>;
}

/// Builds a stream for a data-source configuration using the stock
/// implementations in this module.
pub fn open_default(source: &DataSourceConfig) -> Result<Box<dyn RecordStream>> {
    match source {
        DataSourceConfig::File { path } => Ok(Box::new(FileRecordStream::open(path)?)),
        DataSourceConfig::Inline { fields, rows } => {
            Ok(Box::new(VecRecordStream::from_rows(fields, rows)?))
        }
    }
}

/// Record stream over rows held in memory.
pub struct VecRecordStream {
    rows: Vec<Record>,
    cursor: usize,
}

impl VecRecordStream {
    /// Wraps pre-built records.
    pub fn new(rows: Vec<Record>) -> Self {
        VecRecordStream { rows, cursor: 0 }
    }

    /// Zips raw rows against the field names, rejecting ragged rows.
    pub fn from_rows(fields: &[String], rows: &[Vec<String>]) -> Result<Self> {
        let mut records = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != fields.len() {
                return Err(ScopeError::RaggedRecord {
                    line: i as u64 + 1,
                    got: row.len(),
                    expected: fields.len(),
                });
            }
            let record: Record = fields.iter().cloned().zip(row.iter().cloned()).collect();
            records.push(record);
        }
        Ok(VecRecordStream::new(records))
    }
}

impl RecordStream for VecRecordStream {
    fn next_record(&mut self) -> Result<Option<Record>> {
        match self.rows.get(self.cursor) {
            Some(record) => {
                self.cursor += 1;
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }
}

/// Record stream over a comma-separated file whose first line names the
/// fields. Blank lines are skipped; rows with the wrong arity fail.
#[derive(Debug)]
pub struct FileRecordStream {
    reader: BufReader<File>,
    fields: Vec<String>,
    line: u64,
}

impl FileRecordStream {
    /// Opens the file and reads its header line.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|_| ScopeError::DataSourceMissing(path.display().to_string()))?;
        let mut reader = BufReader::new(file);
        let fields = read_header(&mut reader)
            .ok_or_else(|| ScopeError::DataSourceMissing(path.display().to_string()))?;
        Ok(FileRecordStream {
            reader,
            fields,
            line: 1,
        })
    }

    /// Field names from the header line.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

fn read_header(reader: &mut BufReader<File>) -> Option<Vec<String>> {
    let mut header = String::new();
    let n = reader.read_line(&mut header).ok()?;
    if n == 0 {
        return None;
    }
    let fields: Vec<String> = header
        .trim_end_matches(['\r', '\n'])
        .split(',')
        .map(|f| f.trim().to_string())
        .collect();
    if fields.iter().all(|f| f.is_empty()) {
        return None;
    }
    Some(fields)
}

impl RecordStream for FileRecordStream {
    fn next_record(&mut self) -> Result<Option<Record>> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self.reader.read_line(&mut line)?;
            if n == 0 {
                return Ok(None);
            }
            self.line += 1;
            let row = line.trim_end_matches(['\r', '\n']);
            if row.trim().is_empty() {
                continue;
            }
            let values: Vec<&str> = row.split(',').collect();
            if values.len() != self.fields.len() {
                return Err(ScopeError::RaggedRecord {
                    line: self.line,
                    got: values.len(),
                    expected: self.fields.len(),
                });
            }
            let record: Record = self
                .fields
                .iter()
                .cloned()
                .zip(values.iter().map(|v| v.trim().to_string()))
                .collect();
            return Ok(Some(record));
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        let mut header = String::new();
        self.reader.read_line(&mut header)?;
        self.line = 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_csv(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("htm_scope_{name}_{}.csv", std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn vec_stream_replays_after_rewind() {
        let fields = vec!["value".to_string()];
        let rows = vec![vec!["1".to_string()], vec!["2".to_string()]];
        let mut stream = VecRecordStream::from_rows(&fields, &rows).unwrap();
        assert_eq!(stream.next_record().unwrap().unwrap()["value"], "1");
        assert_eq!(stream.next_record().unwrap().unwrap()["value"], "2");
        assert!(stream.next_record().unwrap().is_none());
        stream.rewind().unwrap();
        assert_eq!(stream.next_record().unwrap().unwrap()["value"], "1");
    }

    #[test]
    fn ragged_inline_rows_fail() {
        let fields = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec!["1".to_string()]];
        assert!(matches!(
            VecRecordStream::from_rows(&fields, &rows),
            Err(ScopeError::RaggedRecord { got: 1, expected: 2, .. })
        ));
    }

    #[test]
    fn file_stream_reads_header_and_rows() {
        let path = temp_csv("basic", "value,label\n0.5,on\n\n0.7,off\n");
        let mut stream = FileRecordStream::open(&path).unwrap();
        assert_eq!(stream.fields(), ["value", "label"]);
        let first = stream.next_record().unwrap().unwrap();
        assert_eq!(first["value"], "0.5");
        assert_eq!(first["label"], "on");
        let second = stream.next_record().unwrap().unwrap();
        assert_eq!(second["value"], "0.7");
        assert!(stream.next_record().unwrap().is_none());
        stream.rewind().unwrap();
        assert_eq!(stream.next_record().unwrap().unwrap()["value"], "0.5");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = FileRecordStream::open("/nonexistent/records.csv").unwrap_err();
        assert!(matches!(err, ScopeError::DataSourceMissing(_)));
    }

    #[test]
    fn ragged_file_row_names_its_line() {
        let path = temp_csv("ragged", "a,b\n1,2\n3\n");
        let mut stream = FileRecordStream::open(&path).unwrap();
        stream.next_record().unwrap();
        assert!(matches!(
            stream.next_record(),
            Err(ScopeError::RaggedRecord { line: 3, got: 1, expected: 2 })
        ));
        std::fs::remove_file(path).ok();
    }
}
