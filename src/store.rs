//! Dataset loading and the immutable in-memory store.
//!
//! Three CSV tables share one key space: a 2-D embedding, a phenotype feature
//! matrix, and per-visit patient metadata. The metadata index defines the
//! canonical patient list (first-occurrence order); the other two tables are
//! re-indexed onto it positionally and must match it in length. After
//! [`DatasetStore::load`] succeeds the store is never mutated.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the metadata column dropped at load time.
const TIME_COLUMN: &str = "time";

/// Identifier joining the three input tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientKey(String);

impl PatientKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for PatientKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Locations of the three input tables.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub embedding: PathBuf,
    pub phenotypes: PathBuf,
    pub patients: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            embedding: PathBuf::from("data/embedding.csv"),
            phenotypes: PathBuf::from("data/phenotypes.csv"),
            patients: PathBuf::from("data/patients.csv"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{table} table: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("{table} table has no data")]
    EmptyTable { table: &'static str },
    #[error("{table} table: expected {expected} value columns, found {found}")]
    ColumnCount {
        table: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{table} table, row {row}: column {column:?} value {value:?} is not a number")]
    BadNumber {
        table: &'static str,
        row: usize,
        column: String,
        value: String,
    },
    #[error("{table} table has {rows} rows but the patient list has {keys} unique keys")]
    RowCountMismatch {
        table: &'static str,
        rows: usize,
        keys: usize,
    },
    #[error("patients table has no {TIME_COLUMN:?} column to drop")]
    MissingTimeColumn,
}

/// The three aligned tables, loaded once at startup and read-only thereafter.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    keys: Vec<PatientKey>,
    index: HashMap<PatientKey, usize>,
    embedding: Vec<[f64; 2]>,
    feature_names: Vec<String>,
    phenotypes: Vec<Vec<Option<f64>>>,
    meta_columns: Vec<String>,
    meta_rows: Vec<Vec<String>>,
}

impl DatasetStore {
    /// Reads the three CSV files and builds the validated, aligned store.
    ///
    /// Any failure here is fatal to the process: a missing or unreadable
    /// file, a malformed table, or a row count that cannot be aligned to the
    /// patient list.
    pub fn load(paths: &DataPaths) -> Result<Self, LoadError> {
        let embedding = open(&paths.embedding)?;
        let phenotypes = open(&paths.phenotypes)?;
        let patients = open(&paths.patients)?;
        Self::from_readers(embedding, phenotypes, patients)
    }

    /// Builds the store from already-open CSV sources. `load` is a thin
    /// wrapper over this; tests feed in-memory byte slices.
    pub fn from_readers<E, P, M>(embedding: E, phenotypes: P, patients: M) -> Result<Self, LoadError>
    where
        E: Read,
        P: Read,
        M: Read,
    {
        let embedding = RawTable::read("embedding", embedding)?;
        let phenotypes = RawTable::read("phenotypes", phenotypes)?;
        let patients = RawTable::read("patients", patients)?;

        // Canonical patient list: unique metadata keys in first-occurrence
        // order, each paired with its first metadata row.
        let time_col = patients
            .columns
            .iter()
            .position(|c| c == TIME_COLUMN)
            .ok_or(LoadError::MissingTimeColumn)?;
        let meta_columns: Vec<String> = patients
            .columns
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != time_col)
            .map(|(_, c)| c.clone())
            .collect();

        let mut keys: Vec<PatientKey> = Vec::new();
        let mut index: HashMap<PatientKey, usize> = HashMap::new();
        let mut meta_rows: Vec<Vec<String>> = Vec::new();
        for (label, row) in patients.index.iter().zip(&patients.rows) {
            let key = PatientKey::new(label.clone());
            if index.contains_key(&key) {
                continue;
            }
            index.insert(key.clone(), keys.len());
            keys.push(key);
            meta_rows.push(
                row.iter()
                    .enumerate()
                    .filter(|&(i, _)| i != time_col)
                    .map(|(_, v)| v.clone())
                    .collect(),
            );
        }

        // Re-index the other two tables onto the patient list. Alignment is
        // positional, so the row counts must match exactly.
        if embedding.rows.len() != keys.len() {
            return Err(LoadError::RowCountMismatch {
                table: "embedding",
                rows: embedding.rows.len(),
                keys: keys.len(),
            });
        }
        if phenotypes.rows.len() != keys.len() {
            return Err(LoadError::RowCountMismatch {
                table: "phenotypes",
                rows: phenotypes.rows.len(),
                keys: keys.len(),
            });
        }

        if embedding.columns.len() != 2 {
            return Err(LoadError::ColumnCount {
                table: "embedding",
                expected: 2,
                found: embedding.columns.len(),
            });
        }
        let mut coords = Vec::with_capacity(embedding.rows.len());
        for (i, row) in embedding.rows.iter().enumerate() {
            let x = parse_number("embedding", i + 1, &embedding.columns[0], &row[0])?;
            let y = parse_number("embedding", i + 1, &embedding.columns[1], &row[1])?;
            coords.push([x, y]);
        }

        // Phenotype cells that are blank or non-numeric load as missing;
        // they are skipped by the mean, not propagated.
        let feature_names = phenotypes.columns;
        let values: Vec<Vec<Option<f64>>> = phenotypes
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        let cell = cell.trim();
                        if cell.is_empty() {
                            None
                        } else {
                            cell.parse::<f64>().ok()
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            keys,
            index,
            embedding: coords,
            feature_names,
            phenotypes: values,
            meta_columns,
            meta_rows,
        })
    }

    /// Patient keys in canonical (first-occurrence) order.
    pub fn keys(&self) -> &[PatientKey] {
        &self.keys
    }

    /// Number of patients.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Canonical row of a key, if the key is present.
    pub fn row_of(&self, key: &PatientKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Embedding coordinates, one `[x, y]` per patient in canonical order.
    pub fn embedding(&self) -> &[[f64; 2]] {
        &self.embedding
    }

    /// Ordered feature names shared by every phenotype vector.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Phenotype values of one patient row; `None` marks a missing cell.
    pub fn phenotype_row(&self, row: usize) -> &[Option<f64>] {
        &self.phenotypes[row]
    }

    /// Metadata column names, `time` excluded.
    pub fn meta_columns(&self) -> &[String] {
        &self.meta_columns
    }

    /// First-occurrence metadata row of one patient.
    pub fn meta_row(&self, row: usize) -> &[String] {
        &self.meta_rows[row]
    }
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_number(
    table: &'static str,
    row: usize,
    column: &str,
    value: &str,
) -> Result<f64, LoadError> {
    value.trim().parse::<f64>().map_err(|_| LoadError::BadNumber {
        table,
        row,
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// A CSV table split into its index column, header names, and string cells.
struct RawTable {
    columns: Vec<String>,
    index: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    fn read<R: Read>(table: &'static str, source: R) -> Result<Self, LoadError> {
        let mut reader = csv::Reader::from_reader(source);
        let headers = reader
            .headers()
            .map_err(|source| LoadError::Csv { table, source })?
            .clone();
        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        if columns.is_empty() {
            return Err(LoadError::EmptyTable { table });
        }

        let mut index = Vec::new();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| LoadError::Csv { table, source })?;
            let mut fields = record.iter();
            index.push(fields.next().unwrap_or("").to_string());
            rows.push(fields.map(str::to_string).collect());
        }
        if rows.is_empty() {
            return Err(LoadError::EmptyTable { table });
        }
        Ok(Self {
            columns,
            index,
            rows,
        })
    }
}
