use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::error::CatalogError;

/// The declarative tables a catalog version consists of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogTable {
    Biomarkers,
    ReferenceRanges,
    Units,
}

impl CatalogTable {
    pub const ALL: [CatalogTable; 3] = [Self::Biomarkers, Self::ReferenceRanges, Self::Units];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Biomarkers => "biomarkers",
            Self::ReferenceRanges => "reference_ranges",
            Self::Units => "units",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

/// Where catalog tables come from. Implementations return the raw JSON
/// document; typed parsing happens in `CatalogStore`.
pub trait CatalogSource: Send + Sync {
    fn version(&self) -> &str;

    fn read(&self, table: CatalogTable) -> Result<serde_json::Value, CatalogError>;
}

/// Reads `{root}/{version}/{table}.json` from disk.
pub struct JsonDirectorySource {
    root: PathBuf,
    version: String,
}

impl JsonDirectorySource {
    pub fn new(root: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            version: version.into(),
        }
    }

    pub fn table_path(&self, table: CatalogTable) -> PathBuf {
        self.root.join(&self.version).join(table.file_name())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl CatalogSource for JsonDirectorySource {
    fn version(&self) -> &str {
        &self.version
    }

    fn read(&self, table: CatalogTable) -> Result<serde_json::Value, CatalogError> {
        let path = self.table_path(table);
        let json = std::fs::read_to_string(&path).map_err(|e| {
            CatalogError::NotFound(path.display().to_string(), e.to_string())
        })?;
        serde_json::from_str(&json)
            .map_err(|e| CatalogError::Parse(table.file_name(), e.to_string()))
    }
}

const BUNDLED_VERSION: &str = "v1";
const BUNDLED_BIOMARKERS: &str = include_str!("../../resources/catalog/v1/biomarkers.json");
const BUNDLED_RANGES: &str = include_str!("../../resources/catalog/v1/reference_ranges.json");
const BUNDLED_UNITS: &str = include_str!("../../resources/catalog/v1/units.json");

/// The catalog tables shipped with the crate, compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledSource;

impl CatalogSource for BundledSource {
    fn version(&self) -> &str {
        BUNDLED_VERSION
    }

    fn read(&self, table: CatalogTable) -> Result<serde_json::Value, CatalogError> {
        let raw = match table {
            CatalogTable::Biomarkers => BUNDLED_BIOMARKERS,
            CatalogTable::ReferenceRanges => BUNDLED_RANGES,
            CatalogTable::Units => BUNDLED_UNITS,
        };
        serde_json::from_str(raw)
            .map_err(|e| CatalogError::Parse(table.file_name(), e.to_string()))
    }
}

/// Caller-provided tables. A table that was never set reads as NotFound.
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    version: String,
    tables: HashMap<CatalogTable, serde_json::Value>,
}

impl InMemorySource {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            tables: HashMap::new(),
        }
    }

    pub fn with_table(mut self, table: CatalogTable, document: serde_json::Value) -> Self {
        self.tables.insert(table, document);
        self
    }
}

impl CatalogSource for InMemorySource {
    fn version(&self) -> &str {
        &self.version
    }

    fn read(&self, table: CatalogTable) -> Result<serde_json::Value, CatalogError> {
        self.tables.get(&table).cloned().ok_or_else(|| {
            CatalogError::NotFound(table.as_str().to_string(), "table not provided".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_tables_are_valid_json() {
        for table in CatalogTable::ALL {
            assert!(BundledSource.read(table).is_ok(), "{} failed", table.as_str());
        }
    }

    #[test]
    fn directory_source_reports_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonDirectorySource::new(dir.path(), "v1");
        let err = source.read(CatalogTable::Units).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_, _)));
    }

    #[test]
    fn directory_source_reports_malformed_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("v1")).unwrap();
        std::fs::write(dir.path().join("v1").join("units.json"), "{ not json").unwrap();
        let source = JsonDirectorySource::new(dir.path(), "v1");
        let err = source.read(CatalogTable::Units).unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_, _)));
    }

    #[test]
    fn in_memory_source_missing_table_is_not_found() {
        let source = InMemorySource::new("test");
        assert!(matches!(
            source.read(CatalogTable::Biomarkers),
            Err(CatalogError::NotFound(_, _))
        ));
    }
}
