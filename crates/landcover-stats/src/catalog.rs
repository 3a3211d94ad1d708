//! JSON-persisted catalog of linked land-cover rasters, keyed by year.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use landcover_common::CrsCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StatsError};

/// Name a raster is registered under, e.g. `landcover_1995`.
pub fn raster_name(year: u16) -> String {
    format!("landcover_{}", year)
}

/// One linked raster. The file stays where it is; only its header is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub raster_name: String,
    pub year: u16,
    /// Path of the linked NetCDF file.
    pub source: PathBuf,
    /// Naming convention that recognized the file.
    pub convention: String,
    /// Classification variable inside the file.
    pub variable: String,
    pub width: usize,
    pub height: usize,
    pub crs: Option<CrsCode>,
    /// Pixel size along x in CRS units.
    pub resolution: Option<f64>,
    pub imported_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    entries: BTreeMap<String, CatalogEntry>,
}

/// Raster catalog stored as a JSON document.
#[derive(Debug)]
pub struct RasterCatalog {
    path: PathBuf,
    entries: BTreeMap<String, CatalogEntry>,
}

impl RasterCatalog {
    /// Open the catalog at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            let file: CatalogFile = serde_json::from_str(&text).map_err(|e| {
                StatsError::Catalog(format!("invalid catalog {}: {}", path.display(), e))
            })?;
            file.entries
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), entries = entries.len(), "Opened raster catalog");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register `entry` under its year, replacing any earlier entry.
    pub fn insert(&mut self, entry: CatalogEntry) -> Option<CatalogEntry> {
        self.entries.insert(entry.year.to_string(), entry)
    }

    pub fn get(&self, year: u16) -> Option<&CatalogEntry> {
        self.entries.get(&year.to_string())
    }

    /// Catalog keys (years as strings) in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in ascending year order.
    pub fn entries(&self) -> Vec<&CatalogEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by_key(|e| e.year);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the catalog back to its file.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = CatalogFile {
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), entries = self.entries.len(), "Saved raster catalog");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::temp_test_dir;

    fn entry(year: u16) -> CatalogEntry {
        CatalogEntry {
            raster_name: raster_name(year),
            year,
            source: PathBuf::from(format!("/data/{}.nc", year)),
            convention: "ESACCI".to_string(),
            variable: "lccs_class".to_string(),
            width: 10,
            height: 8,
            crs: Some(CrsCode::Epsg3035),
            resolution: Some(300.0),
            imported_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = temp_test_dir();
        let path = dir.path().join("catalog.json");

        let mut catalog = RasterCatalog::open(&path).unwrap();
        assert!(catalog.is_empty());
        catalog.insert(entry(2001));
        catalog.insert(entry(1995));
        catalog.save().unwrap();

        let reopened = RasterCatalog::open(&path).unwrap();
        assert_eq!(reopened.keys().collect::<Vec<_>>(), vec!["1995", "2001"]);
        assert_eq!(reopened.get(1995), catalog.get(1995));
        assert_eq!(reopened.get(1995).unwrap().raster_name, "landcover_1995");
        assert!(!dir.path().join("catalog.json.tmp").exists());
    }

    #[test]
    fn test_insert_overwrites() {
        let dir = temp_test_dir();
        let mut catalog = RasterCatalog::open(dir.path().join("c.json")).unwrap();
        assert!(catalog.insert(entry(2000)).is_none());

        let mut newer = entry(2000);
        newer.convention = "C3S".to_string();
        let old = catalog.insert(newer).unwrap();
        assert_eq!(old.convention, "ESACCI");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(2000).unwrap().convention, "C3S");
    }

    #[test]
    fn test_invalid_catalog_file() {
        let dir = temp_test_dir();
        let path = dir.path().join("catalog.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(RasterCatalog::open(&path), Err(StatsError::Catalog(_))));
    }
}
