//! Persisted run outputs.
//!
//! [`ReportStore`] writes every analysis structure as pretty-printed JSON
//! under one directory, creating it on demand, and reads them back for
//! offline runs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::classify::{ClassifiedItem, TagDetectionResult};
use crate::error::ReportError;
use crate::rules::TemplateCoverage;
use crate::scoring::{ConnectivityAnalysis, MasterItemsAnalysis, TagBasedAnalysis};

/// Template coverage report.
pub const TEMPLATE_ANALYSIS_FILE: &str = "template_analysis.json";
/// Connectivity items found by the template classifier.
pub const CONNECTIVITY_ITEMS_FILE: &str = "connectivity_items.json";
/// Master items found by the template classifier.
pub const MASTER_ITEMS_FILE: &str = "master_items.json";
/// Weighted connectivity analysis.
pub const ANALYSIS_RESULTS_FILE: &str = "analysis_results.json";
/// Master item freshness check.
pub const MASTER_ITEMS_CHECK_FILE: &str = "master_items_check.json";
/// Tag detection result.
pub const TAG_ITEMS_FILE: &str = "tag_based_connectivity_items.json";
/// Tag-based success-rate analysis.
pub const TAG_ANALYSIS_FILE: &str = "tag_based_analysis.json";

/// Snapshot hosts.
pub const HOSTS_FILE: &str = "hosts.json";
/// Snapshot templates.
pub const TEMPLATES_FILE: &str = "templates.json";
/// Snapshot items.
pub const ITEMS_FILE: &str = "items.json";
/// Snapshot history.
pub const HISTORY_FILE: &str = "history.json";

/// JSON file store rooted at one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportStore {
    root: PathBuf,
}

impl ReportStore {
    /// Create a store. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of `file_name` inside the store.
    #[must_use]
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Whether `file_name` exists in the store.
    #[must_use]
    pub fn contains(&self, file_name: &str) -> bool {
        self.path(file_name).is_file()
    }

    /// Serialize `value` as pretty JSON into `file_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the directory cannot be created, the
    /// value cannot be serialized, or the file cannot be written.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        file_name: &str,
        value: &T,
    ) -> Result<PathBuf, ReportError> {
        fs::create_dir_all(&self.root).map_err(|e| ReportError::Io {
            path: self.root.display().to_string(),
            message: e.to_string(),
        })?;

        let json = serde_json::to_string_pretty(value).map_err(|e| ReportError::Serialization {
            message: format!("{file_name}: {e}"),
        })?;

        let path = self.path(file_name);
        fs::write(&path, json).map_err(|e| ReportError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        tracing::info!(path = %path.display(), "Saved report");
        Ok(path)
    }

    /// Read and deserialize `file_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::MissingInput`] if the file does not exist,
    /// or another [`ReportError`] if it cannot be read or parsed.
    pub fn read_json<T: DeserializeOwned>(&self, file_name: &str) -> Result<T, ReportError> {
        let path = self.path(file_name);
        if !path.is_file() {
            return Err(ReportError::MissingInput {
                path: path.display().to_string(),
            });
        }

        let contents = fs::read_to_string(&path).map_err(|e| ReportError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&contents).map_err(|e| ReportError::Serialization {
            message: format!("{}: {e}", path.display()),
        })
    }

    /// Like [`read_json`](Self::read_json), but a missing file is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the file exists but cannot be read or
    /// parsed.
    pub fn read_json_opt<T: DeserializeOwned>(
        &self,
        file_name: &str,
    ) -> Result<Option<T>, ReportError> {
        match self.read_json(file_name) {
            Ok(value) => Ok(Some(value)),
            Err(ReportError::MissingInput { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Save the template coverage report.
    ///
    /// # Errors
    ///
    /// See [`write_json`](Self::write_json).
    pub fn save_template_analysis(
        &self,
        coverage: &TemplateCoverage,
    ) -> Result<PathBuf, ReportError> {
        self.write_json(TEMPLATE_ANALYSIS_FILE, coverage)
    }

    /// Save classified connectivity items.
    ///
    /// # Errors
    ///
    /// See [`write_json`](Self::write_json).
    pub fn save_connectivity_items(
        &self,
        items: &[ClassifiedItem],
    ) -> Result<PathBuf, ReportError> {
        self.write_json(CONNECTIVITY_ITEMS_FILE, items)
    }

    /// Save classified master items.
    ///
    /// # Errors
    ///
    /// See [`write_json`](Self::write_json).
    pub fn save_master_items(&self, items: &[ClassifiedItem]) -> Result<PathBuf, ReportError> {
        self.write_json(MASTER_ITEMS_FILE, items)
    }

    /// Save the weighted connectivity analysis.
    ///
    /// # Errors
    ///
    /// See [`write_json`](Self::write_json).
    pub fn save_analysis(&self, analysis: &ConnectivityAnalysis) -> Result<PathBuf, ReportError> {
        self.write_json(ANALYSIS_RESULTS_FILE, analysis)
    }

    /// Save the master item check.
    ///
    /// # Errors
    ///
    /// See [`write_json`](Self::write_json).
    pub fn save_master_items_check(
        &self,
        analysis: &MasterItemsAnalysis,
    ) -> Result<PathBuf, ReportError> {
        self.write_json(MASTER_ITEMS_CHECK_FILE, analysis)
    }

    /// Save the tag detection result.
    ///
    /// # Errors
    ///
    /// See [`write_json`](Self::write_json).
    pub fn save_tag_detection(
        &self,
        detection: &TagDetectionResult,
    ) -> Result<PathBuf, ReportError> {
        self.write_json(TAG_ITEMS_FILE, detection)
    }

    /// Save the tag-based analysis.
    ///
    /// # Errors
    ///
    /// See [`write_json`](Self::write_json).
    pub fn save_tag_analysis(&self, analysis: &TagBasedAnalysis) -> Result<PathBuf, ReportError> {
        self.write_json(TAG_ANALYSIS_FILE, analysis)
    }
}
