//! Batch configuration file.

use crate::automation::HostCommand;
use crate::driver::DriverSettings;
use crate::model::{ExportOptions, GridSetup, RunOptions};
use crate::orchestrator::StudyPlan;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Study folder copied into every new study; never run itself.
pub const REFERENCE_STUDY: &str = "Reference";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub inm_exe: PathBuf,
    pub studies_root: PathBuf,
    /// Studies to run; empty means every folder under `studies_root` except the reference.
    pub studies: Vec<String>,
    pub grids: Vec<GridSetup>,
    pub run_options: RunOptions,
    pub export_options: Option<ExportOptions>,
    pub driver: DriverSettings,
    pub host: HostCommand,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inm_exe: PathBuf::from("C:\\INM7.0\\INM.exe"),
            studies_root: PathBuf::from("INM Studies"),
            studies: Vec::new(),
            grids: vec![GridSetup::default()],
            run_options: RunOptions::default(),
            export_options: None,
            driver: DriverSettings::default(),
            host: HostCommand::default(),
        }
    }
}

/// `<config dir>/inm-auto/batch.json`, or `batch.json` when the platform has no config dir.
pub fn default_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("inm-auto").join("batch.json")
    } else {
        PathBuf::from("batch.json")
    }
}

impl BatchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        for (idx, grid) in config.grids.iter().enumerate() {
            if let Err(e) = grid.validate() {
                bail!("grid {}: {e}", idx + 1);
            }
        }
        Ok(config)
    }

    /// Configured studies, or the study folders found under `studies_root`, sorted.
    pub fn study_names(&self) -> Result<Vec<String>> {
        if !self.studies.is_empty() {
            return Ok(self.studies.clone());
        }
        let entries = std::fs::read_dir(&self.studies_root)
            .with_context(|| format!("list studies in {}", self.studies_root.display()))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name != REFERENCE_STUDY {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// One plan per study, all sharing the configured grids and options.
    pub fn plans(&self) -> Result<Vec<StudyPlan>> {
        Ok(self
            .study_names()?
            .into_iter()
            .map(|study| StudyPlan {
                study,
                grids: self.grids.clone(),
                run_options: self.run_options.clone(),
                export_options: self.export_options.clone(),
            })
            .collect())
    }
}
