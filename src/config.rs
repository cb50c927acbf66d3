use std::fs;
use std::path::{Path, PathBuf};

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::sim::SimParams;
use crate::utils::app_config::AppConfig;
use crate::utils::prelude::*;
use crate::workload::WorkloadConfig;

/// Ways a result can be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromStr, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// text tables on stdout
    Table,
    /// `schedule.csv`
    Csv,
    /// `result.json`
    Json,
    /// `trace.json`, for chrome://tracing or Perfetto
    Trace,
}

/// The `output` config section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: OutputDir,
    pub formats: Vec<OutputFormat>,
}

impl OutputConfig {
    pub fn wants(&self, format: OutputFormat) -> bool {
        self.formats.contains(&format)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDir(PathBuf);

impl OutputDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Path of `name` inside the output dir, creating the dir if needed
    pub fn file(&self, name: impl AsRef<Path>) -> Result<PathBuf> {
        fs::create_dir_all(&self.0)?;
        Ok(self.0.join(name))
    }
}

/// Everything a run reads from config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub seed: String,
    pub sim: SimParams,
    pub workload: WorkloadConfig,
    pub output: OutputConfig,
}

pub trait AppConfigExt {
    fn run_config(&self) -> Result<RunConfig>;
}

impl AppConfigExt for AppConfig {
    fn run_config(&self) -> Result<RunConfig> {
        Ok(RunConfig {
            seed: self.get("seed")?,
            sim: self.get("sim")?,
            workload: self.get("workload")?,
            output: self.get("output")?,
        })
    }
}
