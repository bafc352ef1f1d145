//! Resolved set of paths for one pipeline run.
//!
//! Paths come from three layers, later ones winning: defaults under a project
//! root, an optional YAML file, and individual command-line flags. Relative
//! paths from the YAML file resolve against the root.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EtlConfig {
    pub root: PathBuf,
    pub raw_orders: PathBuf,
    pub raw_users: PathBuf,
    pub out_orders_clean: PathBuf,
    pub out_users: PathBuf,
    pub out_analytics: PathBuf,
    pub run_meta: PathBuf,
    pub missingness_report: PathBuf,
}

/// Partial configuration; unset fields keep the value underneath.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub raw_orders: Option<PathBuf>,
    pub raw_users: Option<PathBuf>,
    pub out_orders_clean: Option<PathBuf>,
    pub out_users: Option<PathBuf>,
    pub out_analytics: Option<PathBuf>,
    pub run_meta: Option<PathBuf>,
    pub missingness_report: Option<PathBuf>,
}

impl ConfigOverrides {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Opening config file {path:?}"))?;
        serde_yaml::from_str(&raw).with_context(|| format!("Parsing config file {path:?}"))
    }
}

impl EtlConfig {
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let raw = root.join("data").join("raw");
        let processed = root.join("data").join("processed");
        Self {
            raw_orders: raw.join("orders.csv"),
            raw_users: raw.join("users.csv"),
            out_orders_clean: processed.join("orders_clean.csv"),
            out_users: processed.join("users.csv"),
            out_analytics: processed.join("analytics_table.csv"),
            run_meta: processed.join("_run_meta.json"),
            missingness_report: root.join("reports").join("missingness_orders.csv"),
            root,
        }
    }

    /// Root defaults, then `config_file` if given.
    pub fn resolve(root: impl Into<PathBuf>, config_file: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_root(root);
        if let Some(path) = config_file {
            let overrides = ConfigOverrides::load(path)?;
            config.apply(&overrides);
        }
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        let root = self.root.clone();
        let pick = |target: &mut PathBuf, value: &Option<PathBuf>| {
            if let Some(path) = value {
                *target = root.join(path);
            }
        };
        pick(&mut self.raw_orders, &overrides.raw_orders);
        pick(&mut self.raw_users, &overrides.raw_users);
        pick(&mut self.out_orders_clean, &overrides.out_orders_clean);
        pick(&mut self.out_users, &overrides.out_users);
        pick(&mut self.out_analytics, &overrides.out_analytics);
        pick(&mut self.run_meta, &overrides.run_meta);
        pick(&mut self.missingness_report, &overrides.missingness_report);
    }

    /// Where the unmodified raw orders are copied by the staging run.
    pub fn staged_orders(&self) -> PathBuf {
        self.out_orders_clean.with_file_name("orders.csv")
    }
}
