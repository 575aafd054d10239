use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use fabguide_core::EngineerId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub technician: TechnicianConfig,
    pub catalog: CatalogConfig,
    pub scan: ScanConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TechnicianConfig {
    pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub backend: String, // "sqlite" | "memory"
    pub db_path: String,
    /// YAML catalog loaded into the memory backend on open.
    #[serde(default)]
    pub fixture: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    pub timeout_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Sqlite,
}

impl Config {
    pub fn default_for(engineer_id: &str) -> Self {
        Self {
            technician: TechnicianConfig { id: engineer_id.to_string() },
            catalog: CatalogConfig {
                backend: "sqlite".to_string(),
                db_path: ".fabguide/catalog.db".to_string(),
                fixture: None,
            },
            scan: ScanConfig { timeout_secs: 5 },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| "parse fabguide.toml")?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Load the config under `root`, writing the default first when missing.
    pub fn load_or_init(root: &Path, engineer_id: &str) -> Result<Self> {
        let path = Self::config_path(root);
        if path.exists() {
            return Self::load_from(&path);
        }
        let cfg = Self::default_for(engineer_id);
        cfg.save_to(&path)?;
        Ok(cfg)
    }

    pub fn engineer_id(&self) -> EngineerId {
        EngineerId::from_str(self.technician.id.as_str())
    }

    pub fn backend(&self) -> Result<BackendKind> {
        match self.catalog.backend.as_str() {
            "sqlite" => Ok(BackendKind::Sqlite),
            "memory" => Ok(BackendKind::Memory),
            other => Err(anyhow!("unknown catalog backend {other:?} (expected sqlite or memory)")),
        }
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.timeout_secs)
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join(".fabguide").join("fabguide.toml")
    }

    /// Catalog database path. `~` is expanded, relative paths resolve against `root`.
    pub fn db_path(&self, root: &Path) -> PathBuf {
        resolve_path(root, &self.catalog.db_path)
    }

    pub fn fixture_path(&self, root: &Path) -> Option<PathBuf> {
        self.catalog.fixture.as_deref().map(|f| resolve_path(root, f))
    }
}

fn resolve_path(root: &Path, raw: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw).to_string());
    if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    }
}
