use anyhow::Result;
use bulkstore_world::{default_tiers, AdmissionFilter, StorageTier};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fs, path::Path};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/storage.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Simulation ticks between storage ticks.
    pub tick_interval: u64,
    /// Seed for instance ids; random when unset.
    pub id_seed: Option<u64>,
    pub admission: AdmissionConfig,
    /// Unit variants, one controller each.
    pub tiers: Vec<TierConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TierConfig {
    pub id: String,
    pub name: String,
    pub max: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Container ids refused on top of the built-in denylist.
    pub extra_blocked_ids: Vec<String>,
    /// Log every refused insert at debug level.
    pub log_rejections: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            tick_interval: 1,
            id_seed: None,
            admission: AdmissionConfig::default(),
            tiers: default_tiers()
                .into_iter()
                .map(|tier| TierConfig {
                    id: tier.id().to_string(),
                    name: tier.name().to_string(),
                    max: u64::from(tier.max()),
                })
                .collect(),
        }
    }
}

impl StorageConfig {
    /// Load storage configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<StorageConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    StorageConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH)
                    || err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!(
                        "Storage config not found at {}. Using defaults",
                        path.display()
                    );
                }
                StorageConfig::default()
            }
        }
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Validated tiers. Invalid or duplicate entries are skipped; an empty
    /// result falls back to the built-in tiers.
    pub fn build_tiers(&self) -> Vec<StorageTier> {
        let mut seen = BTreeSet::new();
        let mut tiers = Vec::with_capacity(self.tiers.len());
        for entry in &self.tiers {
            match StorageTier::new(&entry.id, &entry.name, entry.max) {
                Ok(tier) => {
                    if !seen.insert(tier.id().to_string()) {
                        warn!("Ignoring duplicate storage tier {}", tier.id());
                        continue;
                    }
                    tiers.push(tier);
                }
                Err(err) => warn!("Ignoring storage tier {}: {err}", entry.id),
            }
        }

        if tiers.is_empty() {
            warn!("No usable storage tiers configured. Using defaults");
            return default_tiers();
        }
        tiers
    }

    /// Admission filter with the configured extras. Every configured tier id
    /// is refused as well, so custom tiers can't nest either.
    pub fn admission_filter(&self, tiers: &[StorageTier]) -> AdmissionFilter {
        AdmissionFilter::new()
            .with_blocked_ids(&self.admission.extra_blocked_ids)
            .with_blocked_ids(tiers.iter().map(StorageTier::id))
            .with_rejection_logging(self.admission.log_rejections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: StorageConfig = toml::from_str(
            r#"
            tick_interval = 4

            [admission]
            log_rejections = true
            "#,
        )
        .expect("parses");
        assert_eq!(cfg.tick_interval, 4);
        assert!(cfg.admission.log_rejections);
        assert_eq!(cfg.tiers.len(), 5);
        assert_eq!(cfg.id_seed, None);
    }

    #[test]
    fn oversized_and_duplicate_tiers_are_skipped() {
        let cfg: StorageConfig = toml::from_str(
            r#"
            [[tiers]]
            id = "crate"
            name = "Crate"
            max = 1000

            [[tiers]]
            id = "CRATE"
            name = "Crate Again"
            max = 2000

            [[tiers]]
            id = "huge"
            name = "Huge"
            max = 5000000000
            "#,
        )
        .expect("parses");
        let tiers = cfg.build_tiers();
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].id(), "CRATE");
        assert_eq!(tiers[0].max(), 1000);

        let filter = cfg.admission_filter(&tiers);
        assert!(filter.blocked_ids().any(|id| id == "CRATE"));
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("bulkstore-missing-config.toml");
        let cfg = StorageConfig::load_from_path(&path);
        assert_eq!(cfg.tick_interval, 1);
        assert_eq!(cfg.tiers.len(), 5);
    }

    #[test]
    fn save_then_load_roundtrips() {
        let path = std::env::temp_dir().join(format!(
            "bulkstore-config-{}.toml",
            std::process::id()
        ));
        let cfg = StorageConfig {
            id_seed: Some(42),
            ..StorageConfig::default()
        };
        cfg.save_to_path(&path).expect("save");
        let loaded = StorageConfig::load_from_path(&path);
        assert_eq!(loaded.id_seed, Some(42));
        assert_eq!(loaded.tiers, cfg.tiers);
        std::fs::remove_file(&path).ok();
    }
}
