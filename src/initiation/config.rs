//! 🜂 Конфигурация движка
//!
//! Управляет параметрами журнала:
//! - Каталог хранилища
//! - Длительность блокировки после пропуска
//! - Источник архетипов и фильтр логов

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::whispers::DEFAULT_LOCKOUT_HOURS;

pub const DEFAULT_CONFIG_PATH: &str = "config/codex.toml";

/// Верхняя граница блокировки: один год
pub const MAX_LOCKOUT_HOURS: i64 = 24 * 365;

/// Главная конфигурация
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Каталог, где лежат записи хранилища
    pub data_dir: String,
    /// Часы блокировки после пропуска шепота
    pub lockout_hours: i64,
    /// Зерно генератора; без него выбор случайный
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Фильтр tracing, если RUST_LOG не задан
    pub log_filter: String,
    /// Каталог JSON-определений архетипов
    pub archetypes_dir: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            lockout_hours: DEFAULT_LOCKOUT_HOURS,
            seed: None,
            log_filter: "info".to_string(),
            archetypes_dir: "config/archetypes".to_string(),
        }
    }
}

impl SystemConfig {
    /// Загружает конфигурацию из файла или создает дефолтную
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: SystemConfig = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let default_config = SystemConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            std::fs::write(path, toml_content)?;

            println!("📝 Создан {} с настройками по умолчанию", path.display());
            Ok(default_config)
        }
    }

    /// Валидирует конфигурацию
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.trim().is_empty() {
            anyhow::bail!("Каталог данных не указан");
        }

        if self.lockout_hours <= 0 {
            anyhow::bail!("Блокировка должна длиться > 0 часов");
        }

        if self.lockout_hours > MAX_LOCKOUT_HOURS {
            anyhow::bail!(
                "Блокировка не может длиться дольше {} часов",
                MAX_LOCKOUT_HOURS
            );
        }

        if self.log_filter.trim().is_empty() {
            anyhow::bail!("Фильтр логов не указан");
        }

        Ok(())
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn archetypes_path(&self) -> PathBuf {
        PathBuf::from(&self.archetypes_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("codex.toml");

        let config = SystemConfig::load(&path).unwrap();
        assert_eq!(config, SystemConfig::default());
        assert!(path.exists());
        assert_eq!(SystemConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("codex.toml");
        std::fs::write(&path, "lockout_hours = 2\nseed = 7\n").unwrap();

        let config = SystemConfig::load(&path).unwrap();
        assert_eq!(config.lockout_hours, 2);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.data_dir, "data");
    }

    #[test]
    fn test_invalid_lockout_rejected() {
        let config = SystemConfig {
            lockout_hours: 0,
            ..SystemConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_lockout_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("codex.toml");
        std::fs::write(&path, format!("lockout_hours = {}\n", i64::MAX)).unwrap();

        assert!(SystemConfig::load(&path).is_err());

        let at_bound = SystemConfig {
            lockout_hours: MAX_LOCKOUT_HOURS,
            ..SystemConfig::default()
        };
        assert!(at_bound.validate().is_ok());
    }
}
