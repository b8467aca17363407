use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PayrollError, Result};
use crate::models::{Actor, Role};

pub const DB_FILE: &str = "hrpay.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub company_name: String,
}

fn default_role() -> Role {
    Role::Admin
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            user_name: String::new(),
            role: default_role(),
            company_name: String::new(),
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(DB_FILE)
    }

    pub fn exports_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("exports")
    }

    /// The acting identity, with optional per-invocation overrides.
    pub fn actor(&self, name: Option<&str>, role: Option<Role>) -> Actor {
        let name = name
            .map(str::to_string)
            .or_else(|| (!self.user_name.is_empty()).then(|| self.user_name.clone()))
            .unwrap_or_else(|| "system".to_string());
        Actor::new(name, role.unwrap_or(self.role))
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("hrpay")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("hrpay")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| PayrollError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            user_name: "Dilani".to_string(),
            role: Role::Accountant,
            company_name: "Lanka Traders".to_string(),
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        assert!(json.contains("\"accountant\""));
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.role, Role::Admin);
        assert!(s.user_name.is_empty());
        assert_eq!(s.db_path(), PathBuf::from("/tmp/test").join(DB_FILE));
    }

    #[test]
    fn test_actor_overrides() {
        let s = Settings {
            user_name: "Dilani".to_string(),
            role: Role::Hr,
            ..Settings::default()
        };
        assert_eq!(s.actor(None, None), Actor::new("Dilani", Role::Hr));
        assert_eq!(
            s.actor(Some("Ravi"), Some(Role::Ceo)),
            Actor::new("Ravi", Role::Ceo)
        );
        assert_eq!(Settings::default().actor(None, None).name, "system");
    }

    #[test]
    fn test_shellexpand_keeps_plain_paths() {
        let dir = tempfile::tempdir().unwrap();
        let expanded = shellexpand_path(&dir.path().to_string_lossy());
        assert!(!expanded.starts_with('~'));
    }
}
