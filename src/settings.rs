use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_monthly_file")]
    pub monthly_file: String,
    #[serde(default = "default_yearly_file")]
    pub yearly_file: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// `Nazwa` value of the whole-country aggregate rows.
    #[serde(default = "default_country_label")]
    pub country_label: String,
    /// Value meaning "all" in the `Płeć` and education columns.
    #[serde(default = "default_total_label")]
    pub total_label: String,
}

fn default_data_dir() -> String {
    "data/raw_data".to_string()
}

fn default_monthly_file() -> String {
    "bezrobocie_plec_miesiecznie.csv".to_string()
}

fn default_yearly_file() -> String {
    "bezrobocie_wyksz_plec_lata.csv".to_string()
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_country_label() -> String {
    "POLSKA".to_string()
}

fn default_total_label() -> String {
    "ogółem".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            monthly_file: default_monthly_file(),
            yearly_file: default_yearly_file(),
            encoding: default_encoding(),
            country_label: default_country_label(),
            total_label: default_total_label(),
        }
    }
}

impl Settings {
    pub fn monthly_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.monthly_file)
    }

    pub fn yearly_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.yearly_file)
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("bezrobocie")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
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
        .map_err(|e| AppError::Settings(e.to_string()))?;
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
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/gus".to_string(),
            encoding: "windows-1250".to_string(),
            ..Settings::default()
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.encoding, "utf-8");
        assert_eq!(s.country_label, "POLSKA");
        assert_eq!(
            s.monthly_path(),
            PathBuf::from("data/raw_data/bezrobocie_plec_miesiecznie.csv")
        );
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/srv/gus", "unknown_field": 1}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.data_dir, "/srv/gus");
        assert_eq!(s.total_label, "ogółem");
        assert_eq!(s.yearly_path(), PathBuf::from("/srv/gus/bezrobocie_wyksz_plec_lata.csv"));
    }

    #[test]
    fn test_shellexpand_keeps_unresolvable_paths() {
        assert_eq!(shellexpand_path("no/such/dir"), "no/such/dir");
    }
}
