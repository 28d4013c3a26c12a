use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub steam_folder: String,
    #[serde(default)]
    pub app_list_folder: String,
    #[serde(default)]
    pub restart_steam: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            steam_folder: find_default_steam().unwrap_or_default(),
            app_list_folder: String::new(),
            restart_steam: false,
        }
    }
}

pub fn get_settings_path() -> PathBuf {
    // Keep settings next to the executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(parent) = exe_path.parent() {
            return parent.join("settings.json");
        }
    }
    PathBuf::from("settings.json")
}

/// The Lua folder is intentionally absent from the settings; the user
/// re-selects it every run.
pub fn load_settings() -> AppConfig {
    read_settings(&get_settings_path())
}

fn read_settings(path: &Path) -> AppConfig {
    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(cfg) => return cfg,
                Err(e) => warn!("settings file is unreadable, using defaults: {}", e),
            },
            Err(e) => warn!("settings file could not be read, using defaults: {}", e),
        }
    }
    AppConfig::default()
}

pub fn save_settings(config: &AppConfig) -> Result<(), std::io::Error> {
    let path = get_settings_path();
    let content = serde_json::to_string_pretty(config)?;
    let mut file = fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn load_game_name_cache() -> HashMap<String, String> {
    let mut path = get_settings_path();
    path.set_file_name("game_names_cache.json");

    if path.exists() {
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(cache) = serde_json::from_str(&content) {
                return cache;
            }
        }
    }
    HashMap::new()
}

pub fn save_game_name_cache(cache: &HashMap<String, String>) -> Result<(), std::io::Error> {
    let mut path = get_settings_path();
    path.set_file_name("game_names_cache.json");

    let content = serde_json::to_string_pretty(cache)?;
    fs::write(path, content)?;
    Ok(())
}

fn find_default_steam() -> Option<String> {
    let paths = [r"C:\Program Files (x86)\Steam", r"C:\Program Files\Steam"];
    for p in paths {
        if Path::new(p).exists() {
            return Some(p.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_empty_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.steam_folder, "");
        assert_eq!(cfg.app_list_folder, "");
        assert!(!cfg.restart_steam);
    }

    #[test]
    fn settings_round_trip() {
        let cfg = AppConfig {
            steam_folder: r"C:\Program Files (x86)\Steam".to_string(),
            app_list_folder: r"C:\GreenLuma\AppList".to_string(),
            restart_steam: true,
        };
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let loaded: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.steam_folder, cfg.steam_folder);
        assert_eq!(loaded.app_list_folder, cfg.app_list_folder);
        assert_eq!(loaded.restart_steam, cfg.restart_steam);
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let json = r#"{ "steam_folder": "x", "legacy_option": 3 }"#;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.steam_folder, "x");
    }

    #[test]
    fn unreadable_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the settings path makes the read itself fail.
        let path = dir.path().join("settings.json");
        fs::create_dir(&path).unwrap();

        let cfg = read_settings(&path);
        assert_eq!(cfg.app_list_folder, "");
        assert!(!cfg.restart_steam);
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json {").unwrap();

        let cfg = read_settings(&path);
        assert_eq!(cfg.app_list_folder, "");
        assert!(!cfg.restart_steam);
    }

    #[test]
    fn name_cache_round_trips_through_json() {
        let mut cache = HashMap::new();
        cache.insert("1593500".to_string(), "Sample Game".to_string());
        let json = serde_json::to_string_pretty(&cache).unwrap();
        let loaded: HashMap<String, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.get("1593500").map(String::as_str), Some("Sample Game"));
    }
}
