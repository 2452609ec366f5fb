use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_DB: &str = "ENTE_TOTP_DB";
pub const ENV_ICONS: &str = "ENTE_TOTP_ICONS";
pub const ENV_LOGO_API_KEY: &str = "LOGO_DEV_API_KEY";

/// Optional overrides read from `config.json` in the data root.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FileConfig {
    pub db_path: Option<PathBuf>,
    pub icons_dir: Option<PathBuf>,
    pub logo_api_key: Option<String>,
}

/// Resolved settings handed to the store and the icon cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub icons_dir: PathBuf,
    pub logo_api_key: Option<String>,
}

impl Config {
    /// Defaults, then `config.json`, then environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let root = data_root()?;
        let file = read_file_config(&root.join("config.json"))?;
        let env = |key: &str| std::env::var(key).ok();
        Ok(Self::resolve(&root, file, env))
    }

    fn resolve(root: &Path, file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = env(ENV_DB)
            .map(PathBuf::from)
            .or(file.db_path)
            .unwrap_or_else(|| root.join("db.json"));
        let icons_dir = env(ENV_ICONS)
            .map(PathBuf::from)
            .or(file.icons_dir)
            .unwrap_or_else(|| root.join("icons"));
        // An empty key disables icon downloads.
        let logo_api_key = env(ENV_LOGO_API_KEY)
            .or(file.logo_api_key)
            .filter(|k| !k.trim().is_empty());

        Config {
            db_path,
            icons_dir,
            logo_api_key,
        }
    }
}

/// Data directory, e.g. ~/.local/share/ente-totp
pub fn data_root() -> anyhow::Result<PathBuf> {
    let mut dir = dirs::data_dir().ok_or_else(|| anyhow::anyhow!("cannot get data dir"))?;
    dir.push("ente-totp");
    Ok(dir)
}

fn read_file_config(path: &Path) -> anyhow::Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let cfg: FileConfig = serde_json::from_str(&data)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_under_root() {
        let cfg = Config::resolve(Path::new("/data"), FileConfig::default(), env_from(&[]));
        assert_eq!(cfg.db_path, PathBuf::from("/data/db.json"));
        assert_eq!(cfg.icons_dir, PathBuf::from("/data/icons"));
        assert_eq!(cfg.logo_api_key, None);
    }

    #[test]
    fn env_beats_file() {
        let file = FileConfig {
            db_path: Some(PathBuf::from("/file/db.json")),
            icons_dir: Some(PathBuf::from("/file/icons")),
            logo_api_key: Some("pk_file".to_string()),
        };
        let cfg = Config::resolve(
            Path::new("/data"),
            file,
            env_from(&[(ENV_DB, "/env/db.json"), (ENV_LOGO_API_KEY, "pk_env")]),
        );
        assert_eq!(cfg.db_path, PathBuf::from("/env/db.json"));
        assert_eq!(cfg.icons_dir, PathBuf::from("/file/icons"));
        assert_eq!(cfg.logo_api_key.as_deref(), Some("pk_env"));
    }

    #[test]
    fn empty_api_key_disables_icons() {
        let cfg = Config::resolve(
            Path::new("/data"),
            FileConfig::default(),
            env_from(&[(ENV_LOGO_API_KEY, "  ")]),
        );
        assert_eq!(cfg.logo_api_key, None);
    }

    #[test]
    fn reads_partial_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"logo_api_key": "pk_test"}"#).unwrap();
        let file = read_file_config(&path).unwrap();
        assert_eq!(file.logo_api_key.as_deref(), Some("pk_test"));
        assert!(file.db_path.is_none());

        assert!(read_file_config(&dir.path().join("none.json")).unwrap().db_path.is_none());
    }
}
