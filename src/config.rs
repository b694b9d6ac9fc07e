use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub recordings: RecordingsConfig,
    pub indexer: IndexerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecordingsConfig {
    /// Directory the recorder writes plain `.cast` files into.
    pub dir: PathBuf,
    /// Optional second location holding gzip-compressed copies.
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.cast".to_string(), "**/*.cast.gz".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexerConfig {
    /// Configuration version string, recorded as the `indexer_version`
    /// marker. Changing it does not by itself force reprocessing.
    pub version: String,
    /// Ordered activation list of strategy ids. Unknown ids are skipped
    /// with a warning at reindex time.
    #[serde(default = "default_strategies")]
    pub current_strategies: Vec<String>,
    /// Default deduplication window for searches, in minutes. Zero
    /// disables deduplication.
    #[serde(default = "default_time_window")]
    pub default_time_window_minutes: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_strategies() -> Vec<String> {
    vec!["plain_text".to_string()]
}

fn default_time_window() -> i64 {
    0
}

fn default_page_size() -> i64 {
    20
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.indexer.version.trim().is_empty() {
        anyhow::bail!("indexer.version must not be empty");
    }

    if config.indexer.page_size < 1 {
        anyhow::bail!("indexer.page_size must be >= 1");
    }

    if config.indexer.default_time_window_minutes < 0 {
        anyhow::bail!("indexer.default_time_window_minutes must be >= 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("cdx.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_minimal_config_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[db]
path = "./data/index.sqlite"

[recordings]
dir = "./recordings"

[indexer]
version = "3"
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.indexer.current_strategies, vec!["plain_text"]);
        assert_eq!(config.indexer.default_time_window_minutes, 0);
        assert_eq!(config.indexer.page_size, 20);
        assert!(config.recordings.archive_dir.is_none());
        assert_eq!(
            config.recordings.include_globs,
            vec!["**/*.cast", "**/*.cast.gz"]
        );
    }

    #[test]
    fn test_rejects_empty_version() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[db]
path = "./data/index.sqlite"

[recordings]
dir = "./recordings"

[indexer]
version = "  "
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_rejects_bad_page_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
[db]
path = "./data/index.sqlite"

[recordings]
dir = "./recordings"

[indexer]
version = "3"
page_size = 0
"#,
        );
        assert!(load_config(&path).is_err());
    }
}
