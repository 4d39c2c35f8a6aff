use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Line-matching strategy used by the aligner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    #[default]
    Myers,
    Lcs,
    Patience,
}

/// [diff] section configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    #[serde(default)]
    pub algorithm: DiffAlgorithm,
    /// Minimum similarity ratio (0.0-1.0) every pair in a removed/added block
    /// must reach before the block is shown as modified. Unset pairs positionally.
    #[serde(default)]
    pub min_similarity: Option<f32>,
    /// Lines whose lengths differ by more than this share of the shorter line
    /// are highlighted as a whole instead of by prefix/suffix trimming.
    #[serde(default = "default_inline_length_ratio")]
    pub inline_length_ratio: f64,
}

/// [history] section configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_size")]
    pub max_size: usize,
}

/// [files] section configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

/// [watch] section configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_inline_length_ratio() -> f64 {
    0.5
}

fn default_history_size() -> usize {
    50
}

fn default_max_lines() -> usize {
    100_000
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            algorithm: DiffAlgorithm::default(),
            min_similarity: None,
            inline_length_ratio: default_inline_length_ratio(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: default_history_size(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Load config by merging global defaults with per-directory overrides.
/// Priority: `<dir>/.sidemerge.toml` > global `~/.config/sidemerge/config.toml` > built-in defaults.
/// Merging is deep: individual fields within sections (e.g. `[diff]`) override independently.
pub fn load_config(dir: &Path) -> Config {
    let global_table = dirs::config_dir()
        .map(|d| d.join("sidemerge").join("config.toml"))
        .and_then(|p| read_table(&p));
    let local_table = read_table(&dir.join(".sidemerge.toml"));

    let merged = match (global_table, local_table) {
        (Some(mut global), Some(local)) => {
            deep_merge(&mut global, local);
            global
        }
        (Some(global), None) => global,
        (None, Some(local)) => local,
        (None, None) => return Config::default(),
    };

    parse_config(merged)
}

fn read_table(path: &Path) -> Option<toml::Table> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<toml::Table>(&content) {
        Ok(table) => Some(table),
        Err(e) => {
            log::warn!("Ignoring invalid config {}: {}", path.display(), e);
            None
        }
    }
}

fn parse_config(table: toml::Table) -> Config {
    match toml::Value::Table(table).try_into::<Config>() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Config has invalid values, using defaults: {}", e);
            Config::default()
        }
    }
}

/// Recursively merge `overlay` into `base`. Overlay values win; nested tables are merged recursively.
fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
