//! User configuration: `config.toml` in the platform config directory.

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tabula_core::TableOptions;
use tabula_engine::engine::{DEFAULT_PRECISION, Precision};

const MAX_CONFIG_FILE_BYTES: u64 = 65_536; // 64 KiB

pub const DEFAULT_SEPARATOR: usize = 2;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    precision: Option<u32>,
    filler: Option<String>,
    separator: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Significant digits for inexact arithmetic.
    pub precision: u32,
    /// Text for cells that have no value.
    pub filler: String,
    /// Minimum run of spaces that separates input cells.
    pub separator: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            precision: DEFAULT_PRECISION,
            filler: tabula_core::table::DEFAULT_FILLER.to_string(),
            separator: DEFAULT_SEPARATOR,
        }
    }
}

impl Config {
    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            precision: Precision::new(self.precision),
            filler: self.filler.clone(),
        }
    }

    fn merge(&mut self, file: ConfigFile, warnings: &mut Vec<String>) {
        if let Some(precision) = file.precision {
            self.precision = precision;
        }
        if let Some(filler) = file.filler {
            self.filler = filler;
        }
        match file.separator {
            Some(0) => warnings.push("separator must be at least 1; using 2".to_string()),
            Some(separator) => self.separator = separator,
            None => {}
        }
    }
}

/// Load the config file. An explicit path that does not exist is a warning;
/// a missing default file is not. Problems never stop the program.
pub fn load_config(config_file: Option<&Path>) -> (Config, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let mut config = Config::default();
    let Some(path) = config_file.map(Path::to_path_buf).or_else(user_config_path) else {
        return (config, warnings);
    };

    if !path.exists() {
        if config_file.is_some() {
            warnings.push(format!("Config file not found: {}", path.display()));
        }
        return (config, warnings);
    }

    match std::fs::metadata(&path) {
        Ok(meta) if meta.len() > MAX_CONFIG_FILE_BYTES => warnings.push(format!(
            "Refusing to read {}: file too large ({} bytes, max {})",
            path.display(),
            meta.len(),
            MAX_CONFIG_FILE_BYTES
        )),
        Ok(_) => match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ConfigFile>(&content) {
                Ok(file) => config.merge(file, &mut warnings),
                Err(err) => warnings.push(format!("Failed to parse {}: {}", path.display(), err)),
            },
            Err(err) => warnings.push(format!("Failed to read {}: {}", path.display(), err)),
        },
        Err(err) => warnings.push(format!(
            "Failed to read metadata for {}: {}",
            path.display(),
            err
        )),
    }
    tracing::debug!(?config, path = %path.display(), "loaded config");
    (config, warnings)
}

fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "tabula")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "tabula_config_{}_{}_{:?}.toml",
            name,
            std::process::id(),
            std::thread::current().id(),
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_values() {
        let path = temp_config("values", "precision = 6\nfiller = \"NA\"\nseparator = 1\n");
        let (config, warnings) = load_config(Some(&path));
        let _ = std::fs::remove_file(&path);
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.precision, 6);
        assert_eq!(config.filler, "NA");
        assert_eq!(config.separator, 1);
        assert_eq!(config.table_options().precision.digits(), 6);
    }

    #[test]
    fn test_unknown_field_is_a_warning() {
        let path = temp_config("unknown", "colour = \"red\"\n");
        let (config, warnings) = load_config(Some(&path));
        let _ = std::fs::remove_file(&path);
        assert_eq!(config, Config::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Failed to parse"));
    }

    #[test]
    fn test_zero_separator_ignored() {
        let path = temp_config("zero", "separator = 0\n");
        let (config, warnings) = load_config(Some(&path));
        let _ = std::fs::remove_file(&path);
        assert_eq!(config.separator, DEFAULT_SEPARATOR);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_missing_explicit_file() {
        let path = std::env::temp_dir().join("tabula_config_does_not_exist.toml");
        let (config, warnings) = load_config(Some(&path));
        assert_eq!(config, Config::default());
        assert!(warnings[0].contains("not found"));
    }
}
