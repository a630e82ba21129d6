use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult, ConfigError};

use super::types::ConfigFile;

const DEFAULT_CONFIG_FILES: [&str; 2] = ["stampede.toml", "stampede.json"];

/// Loads the config file at `path`, or the first default file found in the
/// working directory.
///
/// # Errors
///
/// Returns an error when no file is found or it cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> AppResult<ConfigFile> {
    if let Some(path) = path {
        return load_config_file(Path::new(path));
    }

    DEFAULT_CONFIG_FILES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
        .map_or_else(
            || Err(AppError::config(ConfigError::NoConfigFile)),
            |found| load_config_file(&found),
        )
}

pub(crate) fn load_config_file(path: &Path) -> AppResult<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    parse_config(path, &content)
}

/// Parses `content` by the extension of `path`.
pub(crate) fn parse_config(path: &Path, content: &str) -> AppResult<ConfigFile> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(content).map_err(|err| {
            AppError::config(ConfigError::ParseToml {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some("json") => serde_json::from_str(content).map_err(|err| {
            AppError::config(ConfigError::ParseJson {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some(ext) => Err(AppError::config(ConfigError::UnsupportedExtension {
            ext: ext.to_owned(),
        })),
        None => Err(AppError::config(ConfigError::MissingExtension)),
    }
}
