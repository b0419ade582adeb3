//! # PCOSync Configuration Module
//!
//! This module provides configuration management for PCOSync, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//!
//! There is no global instance: the caller loads a [`Config`] once and hands
//! it (or values read from it) to each component it builds.
//!
//! ## Usage
//!
//! ```no_run
//! use pcoconfig::Config;
//!
//! let config = Config::load_config("")?;
//!
//! let level = config.get_log_min_level()?;
//! let output_dir = config.get_managed_dir(&["midi", "output_dir"], "output")?;
//!
//! config.set_log_min_level("DEBUG".to_string())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::info;

// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("pcosync.yaml");

const CONFIG_FILE_NAME: &str = "config.yaml";
const DEFAULT_CONFIG_DIR: &str = ".pcosync";
const ENV_CONFIG_DIR: &str = "PCOSYNC_CONFIG";
const ENV_PREFIX: &str = "PCOSYNC_CONFIG__";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";

/// Macro to generate getter/setter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s),
                _ => Ok($default.to_string()),
            }
        }

        pub fn $setter(&self, value: String) -> Result<()> {
            self.set_value($path, Value::String(value))
        }
    };
}

/// Configuration manager for PCOSync
///
/// This structure manages the application configuration, including:
/// - Loading configuration from YAML files
/// - Merging with default configuration
/// - Handling environment variable overrides
/// - Providing typed getters/setters for configuration values
///
/// Crates that need their own settings extend it with a `*ConfigExt` trait
/// built on [`Config::get_value`] and [`Config::set_value`].
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    path: PathBuf,
    /// Effective values, environment overrides included
    data: Mutex<Value>,
    /// What `config.yaml` holds; never sees environment overrides
    persisted: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.data().clone();
        let persisted = self.persisted().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
            persisted: Mutex::new(persisted),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> PathBuf {
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        if Path::new(DEFAULT_CONFIG_DIR).exists() {
            return PathBuf::from(DEFAULT_CONFIG_DIR);
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(DEFAULT_CONFIG_DIR);
            if home_config.exists() {
                return home_config;
            }
        }

        PathBuf::from(DEFAULT_CONFIG_DIR)
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        fs::read_dir(path)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `PCOSYNC_CONFIG` environment variable
    /// 3. `.pcosync` in the current directory
    /// 4. `.pcosync` in the user's home directory
    ///
    /// The directory is created if it doesn't exist, and validated for read/write permissions.
    pub fn config_dir(directory: &str) -> Result<PathBuf> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(&dir_path)?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Saves the merged configuration
    /// 5. Applies environment variable overrides in memory only, so values
    ///    such as `PCOSYNC_CONFIG__PLANNING_CENTER__SECRET` never reach disk
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join(CONFIG_FILE_NAME);

        let mut config_value = lower_keys_value(serde_yaml::from_str(DEFAULT_CONFIG)?);

        let yaml_data = match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path.display(), "Loaded config file");
                data
            }
            Err(_) => {
                info!(config_file = %path.display(), "Config file not found, using default embedded config");
                DEFAULT_CONFIG.as_bytes().to_vec()
            }
        };

        let external_value = lower_keys_value(serde_yaml::from_slice(&yaml_data)?);
        merge_yaml(&mut config_value, &external_value);

        let mut effective = config_value.clone();
        apply_env_overrides(&mut effective);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(effective),
            persisted: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`
    pub fn directory(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the persisted `config.yaml`
    pub fn file_path(&self) -> &Path {
        &self.path
    }

    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persisted(&self) -> MutexGuard<'_, Value> {
        self.persisted.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Saves the configuration to the config.yaml file
    ///
    /// Environment overrides are not part of the saved document.
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.persisted())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["midi", "channel"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut persisted = self.persisted();
            set_value_internal(&mut persisted, path, value.clone())?;
        }
        {
            let mut data = self.data();
            set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data();
        get_value_internal(&data, path)
    }

    /// Resolves a relative or absolute directory and creates it if needed
    fn resolve_and_create_dir(&self, dir_path: &str) -> Result<PathBuf> {
        let path = Path::new(dir_path);

        let absolute_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        };

        if !absolute_path.exists() {
            fs::create_dir_all(&absolute_path)?;
            info!(directory = %absolute_path.display(), "Created managed directory");
        }

        Ok(absolute_path)
    }

    /// Gets a directory managed by the configuration
    ///
    /// The directory may be absolute or relative to the configuration
    /// directory. It is created if missing; an unset value is replaced by
    /// `default` and persisted.
    ///
    /// ```no_run
    /// use pcoconfig::Config;
    ///
    /// let config = Config::load_config("")?;
    /// let output = config.get_managed_dir(&["midi", "output_dir"], "output")?;
    /// println!("MIDI files go to {}", output.display());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<PathBuf> {
        let dir_path = match self.get_value(path) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s,
            _ => {
                self.set_managed_dir(path, default.to_string())?;
                default.to_string()
            }
        };
        self.resolve_and_create_dir(&dir_path)
    }

    /// Sets a directory managed by the configuration
    pub fn set_managed_dir(&self, path: &[&str], directory: String) -> Result<()> {
        self.set_value(path, Value::String(directory))
    }

    impl_string_config!(
        get_log_min_level,
        set_log_min_level,
        &["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((first, rest)) = path.split_first() else {
        *data = value;
        return Ok(());
    };

    if data.is_null() {
        *data = Value::Mapping(Mapping::new());
    }

    match data {
        Value::Mapping(map) => {
            let key = Value::String(first.to_lowercase());
            if rest.is_empty() {
                map.insert(key, value);
                Ok(())
            } else {
                let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
                set_value_internal(entry, rest, value)
            }
        }
        _ => Err(anyhow!("Current node is not a map")),
    }
}

fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
    let mut current = data;
    for (i, key) in path.iter().enumerate() {
        match current {
            Value::Mapping(map) => match map.get(&Value::String(key.to_lowercase())) {
                Some(next) => current = next,
                None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
            },
            _ => return Err(anyhow!("Path {} is not a mapping", path[..i].join("."))),
        }
    }
    Ok(current.clone())
}

fn apply_env_overrides(config: &mut Value) {
    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let key_path = stripped.split("__").collect::<Vec<_>>();
            let yaml_value = convert_env_value(&value);
            if let Err(err) = set_value_internal(config, &key_path, yaml_value) {
                tracing::warn!(env_var = %key, "Ignoring config override: {}", err);
            }
        }
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut new_map = Mapping::new();
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other,
                };
                new_map.insert(key, lower_keys_value(v));
            }
            Value::Mapping(new_map)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default value.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
