use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::RagError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 12] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "auth_",
    "_auth",
    "access_key",
    "access_token",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 5] = [
    "max_tokens",
    "total_tokens",
    "input_tokens",
    "output_tokens",
    "tokens",
];

/// Environment variables copied over file values, as (variable, section, key).
const ENV_OVERRIDES: [(&str, &str, &str); 3] = [
    ("OPENAI_API_KEY", "llm", "api_key"),
    ("OPENAI_BASE_URL", "llm", "base_url"),
    ("RAGLOOP_MODEL", "llm", "model"),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
    explicit_path: Option<PathBuf>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self {
            paths,
            explicit_path: None,
        }
    }

    /// A path given on the command line wins over every other location.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_path = path;
        self
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.explicit_path {
            return path.clone();
        }

        if let Ok(path) = env::var("RAGLOOP_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Merged file contents with environment overrides applied.
    pub fn load_raw(&self) -> Result<Value, RagError> {
        self.load_raw_with_env(|name| env::var(name).ok())
    }

    pub fn load_raw_with_env<F>(&self, lookup: F) -> Result<Value, RagError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = self.config_path();
        if self.explicit_path.is_some() && !config_path.exists() {
            return Err(RagError::Config(format!(
                "config file not found: {}",
                config_path.display()
            )));
        }

        let public_config = load_yaml_file(&config_path)?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        let mut merged = deep_merge(&public_config, &secrets_config);
        apply_env_overrides(&mut merged, lookup);
        Ok(merged)
    }

    pub fn load(&self) -> Result<AppConfig, RagError> {
        self.load_with_env(|name| env::var(name).ok())
    }

    pub fn load_with_env<F>(&self, lookup: F) -> Result<AppConfig, RagError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = self.load_raw_with_env(lookup)?;
        validate_config(&raw)?;
        let mut config: AppConfig = serde_json::from_value(raw)
            .map_err(|e| RagError::Config(format!("Invalid config: {}", e)))?;

        config.app.documents_dir = self.paths.resolve(&config.app.documents_dir);
        config.app.index_path = self.paths.resolve(&config.app.index_path);
        tracing::debug!("Loaded configuration from {}", self.config_path().display());
        Ok(config)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, RagError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| RagError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    let value = serde_yaml::from_str::<Value>(&contents)
        .map_err(|e| RagError::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(RagError::Config(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let Value::Object(root) = config else {
        return;
    };

    for (var, section, key) in ENV_OVERRIDES {
        let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let entry = root
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), Value::String(value));
        }
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}
