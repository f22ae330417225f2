use std::time::Duration;

use serde::Serialize;

use crate::{
    config_db::ConfigDb,
    error::{Error, Result},
    model_manager::{DEFAULT_MODEL_ID, MODEL_ENV_VAR},
};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_THRESHOLD: f32 = 0.6;
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Keys accepted by `config set`.
pub const KEYS: &[&str] = &[
    "top_k",
    "threshold",
    "embedding_model",
    "llm_model",
    "llm_base_url",
    "llm_timeout_secs",
];

/// Runtime settings with defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub top_k: usize,
    pub threshold: f32,
    pub embedding_model: String,
    pub llm_model: String,
    pub llm_base_url: String,
    pub llm_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
            embedding_model: DEFAULT_MODEL_ID.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Read settings from the config database.
    ///
    /// The `STAFFMATCH_MODEL` environment variable takes precedence over a
    /// stored embedding model.
    pub fn load(config_db: &ConfigDb) -> Result<Self> {
        let mut settings = Self::default();
        for (key, value) in config_db.list_settings()? {
            settings.apply(&key, &value)?;
        }
        if let Ok(model) = std::env::var(MODEL_ENV_VAR)
            && !model.trim().is_empty()
        {
            settings.embedding_model = model;
        }
        Ok(settings)
    }

    /// Validate and store one setting.
    pub fn set(config_db: &ConfigDb, key: &str, value: &str) -> Result<()> {
        Self::default().apply(key, value)?;
        let previous = config_db.get_setting(key)?;
        tracing::debug!(key, ?previous, value = value.trim(), "updating setting");
        config_db.set_setting(key, value.trim())
    }

    /// Remove a stored setting so its default applies again.
    pub fn clear(config_db: &ConfigDb, key: &str) -> Result<()> {
        if !config_db.remove_setting(key)? {
            return Err(Error::NotFound {
                kind: "setting",
                name: key.to_string(),
            });
        }
        Ok(())
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "top_k" => {
                self.top_k = parse_value(key, value)?;
                if self.top_k == 0 {
                    return Err(invalid(key, value, "must be at least 1"));
                }
            }
            "threshold" => {
                self.threshold = parse_value(key, value)?;
                if !(-1.0..=1.0).contains(&self.threshold) {
                    return Err(invalid(key, value, "must be within [-1, 1]"));
                }
            }
            "embedding_model" => self.embedding_model = non_empty(key, value)?,
            "llm_model" => self.llm_model = non_empty(key, value)?,
            "llm_base_url" => {
                self.llm_base_url =
                    non_empty(key, value)?.trim_end_matches('/').to_string();
            }
            "llm_timeout_secs" => {
                self.llm_timeout_secs = parse_value(key, value)?;
                if self.llm_timeout_secs == 0 {
                    return Err(invalid(key, value, "must be at least 1"));
                }
            }
            _ => {
                return Err(Error::Config(format!(
                    "unknown setting {key:?} (expected one of: {})",
                    KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| invalid(key, value, e))
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(invalid(key, value, "must not be empty"));
    }
    Ok(value.to_string())
}

fn invalid(key: &str, value: &str, reason: impl std::fmt::Display) -> Error {
    Error::Config(format!("invalid value {value:?} for {key}: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, ConfigDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = ConfigDb::open(&tmp.path().join("config.redb")).unwrap();
        (tmp, db)
    }

    #[test]
    fn defaults_when_nothing_stored() {
        let (_tmp, db) = test_db();
        let settings = Settings::load(&db).unwrap();
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.threshold, 0.6);
        assert_eq!(settings.llm_model, "gpt-3.5-turbo");
        assert_eq!(settings.llm_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn stored_values_override_defaults() {
        let (_tmp, db) = test_db();
        Settings::set(&db, "top_k", "3").unwrap();
        Settings::set(&db, "threshold", " 0.75 ").unwrap();
        Settings::set(&db, "llm_base_url", "http://localhost:8080/v1/")
            .unwrap();

        let settings = Settings::load(&db).unwrap();
        assert_eq!(settings.top_k, 3);
        assert_eq!(settings.threshold, 0.75);
        assert_eq!(settings.llm_base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn invalid_values_are_not_stored() {
        let (_tmp, db) = test_db();
        for (key, value) in [
            ("top_k", "0"),
            ("top_k", "many"),
            ("threshold", "1.5"),
            ("llm_model", "  "),
            ("colour", "blue"),
        ] {
            assert!(
                matches!(Settings::set(&db, key, value), Err(Error::Config(_))),
                "{key}={value} should be rejected"
            );
        }
        assert!(db.list_settings().unwrap().is_empty());
    }

    #[test]
    fn clear_restores_default() {
        let (_tmp, db) = test_db();
        Settings::set(&db, "top_k", "9").unwrap();
        Settings::clear(&db, "top_k").unwrap();
        assert_eq!(Settings::load(&db).unwrap().top_k, DEFAULT_TOP_K);

        assert!(matches!(
            Settings::clear(&db, "top_k"),
            Err(Error::NotFound { .. })
        ));
    }
}
