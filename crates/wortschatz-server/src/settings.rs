//! Runtime server configuration, deserialised with the `config` crate from
//! an optional TOML file layered under `WORTSCHATZ_*` environment variables.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use wortschatz_core::{
  cache::DEFAULT_CACHE_TTL, generate::DEFAULT_MAX_PAYLOAD_BYTES,
  knowledge::ProficiencyLevel, planner::StudyConfig,
};
use wortschatz_remote::{AnnotatorConfig, GeneratorConfig};

pub const ENV_PREFIX: &str = "WORTSCHATZ";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub annotator:  AnnotatorConfig,
  #[serde(default)]
  pub generator:  GeneratorConfig,
  #[serde(default)]
  pub study:      StudySettings,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8000 }
fn default_store_path() -> PathBuf { "~/.local/share/wortschatz/wortschatz.db".into() }

/// The `[study]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct StudySettings {
  /// Clamped to at least one hour by the planner.
  #[serde(default = "default_cache_ttl_secs")]
  pub cache_ttl_secs:    u64,
  #[serde(default = "default_max_payload_bytes")]
  pub max_payload_bytes: usize,
  #[serde(default)]
  pub default_level:     ProficiencyLevel,
}

fn default_cache_ttl_secs() -> u64 { DEFAULT_CACHE_TTL.as_secs() }
fn default_max_payload_bytes() -> usize { DEFAULT_MAX_PAYLOAD_BYTES }

impl Default for StudySettings {
  fn default() -> Self {
    Self {
      cache_ttl_secs:    default_cache_ttl_secs(),
      max_payload_bytes: default_max_payload_bytes(),
      default_level:     ProficiencyLevel::default(),
    }
  }
}

impl ServerConfig {
  /// Layer `path` (optional) under the environment and deserialise.
  pub fn load(path: PathBuf) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix(ENV_PREFIX)
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn study_config(&self) -> StudyConfig {
    StudyConfig {
      attempt_timeout:   self.generator.timeout(),
      cache_ttl:         Duration::from_secs(self.study.cache_ttl_secs),
      max_payload_bytes: self.study.max_payload_bytes,
      default_level:     self.study.default_level,
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};

  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_uses_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.address(), "127.0.0.1:8000");
    assert_eq!(cfg.annotator.timeout_secs, 60);
    assert_eq!(cfg.generator.model, "gpt-4.1-mini");
    assert!(cfg.generator.api_key.is_none());

    let study = cfg.study_config();
    assert_eq!(study.attempt_timeout, Duration::from_secs(20));
    assert_eq!(study.cache_ttl, Duration::from_secs(21_600));
    assert_eq!(study.max_payload_bytes, 1200);
    assert_eq!(study.default_level, ProficiencyLevel::B1);
  }

  #[test]
  fn nested_tables_override_defaults() {
    let cfg = from_toml(
      r#"
      port = 9000
      store_path = "/tmp/w.db"

      [generator]
      api_key = "sk-local"
      timeout_secs = 5

      [study]
      cache_ttl_secs = 60
      default_level = "C1"
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/w.db"));
    assert_eq!(cfg.generator.api_key.as_deref(), Some("sk-local"));
    assert_eq!(cfg.generator.base_url, "https://api.openai.com/v1");

    let study = cfg.study_config();
    assert_eq!(study.attempt_timeout, Duration::from_secs(5));
    assert_eq!(study.cache_ttl, Duration::from_secs(60));
    assert_eq!(study.default_level, ProficiencyLevel::C1);
  }
}
