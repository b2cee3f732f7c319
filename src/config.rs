use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GitaConfig {
    pub server: ServerConfig,
    pub assets: AssetsConfig,
    pub provider: ProviderConfig,
    pub matching: MatchingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AssetsConfig {
    pub dir: String,
    pub weights_file: String,
    pub verses_file: String,
    pub enriched_file: String,
    pub stories_file: String,
    pub embeddings_file: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    /// `"openai"` or `"none"`.
    pub kind: String,
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    /// Ask the chat model for a paraphrased query before the semantic match.
    pub paraphrase: bool,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MatchingConfig {
    pub emotion_boost: f32,
    pub debug_top_n: usize,
}

impl Default for GitaConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            assets: AssetsConfig::default(),
            provider: ProviderConfig::default(),
            matching: MatchingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 8737,
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        let dir = default_gita_dir()
            .join("assets")
            .to_string_lossy()
            .into_owned();
        Self {
            dir,
            weights_file: "verse_model.bin".into(),
            verses_file: "verses.json".into(),
            enriched_file: "enriched_verses.json".into(),
            stories_file: "stories.json".into(),
            embeddings_file: "verse_embeddings.json".into(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: "openai".into(),
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".into(),
            embedding_model: "text-embedding-3-small".into(),
            chat_model: "gpt-4o-mini".into(),
            paraphrase: true,
            timeout_secs: 45,
            max_retries: 3,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            emotion_boost: 1.2,
            debug_top_n: 5,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Returns `~/.gita/`
pub fn default_gita_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gita")
}

/// Returns the default config file path: `~/.gita/config.toml`
pub fn default_config_path() -> PathBuf {
    default_gita_dir().join("config.toml")
}

impl GitaConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides and validate.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            GitaConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (GITA_ASSETS, GITA_LOG_LEVEL, GITA_PROVIDER,
    /// OPENAI_API_KEY).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GITA_ASSETS") {
            self.assets.dir = val;
        }
        if let Ok(val) = std::env::var("GITA_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("GITA_PROVIDER") {
            self.provider.kind = val;
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            self.provider.api_key = val;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let boost = self.matching.emotion_boost;
        anyhow::ensure!(
            boost.is_finite() && boost >= 1.0,
            "matching.emotion_boost must be a finite value >= 1.0, got {boost}"
        );
        anyhow::ensure!(
            matches!(self.provider.kind.as_str(), "openai" | "none"),
            "unknown provider kind: {}. Supported: openai, none",
            self.provider.kind
        );
        anyhow::ensure!(self.provider.timeout_secs > 0, "provider.timeout_secs must be at least 1");
        anyhow::ensure!(self.provider.max_retries > 0, "provider.max_retries must be at least 1");
        Ok(())
    }

    /// Resolve the asset directory, expanding `~` if needed.
    pub fn resolved_assets_dir(&self) -> PathBuf {
        expand_tilde(&self.assets.dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GitaConfig::default();
        assert_eq!(config.server.transport, "stdio");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.provider.kind, "openai");
        assert_eq!(config.provider.embedding_model, "text-embedding-3-small");
        assert_eq!(config.matching.emotion_boost, 1.2);
        assert_eq!(config.matching.debug_top_n, 5);
        assert!(config.assets.dir.ends_with("assets"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[assets]
dir = "/tmp/gita-assets"

[provider]
kind = "none"
paraphrase = false

[matching]
emotion_boost = 1.5
"#;
        let config: GitaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.assets.dir, "/tmp/gita-assets");
        assert_eq!(config.provider.kind, "none");
        assert!(!config.provider.paraphrase);
        assert_eq!(config.matching.emotion_boost, 1.5);
        // defaults still apply for unset fields
        assert_eq!(config.matching.debug_top_n, 5);
        assert_eq!(config.assets.weights_file, "verse_model.bin");
        assert_eq!(config.provider.timeout_secs, 45);
    }

    #[test]
    fn rejects_shrinking_boost() {
        let mut config = GitaConfig::default();
        config.matching.emotion_boost = 0.8;
        assert!(config.validate().is_err());
        config.matching.emotion_boost = f32::NAN;
        assert!(config.validate().is_err());
        config.matching.emotion_boost = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_timeout_and_retries() {
        let mut config = GitaConfig::default();
        config.provider.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = GitaConfig::default();
        config.provider.max_retries = 0;
        assert!(config.validate().is_err());

        let mut config = GitaConfig::default();
        config.provider.timeout_secs = 1;
        config.provider.max_retries = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_provider() {
        let mut config = GitaConfig::default();
        config.provider.kind = "cohere".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = GitaConfig::default();
        std::env::set_var("GITA_ASSETS", "/tmp/override-assets");
        std::env::set_var("GITA_LOG_LEVEL", "trace");
        std::env::set_var("GITA_PROVIDER", "none");

        config.apply_env_overrides();

        assert_eq!(config.assets.dir, "/tmp/override-assets");
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.provider.kind, "none");

        // Clean up
        std::env::remove_var("GITA_ASSETS");
        std::env::remove_var("GITA_LOG_LEVEL");
        std::env::remove_var("GITA_PROVIDER");
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/opt/gita"), PathBuf::from("/opt/gita"));
    }
}
