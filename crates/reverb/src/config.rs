//! Layered configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. the bundled `reverb.toml`
//! 2. a user file (`--config`, or `reverb/reverb.toml` under the platform
//!    config directory)
//! 3. `REVERB_*` environment variables, with `__` between nested keys
//!    (`REVERB_POOL__COOLDOWN_SECS=120`)

use derive_getters::Getters;
use derive_setters::Setters;
use reverb_collect::CollectConfig;
use reverb_error::{ConfigError, ConfigErrorKind};
use reverb_models::GenerationConfig;
use reverb_rate_limit::{LimiterConfig, PoolConfig, QuotaTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Defaults compiled into the binary.
pub const DEFAULT_CONFIG: &str = include_str!("../reverb.toml");

const ENV_PREFIX: &str = "REVERB";

fn default_base_dir() -> PathBuf {
    PathBuf::from("tmp")
}

/// `[paths]` section: where per-profile state lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_", into)]
pub struct PathsConfig {
    /// Root of every derived path
    #[serde(default = "default_base_dir")]
    base_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

impl PathsConfig {
    /// Shared call ledger.
    pub fn call_log(&self) -> PathBuf {
        self.base_dir.join("logs").join("api_calls_log.json")
    }

    /// Review queue for replies posted as `profile`.
    pub fn replies_queue(&self, profile: &str) -> PathBuf {
        self.base_dir
            .join("replies-x")
            .join(profile)
            .join("schedule.json")
    }

    /// Queue of evergreen posts for `profile`.
    pub fn eternity_queue(&self, profile: &str) -> PathBuf {
        self.base_dir
            .join("eternity-x")
            .join(profile)
            .join("schedule.json")
    }

    /// Browser profile directory for `profile`.
    pub fn browser_data(&self, profile: &str) -> PathBuf {
        self.base_dir.join("browser-data").join(profile)
    }
}

fn default_prompt() -> String {
    "Write one short, friendly reply to the post below. Reply with the text only.".to_string()
}

/// `[reply]` section: what the reply pipeline asks the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_", into)]
pub struct ReplyConfig {
    /// Operator instructions placed before each post's text
    #[serde(default = "default_prompt")]
    prompt: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct ReverbConfig {
    /// State locations
    #[serde(default)]
    paths: PathsConfig,
    /// Per-key sliding window
    #[serde(default)]
    limiter: LimiterConfig,
    /// Key pool
    #[serde(default)]
    pool: PoolConfig,
    /// Guarded generation
    #[serde(default)]
    generation: GenerationConfig,
    /// Reply prompt
    #[serde(default)]
    reply: ReplyConfig,
    /// Collection pacing
    #[serde(default)]
    collect: CollectConfig,
    /// Quota tables by service
    #[serde(default)]
    quotas: QuotaTable,
}

impl ReverbConfig {
    /// Loads every layer. `user_file` overrides the default user location
    /// and must exist when given.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unreadable or malformed sources.
    pub fn load(user_file: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match user_file {
            Some(path) => (Some(path.to_path_buf()), true),
            None => (default_user_config_path(), false),
        };
        Self::from_sources(path.as_deref(), required, true)
    }

    /// Loads the bundled defaults, then `user_file` if given, then the
    /// environment when `with_env` is set.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unreadable or malformed sources.
    pub fn from_sources(
        user_file: Option<&Path>,
        required: bool,
        with_env: bool,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder().add_source(config::File::from_str(
            DEFAULT_CONFIG,
            config::FileFormat::Toml,
        ));

        if let Some(path) = user_file {
            debug!(path = %path.display(), required, "Adding user configuration");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(required),
            );
        }
        if with_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let settings = builder
            .build()
            .map_err(|e| ConfigErrorKind::Load(e.to_string()))?;
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| ConfigErrorKind::Invalid(e.to_string()))?;
        config.validate()?;

        info!(
            base_dir = %config.paths.base_dir().display(),
            model = %config.generation.model(),
            "Configuration loaded"
        );
        Ok(config)
    }
}

impl ReverbConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.base_dir().as_os_str().is_empty() {
            return Err(ConfigErrorKind::Path {
                path: "paths.base_dir".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        self.quotas
            .validate()
            .map_err(|e| ConfigErrorKind::QuotaTable(e.kind().to_string()))?;
        Ok(())
    }
}

/// Checks that `name` can serve as a profile directory name.
///
/// # Errors
///
/// Returns a `Profile` error for empty names and names with anything but
/// ASCII letters, digits, `-`, `_` and inner dots.
pub fn check_profile(name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        Some("profile name is empty")
    } else if name.starts_with('.') {
        Some("profile name starts with a dot")
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        Some("profile name may only use letters, digits, '-', '_' and '.'")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ConfigErrorKind::Profile {
            name: name.to_string(),
            reason: reason.to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

/// `<config dir>/reverb/reverb.toml`, when the platform has a config dir.
pub fn default_user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("reverb").join("reverb.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_paths_derive_from_base() {
        let paths = PathsConfig::default().with_base_dir("/data");
        assert_eq!(
            paths.call_log(),
            PathBuf::from("/data/logs/api_calls_log.json")
        );
        assert_eq!(
            paths.replies_queue("alice"),
            PathBuf::from("/data/replies-x/alice/schedule.json")
        );
        assert_eq!(
            paths.eternity_queue("alice"),
            PathBuf::from("/data/eternity-x/alice/schedule.json")
        );
        assert_eq!(
            paths.browser_data("alice"),
            PathBuf::from("/data/browser-data/alice")
        );
    }

    #[test]
    fn test_profile_names_must_be_path_safe() {
        assert!(check_profile("alice").is_ok());
        assert!(check_profile("team.alice-2").is_ok());
        for bad in ["", "..", "../alice", "a/b", ".hidden", "al ice"] {
            let err = check_profile(bad).unwrap_err();
            assert!(matches!(err.kind(), ConfigErrorKind::Profile { .. }), "{bad}");
        }
    }
}
